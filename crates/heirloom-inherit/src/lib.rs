//! Heirloom Inherit Module
//!
//! Ties the secret engine to the vault:
//!
//! 1. [`prepare_inheritance`] encrypts the secret, splits the key, parks the
//!    ciphertext and the public share in a [`BlobStore`] and wraps the ledger
//!    shares for the heir.
//! 2. The owner creates a vault from [`InheritancePlan::vault_params`] and
//!    hands the heir share over out of band.
//! 3. After a claim, [`recover_inheritance`] unwraps the published records,
//!    rebuilds the key from any threshold of shares and decrypts the payload.

pub mod blob;
pub mod create;
pub mod recover;

pub use blob::{content_id, BlobError, BlobStore, DirBlobStore, MemoryBlobStore};
pub use create::{prepare_inheritance, InheritancePlan};
pub use recover::{published_claim, recover_inheritance};

use heirloom_core::{CryptoError, SchemeError};
use heirloom_shamir::ShamirError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InheritError {
    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("Sharing error: {0}")]
    Shamir(#[from] ShamirError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Invalid scheme: {0}")]
    Scheme(#[from] SchemeError),

    #[error("Not enough usable shares: need {needed}, got {got}")]
    InsufficientShares { needed: u8, got: usize },
}
