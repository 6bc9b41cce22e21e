//! Heirloom Shamir Module
//!
//! Split a payload key into threshold shares and seal shares to the heir.
//!
//! # Example: 3-of-5 split
//!
//! ```
//! use heirloom_core::{generate_symmetric_key, ShareScheme};
//! use heirloom_shamir::{recover_key, split_key};
//!
//! let key = generate_symmetric_key();
//! let scheme = ShareScheme::default();
//! let shares = split_key(&key, &scheme).unwrap();
//! assert_eq!(shares.len(), 5);
//!
//! // Any 3 shares recover the key
//! let subset = [shares[0].clone(), shares[3].clone(), shares[4].clone()];
//! let recovered = recover_key(&subset, &scheme).unwrap();
//! assert_eq!(recovered.as_bytes(), key.as_bytes());
//! ```

pub mod gf256;
pub mod shamir;
pub mod wrap;

// Re-exports
pub use shamir::{
    reconstruct_secret, recover_key, split_key, split_secret, threshold_subsets, verify_shares,
    Share, ThresholdSubsets,
};
pub use wrap::{unwrap_share, wrap_share, WrappedShare};

use heirloom_core::{CryptoError, SchemeError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShamirError {
    #[error("Invalid threshold: need at least 2")]
    InvalidThreshold,
    #[error("Threshold exceeds share count")]
    ThresholdExceedsShares,
    #[error("Not enough shares to reconstruct: need {needed}, got {got}")]
    InsufficientShares { needed: u8, got: usize },
    #[error("Invalid share format: {0}")]
    InvalidShare(String),
    #[error("Invalid scheme: {0}")]
    Scheme(#[from] SchemeError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
