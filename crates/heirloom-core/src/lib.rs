//! Heirloom Core
//!
//! Shared primitives for the Heirloom dead man's switch.
//!
//! # Share Scheme
//!
//! One symmetric key is split 3-of-5 by default:
//! - share 1 goes to the heir privately, out of band
//! - share 2 is published to blob storage as a safety net
//! - shares 3..5 are sealed to the heir's public key and stored on the vault
//!
//! # Encryption
//!
//! - Payloads: AES-256-GCM under a random 256-bit key
//! - Shares: secp256k1 ECDH with a fresh ephemeral key per share,
//!   HMAC-SHA256 key derivation, AES-256-GCM

pub mod crypto;
pub mod envelope;
pub mod keys;
pub mod scheme;

pub use crypto::{
    decrypt_payload, encrypt_payload, generate_symmetric_key, CryptoError, SymmetricKey,
};
pub use envelope::{open, seal, SealedEnvelope};
pub use keys::{parse_public_key, RecipientKeypair};
pub use scheme::{SchemeError, ShareScheme, THRESHOLD, TOTAL_SHARES};
