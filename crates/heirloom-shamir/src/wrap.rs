//! Share wrapping for the heir
//!
//! A wrapped share is a [`SealedEnvelope`] around the encoded share, rendered
//! as a hex string so the vault can store it as an opaque record.

use crate::shamir::Share;
use crate::ShamirError;
use heirloom_core::envelope::{open, seal, SealedEnvelope};
use secp256k1::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A share sealed to one recipient. Safe to publish.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WrappedShare(String);

impl WrappedShare {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for WrappedShare {
    fn from(record: String) -> Self {
        Self(record)
    }
}

impl From<WrappedShare> for String {
    fn from(wrapped: WrappedShare) -> Self {
        wrapped.0
    }
}

impl fmt::Display for WrappedShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seal a share to `recipient` under a fresh ephemeral key.
pub fn wrap_share(share: &Share, recipient: &PublicKey) -> Result<WrappedShare, ShamirError> {
    let envelope = seal(&share.to_bytes(), recipient)?;
    Ok(WrappedShare(envelope.to_hex()))
}

/// Open a wrapped share with the recipient's secret key.
///
/// # Errors
/// `Crypto(DecryptionFailed)` for a wrong key or tampered record.
pub fn unwrap_share(
    wrapped: &WrappedShare,
    recipient_sk: &SecretKey,
) -> Result<Share, ShamirError> {
    let envelope = SealedEnvelope::from_hex(wrapped.as_str())?;
    let bytes = open(&envelope, recipient_sk)?;
    Share::from_bytes(&bytes)
}
