//! Recipient keys for share wrapping
//!
//! The heir's encryption keypair is supplied from outside; these helpers only
//! parse, generate and hold it.

use crate::crypto::CryptoError;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::str::FromStr;

/// A secp256k1 keypair that shares are sealed to.
#[derive(Clone)]
pub struct RecipientKeypair {
    secret: SecretKey,
    public: PublicKey,
}

impl RecipientKeypair {
    /// Generate a fresh keypair from the thread CSPRNG.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, public) = secp.generate_keypair(&mut rand::thread_rng());
        Self { secret, public }
    }

    pub fn from_secret_key(secret: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public = secret.public_key(&secp);
        Self { secret, public }
    }

    /// Parse a 32-byte hex secret key.
    pub fn from_secret_hex(s: &str) -> Result<Self, CryptoError> {
        let secret =
            SecretKey::from_str(s.trim()).map_err(|e| CryptoError::InvalidSecretKey(e.to_string()))?;
        Ok(Self::from_secret_key(secret))
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }
}

impl std::fmt::Debug for RecipientKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipientKeypair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Parse a compressed (33-byte) or uncompressed (65-byte) hex public key.
pub fn parse_public_key(s: &str) -> Result<PublicKey, CryptoError> {
    PublicKey::from_str(s.trim()).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_distinct() {
        let a = RecipientKeypair::generate();
        let b = RecipientKeypair::generate();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_from_secret_hex_derives_public() {
        let hex_sk = "0100000000000000000000000000000000000000000000000000000000000003";
        let kp = RecipientKeypair::from_secret_hex(hex_sk).unwrap();
        let again = RecipientKeypair::from_secret_hex(hex_sk).unwrap();
        assert_eq!(kp.public_key(), again.public_key());
    }

    #[test]
    fn test_invalid_secret_hex() {
        assert!(matches!(
            RecipientKeypair::from_secret_hex("not hex"),
            Err(CryptoError::InvalidSecretKey(_))
        ));
        // Zero is not a valid scalar
        assert!(RecipientKeypair::from_secret_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn test_parse_public_key_roundtrip() {
        let kp = RecipientKeypair::generate();
        let parsed = parse_public_key(&kp.public_key().to_string()).unwrap();
        assert_eq!(parsed, kp.public_key());
        assert!(parse_public_key("02deadbeef").is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let kp = RecipientKeypair::from_secret_hex(
            "0100000000000000000000000000000000000000000000000000000000000003",
        )
        .unwrap();
        let shown = format!("{:?}", kp);
        assert!(!shown.contains("0100000000000000"));
    }
}
