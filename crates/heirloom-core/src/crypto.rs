//! Payload encryption
//!
//! AES-256-GCM under a random 256-bit key.
//!
//! # Blob Format
//!
//! `[nonce (12 bytes)][ciphertext][tag (16 bytes)]`
//!
//! Every call draws a fresh nonce, so encrypting the same payload twice never
//! yields the same blob. Decryption checks the tag before returning anything.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Symmetric key length (256 bits)
pub const KEY_LEN: usize = 32;

/// Nonce length for AES-256-GCM
pub const NONCE_LEN: usize = 12;

/// Authentication tag length for AES-256-GCM
pub const TAG_LEN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,
    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),
    #[error("Invalid ciphertext format")]
    InvalidFormat,
}

/// A 256-bit symmetric key. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_LEN]);

impl SymmetricKey {
    /// Fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                got: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// Generate a random payload key.
pub fn generate_symmetric_key() -> SymmetricKey {
    SymmetricKey::generate()
}

/// Encrypt a payload.
///
/// # Returns
/// `nonce || ciphertext || tag`
pub fn encrypt_payload(plaintext: &[u8], key: &SymmetricKey) -> Result<Vec<u8>, CryptoError> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = key
        .cipher()
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a payload blob produced by [`encrypt_payload`].
///
/// # Errors
/// `DecryptionFailed` if the key is wrong or any byte of the blob was
/// altered; `InvalidFormat` if the blob is too short to hold a nonce and tag.
pub fn decrypt_payload(blob: &[u8], key: &SymmetricKey) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::InvalidFormat);
    }
    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
    key.cipher()
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = generate_symmetric_key();
        let secret = b"the combination is 12-34-56";

        let blob = encrypt_payload(secret, &key).unwrap();
        assert_eq!(blob.len(), NONCE_LEN + secret.len() + TAG_LEN);

        let decrypted = decrypt_payload(&blob, &key).unwrap();
        assert_eq!(decrypted, secret);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = generate_symmetric_key();
        let other = generate_symmetric_key();

        let blob = encrypt_payload(b"secret", &key).unwrap();
        assert_eq!(
            decrypt_payload(&blob, &other),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_tampered_blob_fails() {
        let key = generate_symmetric_key();
        let blob = encrypt_payload(b"secret", &key).unwrap();

        // Flip a bit in the nonce, the body and the tag
        for idx in [0, NONCE_LEN, blob.len() - 1] {
            let mut tampered = blob.clone();
            tampered[idx] ^= 0x01;
            assert_eq!(
                decrypt_payload(&tampered, &key),
                Err(CryptoError::DecryptionFailed),
                "tamper at byte {} was not detected",
                idx
            );
        }
    }

    #[test]
    fn test_truncated_blob_rejected() {
        let key = generate_symmetric_key();
        assert_eq!(
            decrypt_payload(&[0u8; NONCE_LEN + TAG_LEN - 1], &key),
            Err(CryptoError::InvalidFormat)
        );
    }

    #[test]
    fn test_empty_payload() {
        let key = generate_symmetric_key();
        let blob = encrypt_payload(b"", &key).unwrap();
        assert!(decrypt_payload(&blob, &key).unwrap().is_empty());
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let key = generate_symmetric_key();
        let a = encrypt_payload(b"same", &key).unwrap();
        let b = encrypt_payload(b"same", &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_from_slice() {
        assert!(SymmetricKey::from_slice(&[7u8; 32]).is_ok());
        assert_eq!(
            SymmetricKey::from_slice(&[7u8; 16]).unwrap_err(),
            CryptoError::InvalidKeyLength {
                expected: 32,
                got: 16
            }
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = SymmetricKey::from_bytes([0xAB; 32]);
        let shown = format!("{:?}", key);
        assert!(!shown.contains("171"));
        assert!(!shown.to_lowercase().contains("ab"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_roundtrip_any_payload(
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            key_bytes in any::<[u8; 32]>(),
        ) {
            let key = SymmetricKey::from_bytes(key_bytes);
            let blob = encrypt_payload(&payload, &key).unwrap();
            prop_assert_eq!(decrypt_payload(&blob, &key).unwrap(), payload);
        }

        #[test]
        fn prop_other_key_fails(
            payload in proptest::collection::vec(any::<u8>(), 0..128),
            key_bytes in any::<[u8; 32]>(),
            other_bytes in any::<[u8; 32]>(),
        ) {
            prop_assume!(key_bytes != other_bytes);
            let blob = encrypt_payload(&payload, &SymmetricKey::from_bytes(key_bytes)).unwrap();
            prop_assert_eq!(
                decrypt_payload(&blob, &SymmetricKey::from_bytes(other_bytes)),
                Err(CryptoError::DecryptionFailed)
            );
        }
    }
}
