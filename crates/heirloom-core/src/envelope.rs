//! Sealed envelopes: asymmetric authenticated encryption to a public key.
//!
//! Each seal generates a fresh ephemeral secp256k1 keypair, so envelopes
//! sealed to the same recipient share no key material with each other.
//!
//! # Wire Format
//!
//! `[version (1)][ephemeral pubkey (33)][nonce (12)][ciphertext + tag]`
//!
//! The AES-256-GCM key is `HMAC-SHA256(ecdh_secret, label || eph_pk || recipient_pk)`.

use crate::crypto::{CryptoError, SymmetricKey, NONCE_LEN, TAG_LEN};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use hmac::{Hmac, Mac};
use secp256k1::ecdh::SharedSecret;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Current envelope format version
pub const ENVELOPE_VERSION: u8 = 1;

const PUBKEY_LEN: usize = 33;
const HEADER_LEN: usize = 1 + PUBKEY_LEN + NONCE_LEN;
const KDF_LABEL: &[u8] = b"heirloom/share-wrap/v1";

/// Ciphertext sealed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEnvelope {
    /// Public half of the one-time sender key
    pub ephemeral_pubkey: PublicKey,
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the 16-byte tag appended
    pub ciphertext: Vec<u8>,
}

impl SealedEnvelope {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        bytes.push(ENVELOPE_VERSION);
        bytes.extend_from_slice(&self.ephemeral_pubkey.serialize());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < HEADER_LEN + TAG_LEN || bytes[0] != ENVELOPE_VERSION {
            return Err(CryptoError::InvalidFormat);
        }
        let ephemeral_pubkey = PublicKey::from_slice(&bytes[1..1 + PUBKEY_LEN])
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[1 + PUBKEY_LEN..HEADER_LEN]);

        Ok(Self {
            ephemeral_pubkey,
            nonce,
            ciphertext: bytes[HEADER_LEN..].to_vec(),
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidFormat)?;
        Self::from_bytes(&bytes)
    }
}

fn derive_wrap_key(
    shared: &SharedSecret,
    ephemeral: &PublicKey,
    recipient: &PublicKey,
) -> Result<SymmetricKey, CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(&shared.secret_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    mac.update(KDF_LABEL);
    mac.update(&ephemeral.serialize());
    mac.update(&recipient.serialize());
    SymmetricKey::from_slice(&mac.finalize().into_bytes())
}

/// Seal `plaintext` so only the holder of `recipient`'s secret key can open it.
pub fn seal(plaintext: &[u8], recipient: &PublicKey) -> Result<SealedEnvelope, CryptoError> {
    let secp = Secp256k1::new();
    let (mut ephemeral_sk, ephemeral_pubkey) = secp.generate_keypair(&mut rand::thread_rng());

    let shared = SharedSecret::new(recipient, &ephemeral_sk);
    ephemeral_sk.non_secure_erase();
    let key = derive_wrap_key(&shared, &ephemeral_pubkey, recipient)?;

    let nonce_arr = Aes256Gcm::generate_nonce(&mut OsRng);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(&nonce_arr, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&nonce_arr);

    Ok(SealedEnvelope {
        ephemeral_pubkey,
        nonce,
        ciphertext,
    })
}

/// Open an envelope with the recipient's secret key.
///
/// # Errors
/// `DecryptionFailed` for a wrong key or any tampering.
pub fn open(
    envelope: &SealedEnvelope,
    recipient_sk: &SecretKey,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let secp = Secp256k1::new();
    let recipient = recipient_sk.public_key(&secp);

    let shared = SharedSecret::new(&envelope.ephemeral_pubkey, recipient_sk);
    let key = derive_wrap_key(&shared, &envelope.ephemeral_pubkey, &recipient)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(&envelope.nonce), envelope.ciphertext.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed)
}
