//! Content-addressed blob storage.
//!
//! Ids are the lowercase hex SHA-256 of the stored bytes, so `get` can check
//! what it hands back.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob id: {0}")]
    InvalidId(String),

    #[error("Blob {0} does not match its content id")]
    DigestMismatch(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// `put(bytes) -> id` / `get(id) -> bytes`.
pub trait BlobStore: Send + Sync {
    fn put(&self, bytes: &[u8]) -> Result<String, BlobError>;
    fn get(&self, id: &str) -> Result<Vec<u8>, BlobError>;
}

/// Content id of `bytes`.
pub fn content_id(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn check_id(id: &str) -> Result<(), BlobError> {
    let valid = id.len() == 64 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if valid {
        Ok(())
    } else {
        Err(BlobError::InvalidId(id.to_string()))
    }
}

fn verified(id: &str, bytes: Vec<u8>) -> Result<Vec<u8>, BlobError> {
    if content_id(&bytes) != id {
        return Err(BlobError::DigestMismatch(id.to_string()));
    }
    Ok(bytes)
}

/// In-process store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<String, BlobError> {
        let id = content_id(bytes);
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.clone())
            .or_insert_with(|| bytes.to_vec());
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<Vec<u8>, BlobError> {
        check_id(id)?;
        let bytes = self
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(id.to_string()))?;
        verified(id, bytes)
    }
}

/// One file per blob, named by content id.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, BlobError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobStore for DirBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<String, BlobError> {
        let id = content_id(bytes);
        let path = self.root.join(&id);
        if !path.exists() {
            // Write then rename so readers never see a partial blob
            let tmp = self.root.join(format!("{}.tmp", id));
            fs::write(&tmp, bytes)?;
            fs::rename(&tmp, &path)?;
            log::debug!("stored blob {} ({} bytes)", id, bytes.len());
        }
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<Vec<u8>, BlobError> {
        check_id(id)?;
        match fs::read(self.root.join(id)) {
            Ok(bytes) => verified(id, bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BlobError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_content_id_is_sha256() {
        assert_eq!(
            content_id(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryBlobStore::new();
        let id = store.put(b"payload").unwrap();
        assert_eq!(store.get(&id).unwrap(), b"payload");

        // Same content, same id, stored once
        assert_eq!(store.put(b"payload").unwrap(), id);
        assert_eq!(store.len(), 1);

        let missing = content_id(b"other");
        assert!(matches!(store.get(&missing), Err(BlobError::NotFound(_))));
    }

    #[test]
    fn test_rejects_malformed_ids() {
        let store = MemoryBlobStore::new();
        assert!(matches!(store.get("../etc/passwd"), Err(BlobError::InvalidId(_))));
        assert!(matches!(store.get(&"A".repeat(64)), Err(BlobError::InvalidId(_))));
    }

    #[test]
    fn test_dir_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = DirBlobStore::open(dir.path().join("blobs")).unwrap();

        let id = store.put(b"ciphertext").unwrap();
        assert!(store.root().join(&id).exists());
        assert_eq!(store.get(&id).unwrap(), b"ciphertext");

        // A second handle sees the same data
        let reopened = DirBlobStore::open(store.root()).unwrap();
        assert_eq!(reopened.get(&id).unwrap(), b"ciphertext");
    }

    #[test]
    fn test_dir_store_detects_tampering() {
        let dir = tempdir().unwrap();
        let store = DirBlobStore::open(dir.path()).unwrap();
        let id = store.put(b"original").unwrap();

        fs::write(dir.path().join(&id), b"tampered").unwrap();
        assert!(matches!(store.get(&id), Err(BlobError::DigestMismatch(_))));
    }

    #[test]
    fn test_dir_store_missing() {
        let dir = tempdir().unwrap();
        let store = DirBlobStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.get(&content_id(b"never stored")),
            Err(BlobError::NotFound(_))
        ));
    }
}
