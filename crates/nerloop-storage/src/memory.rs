//! In-memory blob store.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{BlobStore, Result, StorageError, validate_key};

/// Blob store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an object exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.blobs.read().contains_key(key)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        self.blobs
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.blobs.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_counts() {
        let store = MemoryBlobStore::new();
        assert!(store.is_empty());

        store.put("a.json", b"{}").unwrap();
        assert!(store.contains("a.json"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a.json").unwrap(), b"{}");
    }

    #[test]
    fn test_missing_key() {
        let store = MemoryBlobStore::new();
        assert!(store.get("nope").unwrap_err().is_not_found());
    }
}
