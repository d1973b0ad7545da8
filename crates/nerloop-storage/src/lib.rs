//! Blob storage for nerloop.
//!
//! Everything nerloop persists (the corrected-entities document, the
//! feedback history, optionally the preference table and model files)
//! goes through the [`BlobStore`] trait: a flat key-value store with
//! whole-object get/put semantics.
//!
//! Backends:
//! - [`FsBlobStore`] - one file per key under a root directory
//! - [`MemoryBlobStore`] - process memory, for tests and throwaway runs
//! - [`GcsBlobStore`] - a Google Cloud Storage bucket over the JSON API
//!
//! # Example
//!
//! ```rust,ignore
//! use nerloop_storage::{BlobStore, FsBlobStore};
//!
//! let store = FsBlobStore::open("/var/lib/nerloop")?;
//! store.put("feedback_history.json", b"[]")?;
//! let bytes = store.get("feedback_history.json")?;
//! ```

mod error;
mod fs;
mod gcs;
mod memory;

use std::sync::Arc;

pub use error::{Result, StorageError};
pub use fs::FsBlobStore;
pub use gcs::{DEFAULT_GCS_BASE_URL, GcsBlobStore};
pub use memory::MemoryBlobStore;

/// Trait for blob storage backends.
///
/// Calls are blocking. Callers on an async runtime should run them on the
/// blocking pool.
pub trait BlobStore: Send + Sync {
    /// Fetch the object stored under `key`.
    ///
    /// Returns [`StorageError::NotFound`] if no object exists.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Store `bytes` under `key`, replacing any existing object.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Short backend name for logging.
    fn backend_name(&self) -> &'static str;
}

/// Shared, type-erased blob store.
pub type SharedBlobStore = Arc<dyn BlobStore>;

/// Reject keys that could escape a store's namespace.
///
/// Keys are relative, `/`-separated paths without empty, `.` or `..`
/// segments.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key is empty".to_string()));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "key must be a relative path: {key}"
        )));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(format!(
            "key has an empty or relative segment: {key}"
        )));
    }
    Ok(())
}
