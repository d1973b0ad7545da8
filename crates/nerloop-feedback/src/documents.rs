//! Loading and saving the JSON documents behind the feedback context.
//!
//! Loads never fail. A missing or unreadable document falls back to its
//! empty default, which is written back immediately so the next run finds
//! a valid document. A document that exists but does not decode is copied
//! to `<key>.corrupt` first. Every fallback produces a [`LoadWarning`].
//!
//! Saves are independent: one failed write never prevents another.

use std::fmt;

use nerloop_config::StorageConfig;
use nerloop_storage::SharedBlobStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{FeedbackError, Result};

/// Suffix appended to the key of a quarantined document.
pub const CORRUPT_SUFFIX: &str = ".corrupt";

/// Storage keys of the persisted documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKeys {
    pub corrected_entities: String,
    pub feedback_history: String,
    pub preference_table: String,
}

impl Default for DocumentKeys {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

impl From<&StorageConfig> for DocumentKeys {
    fn from(config: &StorageConfig) -> Self {
        Self {
            corrected_entities: config.corrected_entities_key.clone(),
            feedback_history: config.feedback_history_key.clone(),
            preference_table: config.preference_table_key.clone(),
        }
    }
}

/// Why a document load fell back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No document existed yet.
    Missing,
    /// The store could not be read.
    Unreadable,
    /// The document did not decode; it was quarantined.
    Malformed,
}

/// A load that fell back to the empty default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadWarning {
    pub key: String,
    pub reason: FallbackReason,
    pub detail: String,
    /// Whether the empty placeholder was written back.
    pub placeholder_written: bool,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?} ({})", self.key, self.reason, self.detail)
    }
}

/// Outcome of a single document write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteStatus {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WriteStatus {
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of persisting all documents at the end of a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistReport {
    pub corrected_entities: WriteStatus,
    pub feedback_history: WriteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference_table: Option<WriteStatus>,
}

impl PersistReport {
    /// Whether every attempted write succeeded.
    pub fn all_ok(&self) -> bool {
        self.corrected_entities.ok()
            && self.feedback_history.ok()
            && self.preference_table.as_ref().is_none_or(WriteStatus::ok)
    }
}

/// JSON documents in a blob store.
#[derive(Clone)]
pub struct DocumentStore {
    store: SharedBlobStore,
    keys: DocumentKeys,
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("backend", &self.store.backend_name())
            .field("keys", &self.keys)
            .finish()
    }
}

impl DocumentStore {
    pub fn new(store: SharedBlobStore, keys: DocumentKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &DocumentKeys {
        &self.keys
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Load and decode `key`, falling back to `T::default()`.
    pub fn load_or_default<T>(&self, key: &str) -> (T, Option<LoadWarning>)
    where
        T: DeserializeOwned + Serialize + Default,
    {
        let (reason, detail) = match self.store.get(key) {
            Ok(bytes) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => return (value, None),
                Err(e) => {
                    let quarantine = format!("{key}{CORRUPT_SUFFIX}");
                    if let Err(qe) = self.store.put(&quarantine, &bytes) {
                        error!(key, error = %qe, "Failed to quarantine malformed document");
                    }
                    (FallbackReason::Malformed, e.to_string())
                }
            },
            Err(e) if e.is_not_found() => (FallbackReason::Missing, e.to_string()),
            Err(e) => (FallbackReason::Unreadable, e.to_string()),
        };

        let value = T::default();
        let placeholder_written = match self.save(key, &value) {
            Ok(()) => true,
            Err(e) => {
                error!(key, error = %e, "Failed to write placeholder document");
                false
            }
        };

        let warning = LoadWarning {
            key: key.to_string(),
            reason,
            detail,
            placeholder_written,
        };
        match warning.reason {
            FallbackReason::Missing => info!(key, "Document missing, starting empty"),
            _ => warn!(key, reason = ?warning.reason, detail = %warning.detail, "Document unusable, starting empty"),
        }
        (value, Some(warning))
    }

    /// Encode and write `value` under `key`.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.store.put(key, &bytes).map_err(FeedbackError::from)
    }

    /// Write `value` under `key`, capturing failure in the status.
    pub fn save_reported<T: Serialize>(&self, key: &str, value: &T) -> WriteStatus {
        let error = match self.save(key, value) {
            Ok(()) => None,
            Err(e) => {
                error!(key, error = %e, "Failed to persist document");
                Some(e.to_string())
            }
        };
        WriteStatus {
            key: key.to_string(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityStore, FeedbackLog};
    use nerloop_storage::{BlobStore, MemoryBlobStore, StorageError};
    use std::sync::Arc;

    /// Store whose reads all fail with a non-NotFound error.
    struct BrokenReads(MemoryBlobStore);

    impl BlobStore for BrokenReads {
        fn get(&self, key: &str) -> nerloop_storage::Result<Vec<u8>> {
            Err(StorageError::Status {
                key: key.to_string(),
                status: 503,
                message: "unavailable".to_string(),
            })
        }
        fn put(&self, key: &str, bytes: &[u8]) -> nerloop_storage::Result<()> {
            self.0.put(key, bytes)
        }
        fn backend_name(&self) -> &'static str {
            "broken-reads"
        }
    }

    fn docs(store: Arc<MemoryBlobStore>) -> DocumentStore {
        DocumentStore::new(store, DocumentKeys::default())
    }

    #[test]
    fn test_load_valid_document() {
        let store = Arc::new(MemoryBlobStore::new());
        store
            .put("feedback_history.json", br#"[["Galaxy", 1]]"#)
            .unwrap();

        let (log, warning): (FeedbackLog, _) = docs(store).load_or_default("feedback_history.json");
        assert!(warning.is_none());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_missing_document_writes_placeholder() {
        let store = Arc::new(MemoryBlobStore::new());
        let (entities, warning): (EntityStore, _) =
            docs(store.clone()).load_or_default("corrected_entities.json");

        assert!(entities.is_empty());
        let warning = warning.unwrap();
        assert_eq!(warning.reason, FallbackReason::Missing);
        assert!(warning.placeholder_written);
        assert_eq!(store.get("corrected_entities.json").unwrap(), b"{}");
    }

    #[test]
    fn test_malformed_document_is_quarantined() {
        let store = Arc::new(MemoryBlobStore::new());
        store.put("feedback_history.json", b"not json").unwrap();

        let (log, warning): (FeedbackLog, _) =
            docs(store.clone()).load_or_default("feedback_history.json");

        assert!(log.is_empty());
        assert_eq!(warning.unwrap().reason, FallbackReason::Malformed);
        assert_eq!(
            store.get("feedback_history.json.corrupt").unwrap(),
            b"not json"
        );
        assert_eq!(store.get("feedback_history.json").unwrap(), b"[]");
    }

    #[test]
    fn test_wrong_schema_is_malformed() {
        let store = Arc::new(MemoryBlobStore::new());
        store.put("corrected_entities.json", b"[1, 2]").unwrap();

        let (_, warning): (EntityStore, _) =
            docs(store.clone()).load_or_default("corrected_entities.json");
        assert_eq!(warning.unwrap().reason, FallbackReason::Malformed);
    }

    #[test]
    fn test_unreadable_store_falls_back() {
        let inner = MemoryBlobStore::new();
        let docs = DocumentStore::new(Arc::new(BrokenReads(inner)), DocumentKeys::default());

        let (log, warning): (FeedbackLog, _) = docs.load_or_default("feedback_history.json");
        assert!(log.is_empty());
        let warning = warning.unwrap();
        assert_eq!(warning.reason, FallbackReason::Unreadable);
        assert!(warning.detail.contains("503"));
        assert!(warning.placeholder_written);
    }

    #[test]
    fn test_save_reported_captures_error() {
        let store = Arc::new(MemoryBlobStore::new());
        let status = docs(store).save_reported("../escape.json", &FeedbackLog::new());
        assert!(!status.ok());
        assert!(status.error.unwrap().contains("escape"));
    }

    #[test]
    fn test_persist_report_all_ok() {
        let ok = |key: &str| WriteStatus {
            key: key.to_string(),
            error: None,
        };
        let mut report = PersistReport {
            corrected_entities: ok("a"),
            feedback_history: ok("b"),
            preference_table: None,
        };
        assert!(report.all_ok());
        report.preference_table = Some(WriteStatus {
            key: "c".to_string(),
            error: Some("boom".to_string()),
        });
        assert!(!report.all_ok());
    }
}
