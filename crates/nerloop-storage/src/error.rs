//! Error types for blob storage operations.

/// Error type for blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No object exists under the key.
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// The key is not acceptable for this store.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Local filesystem failure.
    #[error("IO error on '{key}': {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },

    /// Transport failure talking to a remote store.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote store answered with an unexpected status.
    #[error("Unexpected status {status} for '{key}': {message}")]
    Status {
        key: String,
        status: u16,
        message: String,
    },
}

impl StorageError {
    /// Whether this error means the object simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for blob storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
