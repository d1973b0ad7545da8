//! Error types for NER engines.

use thiserror::Error;

/// NER engine error.
#[derive(Debug, Error)]
pub enum NerError {
    /// The model could not be loaded.
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    /// Inference itself failed.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// The engine was misconfigured.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure talking to a remote engine.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Fetching model files from blob storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] nerloop_storage::StorageError),

    /// Local filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for NER operations.
pub type Result<T> = std::result::Result<T, NerError>;
