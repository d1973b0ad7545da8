use nerloop_ner::NerError;
use nerloop_storage::StorageError;
use thiserror::Error;

use crate::controller::CyclePhase;

#[derive(Debug, Error)]
pub enum FeedbackError {
    /// The event is not allowed in the controller's current state.
    #[error("Cannot {event} while {phase}")]
    InvalidTransition {
        phase: CyclePhase,
        event: &'static str,
    },

    /// Caller input was rejected. State is unchanged.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The NER engine failed. State is unchanged.
    #[error("Inference error: {0}")]
    Inference(#[from] NerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] nerloop_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, FeedbackError>;
