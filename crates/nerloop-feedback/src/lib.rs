//! The nerloop feedback loop.
//!
//! A reviewer submits text, the NER model labels it, and each recognized
//! entity gets a binary judgment. Judgments feed three structures, all
//! owned by a [`FeedbackContext`]:
//!
//! - [`PreferenceTable`] - per-entity accept/reject scores, moved by a
//!   one-step bandit update
//! - [`FeedbackLog`] - append-only `(entity, ±1)` history
//! - [`EntityStore`] - corrections keyed by the exact input text
//!
//! [`SessionController`] drives one review cycle at a time through an
//! explicit state machine and persists the documents through a
//! [`DocumentStore`] when the cycle finishes.
//!
//! # Example
//!
//! ```rust,ignore
//! let documents = DocumentStore::new(store, DocumentKeys::from(&config.storage()));
//! let (context, warnings) = FeedbackContext::load(documents, &config.learning())?;
//! let mut controller = SessionController::new(context, engine, InferenceSettings::from(&config.ner()));
//!
//! controller.submit_text("Buy a Galaxy phone")?;
//! controller.judge(Some("Galaxy"), true, Some("Galaxy S24"))?;
//! let summary = controller.finish(None)?;
//! ```

pub mod context;
pub mod controller;
pub mod documents;
pub mod entity_store;
pub mod error;
pub mod feedback_log;
pub mod preference;

pub use context::FeedbackContext;
pub use controller::{
    CyclePhase, CycleSummary, CycleView, InferenceSettings, JudgmentRecord, ManualEntity, ResetReport,
    ReviewPrompt, SessionController,
};
pub use documents::{
    CORRUPT_SUFFIX, DocumentKeys, DocumentStore, FallbackReason, LoadWarning, PersistReport,
    WriteStatus,
};
pub use entity_store::{Corrections, EntityStore};
pub use error::{FeedbackError, Result};
pub use feedback_log::{FeedbackEntry, FeedbackLog, Reward};
pub use preference::{Action, ActionScores, ExplorationSchedule, PreferenceTable, UpdateParams};
