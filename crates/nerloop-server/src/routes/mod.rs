//! API routes.

pub mod corrections;
pub mod cycle;
pub mod feedback;
pub mod health;
pub mod preferences;

pub use corrections::{CorrectionsQuery, CorrectionsResponse, corrections_handler};
pub use cycle::{
    FinishRequest, JudgeRequest, JudgmentResponse, ResetResponse, SubmitRequest, finish_handler,
    get_cycle_handler, judge_handler, reset_handler, submit_handler,
};
pub use feedback::{FeedbackQuery, FeedbackResponse, feedback_handler};
pub use health::{HealthResponse, health_routes};
pub use preferences::{PreferencesResponse, preferences_handler};
