//! Feedback log endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use nerloop_feedback::FeedbackEntry;
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

/// Optional filter for the feedback log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackQuery {
    /// Only entries for this entity text.
    pub entity: Option<String>,
}

/// Feedback log entries, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub total: usize,
    pub entries: Vec<FeedbackEntry>,
}

/// GET /api/v1/feedback - The feedback log.
pub async fn feedback_handler(
    State(state): State<AppState>,
    Query(query): Query<FeedbackQuery>,
) -> Result<Json<FeedbackResponse>, ServerError> {
    let response = state
        .with_controller(move |c| {
            let entries: Vec<FeedbackEntry> = c
                .context()
                .feedback
                .entries()
                .iter()
                .filter(|e| query.entity.as_deref().is_none_or(|want| e.entity() == want))
                .cloned()
                .collect();
            Ok(FeedbackResponse {
                total: entries.len(),
                entries,
            })
        })
        .await?;
    Ok(Json(response))
}
