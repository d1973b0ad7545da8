//! Preference table endpoint.

use axum::{Json, extract::State};
use nerloop_feedback::PreferenceTable;
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

/// Full preference table plus the learning state around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesResponse {
    pub exploration_rate: f64,
    pub min_exploration_rate: f64,
    pub learning_rate: f64,
    pub discount_factor: f64,
    /// Whether the table survives a restart.
    pub persisted: bool,
    pub total: usize,
    pub preferences: PreferenceTable,
}

/// GET /api/v1/preferences - Snapshot of the preference table.
pub async fn preferences_handler(
    State(state): State<AppState>,
) -> Result<Json<PreferencesResponse>, ServerError> {
    let response = state
        .with_controller(|c| {
            let ctx = c.context();
            Ok(PreferencesResponse {
                exploration_rate: ctx.exploration.rate(),
                min_exploration_rate: ctx.exploration.min_rate(),
                learning_rate: ctx.params.learning_rate,
                discount_factor: ctx.params.discount_factor,
                persisted: ctx.persists_preferences(),
                total: ctx.preferences.len(),
                preferences: ctx.preferences.clone(),
            })
        })
        .await?;
    Ok(Json(response))
}
