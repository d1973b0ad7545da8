//! Entity store lookup endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use nerloop_feedback::Corrections;
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

/// Query for a corrections lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionsQuery {
    /// Exact input text.
    #[serde(default)]
    pub text: String,
}

/// Corrections stored for one input text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionsResponse {
    pub text: String,
    pub corrections: Corrections,
}

/// GET /api/v1/corrections?text= - Exact-match entity store lookup.
pub async fn corrections_handler(
    State(state): State<AppState>,
    Query(query): Query<CorrectionsQuery>,
) -> Result<Json<CorrectionsResponse>, ServerError> {
    if query.text.trim().is_empty() {
        return Err(ServerError::BadRequest(
            "query parameter 'text' is required".to_string(),
        ));
    }

    let response = state
        .with_controller(move |c| {
            let corrections = c
                .context()
                .entities
                .lookup(&query.text)
                .cloned()
                .ok_or_else(|| {
                    ServerError::NotFound(format!("No corrections stored for '{}'", query.text))
                })?;
            Ok(CorrectionsResponse {
                text: query.text,
                corrections,
            })
        })
        .await?;
    Ok(Json(response))
}
