//! Review cycle endpoints.
//!
//! Each mutating endpoint maps to one controller event:
//!
//! | method | path | event |
//! | --- | --- | --- |
//! | POST | `/cycle` | submit text |
//! | POST | `/cycle/judgments` | judge the current entity |
//! | POST | `/cycle/finish` | finish, with an optional manual entity |
//! | DELETE | `/cycle` | reset |

use axum::{Json, extract::State};
use nerloop_feedback::{
    CyclePhase, CycleSummary, CycleView, JudgmentRecord, ManualEntity, PersistReport,
};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Request to start a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Free text to run NER over.
    pub text: String,
}

/// Judgment of the entity under review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeRequest {
    /// Entity text the client believes is current. Rejected on mismatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Whether the entity is correct.
    pub is_correct: bool,
    /// Corrected value for the entity. Blank means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
}

/// Request to finish the cycle. Both fields must be non-blank for the
/// manual entity to be added.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinishRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

impl FinishRequest {
    fn into_manual(self) -> Option<ManualEntity> {
        match (self.entity_text, self.entity_type) {
            (None, None) => None,
            (text, kind) => Some(ManualEntity::new(
                text.unwrap_or_default(),
                kind.unwrap_or_default(),
            )),
        }
    }
}

/// Response for a judgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgmentResponse {
    pub judgment: JudgmentRecord,
    /// Cycle state after the judgment.
    pub cycle: CycleView,
}

/// Response for a reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    /// Phase the cycle was in before the reset.
    pub previous: CyclePhase,
    /// Writes made for judgments of the abandoned cycle, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist: Option<PersistReport>,
    pub cycle: CycleView,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/cycle - Current cycle state.
pub async fn get_cycle_handler(
    State(state): State<AppState>,
) -> Result<Json<CycleView>, ServerError> {
    let view = state.with_controller(|c| Ok(c.view())).await?;
    Ok(Json(view))
}

/// POST /api/v1/cycle - Submit text and start a cycle.
pub async fn submit_handler(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<CycleView>, ServerError> {
    let view = state
        .with_controller(move |c| Ok(c.submit_text(&request.text)?))
        .await?;
    Ok(Json(view))
}

/// POST /api/v1/cycle/judgments - Judge the current entity.
pub async fn judge_handler(
    State(state): State<AppState>,
    Json(request): Json<JudgeRequest>,
) -> Result<Json<JudgmentResponse>, ServerError> {
    let response = state
        .with_controller(move |c| {
            let judgment = c.judge(
                request.entity.as_deref(),
                request.is_correct,
                request.correction.as_deref(),
            )?;
            Ok(JudgmentResponse {
                judgment,
                cycle: c.view(),
            })
        })
        .await?;
    Ok(Json(response))
}

/// POST /api/v1/cycle/finish - Add an optional manual entity and persist.
pub async fn finish_handler(
    State(state): State<AppState>,
    body: Option<Json<FinishRequest>>,
) -> Result<Json<CycleSummary>, ServerError> {
    let manual = body.and_then(|Json(request)| request.into_manual());
    let summary = state.with_controller(move |c| Ok(c.finish(manual)?)).await?;
    Ok(Json(summary))
}

/// DELETE /api/v1/cycle - Abandon the current cycle.
pub async fn reset_handler(
    State(state): State<AppState>,
) -> Result<Json<ResetResponse>, ServerError> {
    let response = state
        .with_controller(|c| {
            let report = c.reset();
            Ok(ResetResponse {
                previous: report.previous,
                persist: report.persist,
                cycle: c.view(),
            })
        })
        .await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorResponse;
    use crate::routes::test_support::{empty_request, json_request, send, test_state};
    use crate::Server;
    use axum::http::StatusCode;
    use serde_json::json;

    fn app() -> axum::Router {
        Server::from_state(test_state()).router()
    }

    #[tokio::test]
    async fn test_cycle_starts_idle() {
        let app = app();
        let (status, view): (_, CycleView) = send(&app, empty_request("GET", "/api/v1/cycle")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view.phase, CyclePhase::Idle);
    }

    #[tokio::test]
    async fn test_submit_and_review_flow() {
        let app = app();

        let (status, view): (_, CycleView) = send(
            &app,
            json_request("POST", "/api/v1/cycle", json!({"text": "Samsung Galaxy phone"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view.phase, CyclePhase::ReviewEntities);
        assert_eq!(view.prompt.as_ref().unwrap().entity.text, "Samsung");

        let (status, judged): (_, JudgmentResponse) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/cycle/judgments",
                json!({"entity": "Samsung", "is_correct": true}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!((judged.judgment.scores.accept - 0.1).abs() < 1e-9);
        assert_eq!(judged.cycle.prompt.unwrap().entity.text, "Galaxy");

        let (_, judged): (_, JudgmentResponse) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/cycle/judgments",
                json!({"is_correct": false, "correction": "Galaxy S24"}),
            ),
        )
        .await;
        assert_eq!(judged.cycle.phase, CyclePhase::AwaitManualAdd);

        let (status, summary): (_, CycleSummary) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/cycle/finish",
                json!({"entity_text": "phone", "entity_type": "PRODUCT"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(summary.persist.all_ok());
        assert_eq!(summary.corrections.len(), 2);
        assert_eq!(summary.preferences.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_text_is_bad_request() {
        let app = app();
        let (status, err): (_, ErrorResponse) =
            send(&app, json_request("POST", "/api/v1/cycle", json!({"text": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");
    }

    #[tokio::test]
    async fn test_judge_when_idle_is_conflict() {
        let app = app();
        let (status, err): (_, ErrorResponse) = send(
            &app,
            json_request("POST", "/api/v1/cycle/judgments", json!({"is_correct": true})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err.code, "invalid_transition");
    }

    #[tokio::test]
    async fn test_finish_without_body() {
        let app = app();
        send::<CycleView>(
            &app,
            json_request("POST", "/api/v1/cycle", json!({"text": "nothing known here"})),
        )
        .await;

        let (status, summary): (_, CycleSummary) =
            send(&app, empty_request("POST", "/api/v1/cycle/finish")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(summary.manual.is_none());
    }

    #[tokio::test]
    async fn test_reset_returns_previous_phase() {
        let app = app();
        send::<CycleView>(
            &app,
            json_request("POST", "/api/v1/cycle", json!({"text": "Galaxy"})),
        )
        .await;

        let (status, reset): (_, ResetResponse) =
            send(&app, empty_request("DELETE", "/api/v1/cycle")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reset.previous, CyclePhase::ReviewEntities);
        assert_eq!(reset.persist, None);
        assert_eq!(reset.cycle.phase, CyclePhase::Idle);
    }

    #[tokio::test]
    async fn test_reset_mid_review_saves_judgments() {
        let app = app();
        send::<CycleView>(
            &app,
            json_request("POST", "/api/v1/cycle", json!({"text": "Samsung Galaxy phone"})),
        )
        .await;
        send::<JudgmentResponse>(
            &app,
            json_request("POST", "/api/v1/cycle/judgments", json!({"is_correct": true})),
        )
        .await;

        let (status, reset): (_, ResetResponse) =
            send(&app, empty_request("DELETE", "/api/v1/cycle")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(reset.persist.unwrap().all_ok());
    }

    #[tokio::test]
    async fn test_finish_keeps_manual_entity_in_other_case() {
        let app = app();
        send::<CycleView>(
            &app,
            json_request("POST", "/api/v1/cycle", json!({"text": "Buy a Galaxy phone"})),
        )
        .await;
        send::<JudgmentResponse>(
            &app,
            json_request("POST", "/api/v1/cycle/judgments", json!({"is_correct": true})),
        )
        .await;

        let (status, summary): (_, CycleSummary) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/cycle/finish",
                json!({"entity_text": "galaxy phone", "entity_type": "PRODUCT"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary.corrections.get("galaxy phone").unwrap(), "PRODUCT");
    }

    #[test]
    fn test_finish_request_into_manual() {
        assert_eq!(FinishRequest::default().into_manual(), None);
        let partial = FinishRequest {
            entity_text: Some("phone".to_string()),
            entity_type: None,
        };
        assert_eq!(partial.into_manual(), Some(ManualEntity::new("phone", "")));
    }
}
