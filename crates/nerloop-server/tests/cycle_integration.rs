//! End-to-end review cycles against a running server.

mod common;

use std::sync::Arc;

use anyhow::Result;
use nerloop_config::LearningConfig;
use nerloop_feedback::{CyclePhase, CycleSummary, CycleView};
use nerloop_server::ErrorResponse;
use nerloop_server::routes::{CorrectionsResponse, HealthResponse, JudgmentResponse, PreferencesResponse};
use serde_json::json;

use common::TestServer;

#[tokio::test]
async fn test_health_reports_placeholder_warnings_on_fresh_store() -> Result<()> {
    let server = TestServer::start().await?;

    let health: HealthResponse = server.get("/health").send().await?.json().await?;
    assert_eq!(health.status, "ok");
    assert_eq!(health.engine, "gazetteer");
    assert_eq!(health.storage, "fs");
    assert_eq!(health.warnings.len(), 2);

    // placeholders were written on startup
    assert_eq!(server.read_document("corrected_entities.json")?, json!({}));
    assert_eq!(server.read_document("feedback_history.json")?, json!([]));
    Ok(())
}

#[tokio::test]
async fn test_full_cycle_persists_documents() -> Result<()> {
    let server = TestServer::start().await?;
    let text = "Samsung announced the Galaxy today";

    let view: CycleView = server
        .post("/api/v1/cycle")
        .json(&json!({"text": text}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(view.phase, CyclePhase::ReviewEntities);
    assert_eq!(view.entities.len(), 2);

    let judged: JudgmentResponse = server
        .post("/api/v1/cycle/judgments")
        .json(&json!({"entity": "Samsung", "is_correct": true}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(judged.cycle.phase, CyclePhase::ReviewEntities);

    let judged: JudgmentResponse = server
        .post("/api/v1/cycle/judgments")
        .json(&json!({"entity": "Galaxy", "is_correct": false, "correction": "Galaxy S24"}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(judged.cycle.phase, CyclePhase::AwaitManualAdd);

    let summary: CycleSummary = server
        .post("/api/v1/cycle/finish")
        .json(&json!({"entity_text": "", "entity_type": "PRODUCT"}))
        .send()
        .await?
        .json()
        .await?;
    assert!(summary.persist.all_ok());
    assert!(summary.manual.is_none());

    assert_eq!(
        server.read_document("feedback_history.json")?,
        json!([["Samsung", 1], ["Galaxy", -1]])
    );
    assert_eq!(
        server.read_document("corrected_entities.json")?,
        json!({text: {"Galaxy": "Galaxy S24"}})
    );

    // Resubmitting the same text shows stored corrections
    let view: CycleView = server
        .post("/api/v1/cycle")
        .json(&json!({"text": text}))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(view.phase, CyclePhase::ShowStored);
    assert_eq!(view.corrections.get("Galaxy").unwrap(), "Galaxy S24");

    let found: CorrectionsResponse = server
        .get("/api/v1/corrections")
        .query(&[("text", text)])
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(found.corrections.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_invalid_transitions_are_conflicts() -> Result<()> {
    let server = TestServer::start().await?;

    let resp = server.post("/api/v1/cycle/finish").send().await?;
    assert_eq!(resp.status(), 409);
    let err: ErrorResponse = resp.json().await?;
    assert_eq!(err.code, "invalid_transition");

    server
        .post("/api/v1/cycle")
        .json(&json!({"text": "Google Pixel"}))
        .send()
        .await?;
    let resp = server
        .post("/api/v1/cycle")
        .json(&json!({"text": "Another text"}))
        .send()
        .await?;
    assert_eq!(resp.status(), 409);

    let view: CycleView = server.get("/api/v1/cycle").send().await?.json().await?;
    assert_eq!(view.input.as_deref(), Some("Google Pixel"));
    Ok(())
}

#[tokio::test]
async fn test_wrong_entity_guard_is_bad_request() -> Result<()> {
    let server = TestServer::start().await?;
    server
        .post("/api/v1/cycle")
        .json(&json!({"text": "Google Pixel"}))
        .send()
        .await?;

    let resp = server
        .post("/api/v1/cycle/judgments")
        .json(&json!({"entity": "Pixel", "is_correct": true}))
        .send()
        .await?;
    assert_eq!(resp.status(), 400);

    let view: CycleView = server.get("/api/v1/cycle").send().await?.json().await?;
    assert_eq!(view.prompt.unwrap().entity.text, "Google");
    Ok(())
}

#[tokio::test]
async fn test_state_survives_restart() -> Result<()> {
    let learning = LearningConfig {
        persist_preferences: true,
        ..Default::default()
    };
    let first = TestServer::start_in(Arc::new(tempfile::TempDir::new()?), learning.clone()).await?;
    let data_dir = first.data_dir.clone();

    first
        .post("/api/v1/cycle")
        .json(&json!({"text": "a Pixel phone"}))
        .send()
        .await?;
    first
        .post("/api/v1/cycle/judgments")
        .json(&json!({"is_correct": true}))
        .send()
        .await?;
    first.post("/api/v1/cycle/finish").send().await?;

    let second = TestServer::start_in(data_dir, learning).await?;
    let health: HealthResponse = second.get("/health").send().await?.json().await?;
    assert!(health.warnings.is_empty());

    let prefs: PreferencesResponse = second.get("/api/v1/preferences").send().await?.json().await?;
    assert!(prefs.persisted);
    assert!((prefs.preferences.scores("Pixel").unwrap().accept - 0.1).abs() < 1e-9);
    // exploration restarts with the process
    assert_eq!(prefs.exploration_rate, 1.0);
    Ok(())
}
