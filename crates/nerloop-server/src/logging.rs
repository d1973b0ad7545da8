//! Request logging middleware.
//!
//! Enabled by `[server] request_logging`. Health probes log at debug so
//! `nerloop status` polling stays out of the info stream.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, info, warn};

use crate::state::AppState;

pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        error!(%method, %path, status, elapsed_ms, "Request failed");
    } else if response.status().is_client_error() {
        warn!(%method, %path, status, elapsed_ms, "Request rejected");
    } else if path == "/health" {
        debug!(%method, %path, status, elapsed_ms, "Health probe");
    } else {
        info!(%method, %path, status, elapsed_ms, "Request handled");
    }

    response
}
