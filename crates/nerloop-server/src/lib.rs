//! HTTP API server for nerloop.
//!
//! Exposes the single review session over JSON:
//!
//! - `GET /health` - liveness, engine and storage backend
//! - `/api/v1/cycle` - the review cycle (submit, judge, finish, reset)
//! - `GET /api/v1/preferences` - the preference table
//! - `GET /api/v1/corrections?text=` - entity store lookup
//! - `GET /api/v1/feedback` - the feedback log
//!
//! # Example
//!
//! ```ignore
//! use nerloop_server::{AppState, Server, ServerConfig};
//!
//! let config = ServerConfig::new().with_bind_address("127.0.0.1:8080".parse()?);
//! let state = AppState::new(controller, config).with_load_warnings(warnings);
//! Server::from_state(state).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ErrorResponse, Result, ServerError};
pub use state::{AppState, SharedController};

use std::net::SocketAddr;

use axum::http::HeaderValue;
use axum::{Router, middleware};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The nerloop HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(routes::health_routes())
            .nest("/api/v1", self.api_routes())
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http());

        if let Some(cors) = self.cors_layer() {
            router = router.layer(cors);
        }

        router.with_state(self.state.clone())
    }

    /// API routes (v1).
    fn api_routes(&self) -> Router<AppState> {
        use axum::routing::{get, post};

        Router::new()
            .route(
                "/cycle",
                get(routes::get_cycle_handler)
                    .post(routes::submit_handler)
                    .delete(routes::reset_handler),
            )
            .route("/cycle/judgments", post(routes::judge_handler))
            .route("/cycle/finish", post(routes::finish_handler))
            .route("/preferences", get(routes::preferences_handler))
            .route("/corrections", get(routes::corrections_handler))
            .route("/feedback", get(routes::feedback_handler))
    }

    fn cors_layer(&self) -> Option<CorsLayer> {
        let origins = &self.state.config.cors_origins;
        if origins.is_empty() {
            return None;
        }
        if origins.iter().any(|o| o == "*") {
            return Some(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));
        }

        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        Some(
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address until Ctrl-C.
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {addr}: {e}")))?;
        let local = listener.local_addr().unwrap_or(addr);

        info!(addr = %local, "Server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {e}")))?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
}
