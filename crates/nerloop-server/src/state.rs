//! Application state shared across handlers.

use std::sync::Arc;

use nerloop_feedback::{LoadWarning, SessionController};
use parking_lot::Mutex;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// The single review session, shared by every request.
pub type SharedController = Arc<Mutex<SessionController>>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The session controller.
    pub controller: SharedController,

    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Warnings raised while loading persisted documents at startup.
    pub load_warnings: Arc<Vec<LoadWarning>>,

    /// NER engine name, for health reporting.
    pub engine: Arc<str>,

    /// Storage backend name, for health reporting.
    pub storage: Arc<str>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(controller: SessionController, config: ServerConfig) -> Self {
        let engine: Arc<str> = Arc::from(controller.engine_name());
        let storage: Arc<str> = Arc::from(controller.context().documents().backend_name());
        Self {
            controller: Arc::new(Mutex::new(controller)),
            config: Arc::new(config),
            load_warnings: Arc::new(Vec::new()),
            engine,
            storage,
        }
    }

    /// Attach startup load warnings.
    pub fn with_load_warnings(mut self, warnings: Vec<LoadWarning>) -> Self {
        self.load_warnings = Arc::new(warnings);
        self
    }

    /// Run `f` against the controller on the blocking pool.
    ///
    /// Inference and blob I/O block, so controller access never runs on
    /// an async worker.
    pub async fn with_controller<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SessionController) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let controller = self.controller.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = controller.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| ServerError::Internal(format!("Controller task failed: {e}")))?
    }
}
