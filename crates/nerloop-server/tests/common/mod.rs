//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use nerloop_config::LearningConfig;
use nerloop_feedback::{
    DocumentKeys, DocumentStore, FeedbackContext, InferenceSettings, SessionController,
};
use nerloop_ner::GazetteerEngine;
use nerloop_server::{AppState, Server, ServerConfig};
use nerloop_storage::FsBlobStore;

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client configured for this server.
    pub client: Client,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
    /// Directory backing the filesystem blob store.
    pub data_dir: Arc<TempDir>,
}

impl TestServer {
    /// Start a new test server over a fresh data directory.
    pub async fn start() -> Result<Self> {
        Self::start_in(Arc::new(TempDir::new()?), LearningConfig::default()).await
    }

    /// Start a server over an existing data directory.
    pub async fn start_in(data_dir: Arc<TempDir>, learning: LearningConfig) -> Result<Self> {
        let addr = find_available_port().await?;

        let store = FsBlobStore::open(data_dir.path())?;
        let documents = DocumentStore::new(Arc::new(store), DocumentKeys::default());
        let learning = LearningConfig {
            seed: Some(17),
            ..learning
        };
        let (context, warnings) = FeedbackContext::load(documents, &learning)?;
        let controller =
            SessionController::new(context, Arc::new(gazetteer()), InferenceSettings::default());

        let config = ServerConfig::new()
            .with_bind_address(addr)
            .with_request_logging(false);
        let state = AppState::new(controller, config).with_load_warnings(warnings);

        let server = Server::from_state(state);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            _handle: handle,
            data_dir,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.delete(format!("{}{}", self.base_url(), path))
    }

    /// Read a persisted document from the data directory.
    pub fn read_document(&self, key: &str) -> Result<serde_json::Value> {
        read_json(&self.data_dir.path().join(key))
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    Ok(serde_json::from_slice(&std::fs::read(path)?)?)
}

fn gazetteer() -> GazetteerEngine {
    let mut entries = BTreeMap::new();
    entries.insert(
        "PRODUCT".to_string(),
        vec!["Galaxy".to_string(), "Pixel".to_string()],
    );
    entries.insert(
        "BRAND".to_string(),
        vec!["Samsung".to_string(), "Google".to_string()],
    );
    GazetteerEngine::new(&entries).expect("valid gazetteer")
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
