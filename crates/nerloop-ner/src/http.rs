//! Remote NER engine: POSTs text to an inference service.
//!
//! Request body:
//! ```json
//! {"text": "Buy a Galaxy phone", "labels": ["BRAND", "PRODUCT"]}
//! ```
//! Expected response:
//! ```json
//! {"entities": [{"text": "Galaxy", "label": "PRODUCT", "score": 0.97}]}
//! ```

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{NerEngine, NerError, NerSpan, Result};

/// Default timeout for inference requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct InferRequest<'a> {
    text: &'a str,
    labels: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct InferResponse {
    #[serde(default)]
    entities: Vec<NerSpan>,
}

/// NER engine backed by an HTTP inference endpoint.
///
/// Uses a blocking client; construct and call it off the async runtime's
/// worker threads.
#[derive(Debug, Clone)]
pub struct HttpNerEngine {
    client: Client,
    endpoint: String,
}

impl HttpNerEngine {
    /// Create an engine for `endpoint` with the default timeout.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create an engine with an explicit request timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(NerError::Config("NER endpoint is empty".to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl NerEngine for HttpNerEngine {
    fn extract(&self, text: &str, labels: &[&str]) -> Result<Vec<NerSpan>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&InferRequest { text, labels })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NerError::Inference(format!(
                "endpoint returned {status}: {body}"
            )));
        }

        let parsed: InferResponse = response
            .json()
            .map_err(|e| NerError::Inference(format!("invalid response body: {e}")))?;

        debug!(
            endpoint = %self.endpoint,
            entities = parsed.entities.len(),
            "Remote NER inference complete"
        );
        Ok(parsed.entities)
    }

    fn name(&self) -> &str {
        "http"
    }
}
