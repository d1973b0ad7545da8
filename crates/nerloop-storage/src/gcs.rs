//! Google Cloud Storage backend using the JSON API.
//!
//! Objects are fetched with `alt=media` downloads and written with simple
//! (`uploadType=media`) uploads. Authentication is a bearer token supplied
//! by the caller; token acquisition belongs to the deployment, not here.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::debug;

use crate::{BlobStore, Result, StorageError, validate_key};

/// Default GCS API base URL.
pub const DEFAULT_GCS_BASE_URL: &str = "https://storage.googleapis.com";

/// Default timeout for requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Blob store backed by a GCS bucket.
///
/// Uses a blocking HTTP client; construct and call it off the async
/// runtime's worker threads.
#[derive(Debug, Clone)]
pub struct GcsBlobStore {
    client: Client,
    base_url: String,
    bucket: String,
    token: Option<String>,
}

impl GcsBlobStore {
    /// Create a store for `bucket`, authenticating with `token` if given.
    pub fn new(bucket: impl Into<String>, token: Option<String>) -> Result<Self> {
        Self::with_timeout(bucket, token, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a store with an explicit request timeout.
    pub fn with_timeout(
        bucket: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_GCS_BASE_URL.to_string(),
            bucket: bucket.into(),
            token,
        })
    }

    /// Point the store at a different API host (emulators, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn download_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}?alt=media",
            self.base_url,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(key)
        )
    }

    fn upload_url(&self, key: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(key)
        )
    }

    fn authorize(&self, request: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl BlobStore for GcsBlobStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        let response = self.authorize(self.client.get(self.download_url(key))).send()?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(key.to_string())),
            status if status.is_success() => {
                let bytes = response.bytes()?;
                debug!(bucket = %self.bucket, key, bytes = bytes.len(), "Downloaded blob");
                Ok(bytes.to_vec())
            }
            status => Err(StorageError::Status {
                key: key.to_string(),
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            }),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        let response = self
            .authorize(self.client.post(self.upload_url(key)))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()?;

        let status = response.status();
        if status.is_success() {
            debug!(bucket = %self.bucket, key, bytes = bytes.len(), "Uploaded blob");
            Ok(())
        } else {
            Err(StorageError::Status {
                key: key.to_string(),
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            })
        }
    }

    fn backend_name(&self) -> &'static str {
        "gcs"
    }
}
