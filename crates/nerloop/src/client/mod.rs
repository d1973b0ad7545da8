//! HTTP client for communicating with the nerloop server.

use anyhow::{Result, bail};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use nerloop_feedback::{CycleSummary, CycleView};
use nerloop_server::ErrorResponse;
use nerloop_server::routes::{
    CorrectionsResponse, FinishRequest, HealthResponse, JudgeRequest, JudgmentResponse,
    PreferencesResponse, ResetResponse, SubmitRequest,
};

/// Client for the nerloop REST API.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET /health
    pub async fn health(&self) -> Result<HealthResponse> {
        let resp = self.http.get(self.url("/health")).send().await?;
        decode(resp).await
    }

    /// GET /api/v1/cycle
    pub async fn cycle(&self) -> Result<CycleView> {
        let resp = self.http.get(self.url("/api/v1/cycle")).send().await?;
        decode(resp).await
    }

    /// POST /api/v1/cycle
    pub async fn submit(&self, text: &str) -> Result<CycleView> {
        let resp = self
            .http
            .post(self.url("/api/v1/cycle"))
            .json(&SubmitRequest {
                text: text.to_string(),
            })
            .send()
            .await?;
        decode(resp).await
    }

    /// POST /api/v1/cycle/judgments
    pub async fn judge(&self, request: &JudgeRequest) -> Result<JudgmentResponse> {
        let resp = self
            .http
            .post(self.url("/api/v1/cycle/judgments"))
            .json(request)
            .send()
            .await?;
        decode(resp).await
    }

    /// POST /api/v1/cycle/finish
    pub async fn finish(&self, request: &FinishRequest) -> Result<CycleSummary> {
        let resp = self
            .http
            .post(self.url("/api/v1/cycle/finish"))
            .json(request)
            .send()
            .await?;
        decode(resp).await
    }

    /// DELETE /api/v1/cycle
    pub async fn reset(&self) -> Result<ResetResponse> {
        let resp = self.http.delete(self.url("/api/v1/cycle")).send().await?;
        decode(resp).await
    }

    /// GET /api/v1/preferences
    pub async fn preferences(&self) -> Result<PreferencesResponse> {
        let resp = self.http.get(self.url("/api/v1/preferences")).send().await?;
        decode(resp).await
    }

    /// GET /api/v1/corrections?text=
    ///
    /// Returns `None` when nothing is stored for the text.
    pub async fn corrections(&self, text: &str) -> Result<Option<CorrectionsResponse>> {
        let resp = self
            .http
            .get(self.url("/api/v1/corrections"))
            .query(&[("text", text)])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(resp).await.map(Some)
    }
}

/// Decode a JSON body, turning error responses into errors.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => bail!("{} ({}): {}", status.as_u16(), err.code, err.message),
        Err(_) => bail!("{}: {}", status.as_u16(), body),
    }
}
