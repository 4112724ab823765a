//! Outbound client for the external analysis service.
//!
//! One POST of JSON with bearer auth. Transport failures (including the
//! request timeout) are reported distinctly from application responses so
//! the job lifecycle can log which occurred; both count as "not
//! acknowledged".

use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisClientError {
    #[error("Transport failure calling analysis service: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for AnalysisClientError {
    fn from(err: reqwest::Error) -> Self {
        AnalysisClientError::Transport(err.to_string())
    }
}

#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Submit a payload. `Ok` carries the HTTP status code of whatever
    /// response the service produced; `Err` a network-level failure.
    async fn submit(
        &self,
        payload: &serde_json::Value,
        bearer: &str,
    ) -> Result<u16, AnalysisClientError>;
}

pub struct HttpAnalysisClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalysisClient {
    /// Build a client with a bounded per-request timeout; no response within
    /// the window is a transport failure, never a hang.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, anyhow::Error> {
        let base_url: String = base_url.into();
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn submit(
        &self,
        payload: &serde_json::Value,
        bearer: &str,
    ) -> Result<u16, AnalysisClientError> {
        let url = format!("{}/process", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(bearer)
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        tracing::debug!(url = %url, status = status, "Analysis submission response received");

        Ok(status)
    }
}
