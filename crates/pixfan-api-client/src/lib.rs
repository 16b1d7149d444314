//! HTTP client for the pixfan API.
//!
//! Provides a minimal client for the grant and status endpoints, generic
//! GET/POST helpers, and the [`Poller`] that waits for derivation to finish.
//! The client implements [`StatusSource`], so the poller can run against it
//! or against an in-process resolver.

pub mod api;
pub mod poller;

pub use poller::{Poller, DEFAULT_REQUEST_TIMEOUT};

use anyhow::{Context, Result};
use async_trait::async_trait;
use pixfan_core::{PipelineError, StatusReport, StatusSource};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the pixfan API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(60))
    }

    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create client from environment: PIXFAN_API_URL (or API_URL).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("PIXFAN_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// GET request. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PipelineError> {
        let url = self.build_url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport("Failed to send request", e))?;

        read_json(response).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PipelineError> {
        let url = self.build_url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport("Failed to send request", e))?;

        read_json(response).await
    }
}

pub(crate) fn transport(context: &str, err: reqwest::Error) -> PipelineError {
    PipelineError::Transport(format!("{}: {}", context, err))
}

/// Map a non-success status to an error. Client errors are the caller's
/// fault and not worth retrying; everything else is a transport failure.
pub(crate) fn status_error(status: StatusCode, body: &str) -> PipelineError {
    let message = format!("API request failed with status {}: {}", status, body);
    let retryable = status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS;
    if status.is_client_error() && !retryable {
        PipelineError::InvalidRequest(message)
    } else {
        PipelineError::Transport(message)
    }
}

pub(crate) async fn ensure_success(response: Response) -> Result<Response, PipelineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(status_error(status, &error_text))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, PipelineError> {
    let response = ensure_success(response).await?;
    response
        .json()
        .await
        .map_err(|e| transport("Failed to parse response as JSON", e))
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn status(&self, original_key: &str) -> Result<StatusReport, PipelineError> {
        self.get_status(original_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("https://api.example.com/dev/".to_string()).unwrap();
        assert_eq!(client.base_url(), "https://api.example.com/dev");
        assert_eq!(
            client.build_url("/presign/upload"),
            "https://api.example.com/dev/presign/upload"
        );
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "filename is required"),
            PipelineError::InvalidRequest(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            PipelineError::Transport(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, ""),
            PipelineError::Transport(_)
        ));
    }
}
