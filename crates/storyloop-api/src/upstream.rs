//! Client for the upstream story service.

use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde_json::Value;
use thiserror::Error;

use crate::error::AppError;

/// Failure of a single upstream call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No HTTP response was received.
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, for logs.
        body: String,
    },

    /// The upstream body was not JSON.
    #[error("upstream returned invalid JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

/// JSON pass-through client for the upstream story service.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: Url,
}

impl UpstreamClient {
    /// Build a client for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `base_url` is not an absolute http(s)
    /// URL or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("UPSTREAM_URL is not a valid URL: {e}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "UPSTREAM_URL must be an http(s) URL, got {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// The upstream base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL joined with `segments`, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// POST `body` unmodified and return the upstream JSON body.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` on transport failure, a non-2xx status, or a
    /// non-JSON body.
    pub async fn post_json(&self, segments: &[&str], body: &Value) -> Result<Value, UpstreamError> {
        let response = self.client.post(self.url(segments)).json(body).send().await?;
        read_json(response).await
    }

    /// GET and return the upstream JSON body.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` on transport failure, a non-2xx status, or a
    /// non-JSON body.
    pub async fn get_json(&self, segments: &[&str]) -> Result<Value, UpstreamError> {
        let response = self.client.get(self.url(segments)).send().await?;
        read_json(response).await
    }
}

async fn read_json(response: Response) -> Result<Value, UpstreamError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }
    serde_json::from_slice(&bytes).map_err(UpstreamError::Decode)
}
