//! `reqwest`-backed story backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use storyloop_core::backend::StoryBackend;
use storyloop_core::error::BackendError;
use storyloop_core::story::{StoryId, StoryStatus};
use tracing::{debug, instrument};

/// Connection settings for [`HttpStoryBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Origin serving the `/api/*` endpoints, e.g. `http://localhost:3000`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpBackendConfig {
    /// Config for `base_url` with the default 30 second timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    user_theme: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    story_id: StoryId,
}

#[derive(Debug, Serialize)]
struct NextSceneRequest<'a> {
    story_id: &'a StoryId,
    user_action: &'a str,
}

/// Story backend speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStoryBackend {
    client: Client,
    base_url: Url,
}

impl HttpStoryBackend {
    /// Build a backend for `config`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Transport` if the base URL is not an absolute
    /// http(s) URL or the HTTP client cannot be built.
    pub fn new(config: &HttpBackendConfig) -> Result<Self, BackendError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| BackendError::Transport(format!("invalid base URL: {e}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(BackendError::Transport(format!(
                "invalid base URL: {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Base URL joined with `/api/<segments>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }
}

fn transport(err: &reqwest::Error) -> BackendError {
    BackendError::Transport(err.to_string())
}

fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(BackendError::Status(status.as_u16()))
    }
}

#[async_trait]
impl StoryBackend for HttpStoryBackend {
    #[instrument(skip(self))]
    async fn initialize(&self, theme: &str) -> Result<StoryId, BackendError> {
        let url = self.endpoint(&["initialize"]);
        debug!(%url, "creating story");

        let response = self
            .client
            .post(url)
            .json(&InitializeRequest { user_theme: theme })
            .send()
            .await
            .map_err(|e| transport(&e))?;

        let body: InitializeResponse = ensure_success(response)?
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        Ok(body.story_id)
    }

    #[instrument(skip(self, story_id), fields(story_id = %story_id))]
    async fn story_status(&self, story_id: &StoryId) -> Result<StoryStatus, BackendError> {
        let url = self.endpoint(&["story_status", story_id.as_str()]);

        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| transport(&e))?;

        ensure_success(response)?
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    #[instrument(skip(self, story_id), fields(story_id = %story_id))]
    async fn next_scene(&self, story_id: &StoryId, action: &str) -> Result<(), BackendError> {
        let url = self.endpoint(&["next_scene"]);

        let response = self
            .client
            .post(url)
            .json(&NextSceneRequest {
                story_id,
                user_action: action,
            })
            .send()
            .await
            .map_err(|e| transport(&e))?;

        ensure_success(response)?;
        Ok(())
    }
}
