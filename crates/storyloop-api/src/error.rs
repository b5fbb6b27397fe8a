//! Storyloop API — error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::upstream::UpstreamError;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Tracing or span export could not be set up.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: &'static str,
}

/// The proxied operation, used to pick the client-facing failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyOperation {
    /// `POST /api/initialize`
    Initialize,
    /// `GET /api/story_status/{story_id}`
    StoryStatus,
    /// `POST /api/next_scene`
    NextScene,
}

impl ProxyOperation {
    /// Message returned to the client when this operation fails.
    #[must_use]
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Initialize => "Failed to initialize story",
            Self::StoryStatus => "Failed to fetch story status",
            Self::NextScene => "Failed to progress to next scene",
        }
    }
}

/// HTTP-layer wrapper around `UpstreamError` that implements `IntoResponse`.
///
/// Every upstream failure becomes a 500 with a generic body; the cause is
/// only logged.
#[derive(Debug)]
pub struct ApiError {
    /// The failed operation.
    pub operation: ProxyOperation,
    /// What went wrong upstream.
    pub source: UpstreamError,
}

impl ApiError {
    /// Wrap `source` as a failure of `operation`.
    #[must_use]
    pub fn new(operation: ProxyOperation, source: UpstreamError) -> Self {
        Self { operation, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(
            operation = ?self.operation,
            error = %self.source,
            "upstream request failed"
        );

        let body = ErrorBody {
            error: self.operation.failure_message(),
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
