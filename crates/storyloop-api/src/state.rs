//! Shared application state.

use crate::upstream::UpstreamClient;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Client for the upstream story service.
    pub upstream: UpstreamClient,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }
}
