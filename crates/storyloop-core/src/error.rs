//! Error types.

use thiserror::Error;

use crate::story::StoryId;

/// Failure of a single call to the story backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The request never produced an HTTP response (connection, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success HTTP status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

/// A story progress step that failed.
///
/// Transport and status failures of the same step are deliberately reported
/// with the same user-facing message; see [`StoryError::user_message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoryError {
    /// Creating the story session failed.
    #[error("failed to initialize story: {0}")]
    InitializationFailed(#[source] BackendError),

    /// Fetching the story status failed.
    #[error("failed to fetch story status: {0}")]
    PollFailed(#[source] BackendError),

    /// Requesting the next scene failed.
    #[error("failed to progress to next scene: {0}")]
    ActionFailed(#[source] BackendError),

    /// The backend reported that generation of the current scene failed.
    #[error("story generation failed for {0}")]
    GenerationFailed(StoryId),
}

impl StoryError {
    /// The human-readable message shown to the player.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InitializationFailed(_) => "Failed to initialize story",
            Self::PollFailed(_) => "Failed to fetch story status",
            Self::ActionFailed(_) => "Failed to progress to next scene",
            Self::GenerationFailed(_) => "Story generation failed",
        }
    }
}
