//! Story backend abstraction.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::story::{StoryId, StoryStatus};

/// Port to the job-style story service.
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait]
pub trait StoryBackend: Send + Sync {
    /// Create a new story session seeded by `theme`.
    async fn initialize(&self, theme: &str) -> Result<StoryId, BackendError>;

    /// Fetch the current status of a story session.
    async fn story_status(&self, story_id: &StoryId) -> Result<StoryStatus, BackendError>;

    /// Ask the service to generate the scene that follows `action`.
    ///
    /// Success only means the service accepted the request; the new scene is
    /// observed through subsequent `story_status` calls.
    async fn next_scene(&self, story_id: &StoryId, action: &str) -> Result<(), BackendError>;
}
