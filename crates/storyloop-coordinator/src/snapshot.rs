//! Observable coordinator state.

use storyloop_core::story::{SceneResult, StatusTag, StoryId, StoryStatus};

/// Point-in-time view of a story session as seen by the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorySnapshot {
    /// The session id, once initialization succeeded.
    pub story_id: Option<StoryId>,
    /// The last status reported by the service; `None` before a session exists.
    pub status: Option<StoryStatus>,
    /// User-facing message of the most recent failure.
    pub error: Option<String>,
}

impl StorySnapshot {
    /// Tag of the current status, if any.
    #[must_use]
    pub fn status_tag(&self) -> Option<StatusTag> {
        self.status.as_ref().map(StoryStatus::tag)
    }

    /// Whether the service is generating a scene.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.status_tag() == Some(StatusTag::Processing)
    }

    /// The completed scene, if the session is waiting for an action.
    #[must_use]
    pub fn scene(&self) -> Option<&SceneResult> {
        self.status.as_ref().and_then(StoryStatus::result)
    }

    /// Actions available to the player; empty unless a scene is completed.
    #[must_use]
    pub fn actions(&self) -> &[String] {
        self.scene()
            .map(|scene| scene.actions.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyloop_test_support::completed_scene;

    #[test]
    fn test_default_snapshot_has_no_session() {
        let snapshot = StorySnapshot::default();

        assert!(snapshot.story_id.is_none());
        assert!(snapshot.status_tag().is_none());
        assert!(!snapshot.is_processing());
        assert!(snapshot.actions().is_empty());
    }

    #[test]
    fn test_completed_snapshot_exposes_actions() {
        let snapshot = StorySnapshot {
            story_id: Some(StoryId::from("abc123")),
            status: Some(completed_scene()),
            error: None,
        };

        assert_eq!(snapshot.actions(), ["Open the door", "Flee"]);
        assert_eq!(snapshot.scene().unwrap().video, "v.mp4");
    }

    #[test]
    fn test_processing_snapshot_has_no_actions() {
        let snapshot = StorySnapshot {
            story_id: Some(StoryId::from("abc123")),
            status: Some(StoryStatus::Processing),
            error: None,
        };

        assert!(snapshot.is_processing());
        assert!(snapshot.actions().is_empty());
    }
}
