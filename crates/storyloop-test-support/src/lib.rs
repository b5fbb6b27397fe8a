//! Shared test doubles and utilities for storyloop.

mod backend;
mod fake_service;

pub use backend::{BackendCall, FailingStoryBackend, ScriptedStoryBackend};
pub use fake_service::{FakeStoryService, RecordedRequest, spawn_server};

use storyloop_core::story::{SceneResult, StoryStatus};

/// A completed scene with two actions, matching the happy-path scenario.
#[must_use]
pub fn completed_scene() -> StoryStatus {
    StoryStatus::Completed {
        result: SceneResult {
            video: "v.mp4".to_owned(),
            narration_audio: "QQ==".to_owned(),
            narration_text: "A door stands before you.".to_owned(),
            actions: vec!["Open the door".to_owned(), "Flee".to_owned()],
        },
    }
}
