//! Test backends — mock `StoryBackend` implementations for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use storyloop_core::backend::StoryBackend;
use storyloop_core::error::BackendError;
use storyloop_core::story::{StoryId, StoryStatus};

/// A call received by a [`ScriptedStoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `initialize` with the given theme.
    Initialize {
        /// Requested theme.
        theme: String,
    },
    /// `story_status` for the given story.
    StoryStatus {
        /// Polled story.
        story_id: StoryId,
    },
    /// `next_scene` for the given story and action.
    NextScene {
        /// Advanced story.
        story_id: StoryId,
        /// Chosen action.
        action: String,
    },
}

/// A backend that replays scripted responses and records every call.
///
/// Status polls pop from the scripted queue; once it is empty every poll
/// reports `processing`. `next_scene` succeeds unless a failure was queued.
#[derive(Debug)]
pub struct ScriptedStoryBackend {
    initialize_result: Result<StoryId, BackendError>,
    statuses: Mutex<VecDeque<Result<StoryStatus, BackendError>>>,
    next_scene_results: Mutex<VecDeque<Result<(), BackendError>>>,
    calls: Mutex<Vec<BackendCall>>,
}

impl ScriptedStoryBackend {
    /// Create a backend whose `initialize` returns `story_id`.
    #[must_use]
    pub fn new(story_id: impl Into<StoryId>) -> Self {
        Self::with_initialize_result(Ok(story_id.into()))
    }

    /// Create a backend whose `initialize` always fails with `error`.
    #[must_use]
    pub fn failing_initialize(error: BackendError) -> Self {
        Self::with_initialize_result(Err(error))
    }

    fn with_initialize_result(initialize_result: Result<StoryId, BackendError>) -> Self {
        Self {
            initialize_result,
            statuses: Mutex::new(VecDeque::new()),
            next_scene_results: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue status poll responses, in order.
    #[must_use]
    pub fn with_statuses(
        self,
        statuses: impl IntoIterator<Item = Result<StoryStatus, BackendError>>,
    ) -> Self {
        self.statuses.lock().unwrap().extend(statuses);
        self
    }

    /// Queue one more status poll response.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push_status(&self, status: Result<StoryStatus, BackendError>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    /// Queue the result of the next `next_scene` call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push_next_scene_result(&self, result: Result<(), BackendError>) {
        self.next_scene_results.lock().unwrap().push_back(result);
    }

    /// Returns a snapshot of all calls received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `initialize` calls received.
    pub fn initialize_count(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::Initialize { .. }))
    }

    /// Number of `story_status` calls received.
    pub fn poll_count(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::StoryStatus { .. }))
    }

    /// Number of `next_scene` calls received.
    pub fn next_scene_count(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::NextScene { .. }))
    }

    fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl StoryBackend for ScriptedStoryBackend {
    async fn initialize(&self, theme: &str) -> Result<StoryId, BackendError> {
        self.record(BackendCall::Initialize {
            theme: theme.to_owned(),
        });
        self.initialize_result.clone()
    }

    async fn story_status(&self, story_id: &StoryId) -> Result<StoryStatus, BackendError> {
        self.record(BackendCall::StoryStatus {
            story_id: story_id.clone(),
        });
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(StoryStatus::Processing))
    }

    async fn next_scene(&self, story_id: &StoryId, action: &str) -> Result<(), BackendError> {
        self.record(BackendCall::NextScene {
            story_id: story_id.clone(),
            action: action.to_owned(),
        });
        self.next_scene_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

/// A backend whose every call fails with a transport error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingStoryBackend;

#[async_trait]
impl StoryBackend for FailingStoryBackend {
    async fn initialize(&self, _theme: &str) -> Result<StoryId, BackendError> {
        Err(BackendError::Transport("connection refused".into()))
    }

    async fn story_status(&self, _story_id: &StoryId) -> Result<StoryStatus, BackendError> {
        Err(BackendError::Transport("connection refused".into()))
    }

    async fn next_scene(&self, _story_id: &StoryId, _action: &str) -> Result<(), BackendError> {
        Err(BackendError::Transport("connection refused".into()))
    }
}
