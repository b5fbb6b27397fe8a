//! The story progress coordinator.
//!
//! One coordinator owns one story session. It issues the initialize request at
//! most once, polls the service on a fixed interval while the session is
//! `processing`, and advances the story when the player picks an action. The
//! service is authoritative for status; the coordinator only stores what it
//! is told and decides when to ask again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use storyloop_core::backend::StoryBackend;
use storyloop_core::error::StoryError;
use storyloop_core::story::{StatusTag, StoryId, StoryStatus};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::snapshot::StorySnapshot;

/// Default delay between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Coordinator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Delay between two status polls. The first poll happens one interval
    /// after polling starts.
    pub poll_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Drives a single story session against a [`StoryBackend`].
///
/// Cloning yields another handle to the same session. When the last handle is
/// dropped the polling timer is aborted.
#[derive(Clone)]
pub struct StoryProgressCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn StoryBackend>,
    config: CoordinatorConfig,
    state: watch::Sender<StorySnapshot>,
    /// One-shot latch; set before the initialize request is issued.
    initialized: AtomicBool,
    closed: AtomicBool,
    /// The single polling timer.
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl StoryProgressCoordinator {
    /// Create a coordinator with no session.
    #[must_use]
    pub fn new(backend: Arc<dyn StoryBackend>, config: CoordinatorConfig) -> Self {
        let (state, _) = watch::channel(StorySnapshot::default());
        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                state,
                initialized: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                poll_task: Mutex::new(None),
            }),
        }
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> StorySnapshot {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StorySnapshot> {
        self.inner.state.subscribe()
    }

    /// Whether the initialize request has already been issued.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    /// Create the story session for `theme` and start polling.
    ///
    /// Runs at most once per coordinator: later calls return `Ok(())` without
    /// sending anything, whatever theme they carry. A blank theme is treated
    /// as "no theme yet" and does not consume the one-shot. Does nothing once
    /// the coordinator is shut down.
    ///
    /// # Errors
    ///
    /// Returns `StoryError::InitializationFailed` if the backend call fails.
    /// The same failure is recorded in the snapshot and no session id is set.
    #[instrument(skip(self))]
    pub async fn initialize(&self, theme: &str) -> Result<(), StoryError> {
        if theme.trim().is_empty() {
            debug!("blank theme; waiting for a real one");
            return Ok(());
        }
        if self.inner.is_closed() {
            debug!("coordinator closed; not initializing");
            return Ok(());
        }
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            debug!("story already initialized; ignoring");
            return Ok(());
        }

        match self.inner.backend.initialize(theme).await {
            Ok(story_id) => {
                if self.inner.is_closed() {
                    debug!(%story_id, "coordinator closed; discarding new session");
                    return Ok(());
                }
                info!(%story_id, "story session created");
                self.inner.state.send_modify(|snapshot| {
                    snapshot.story_id = Some(story_id);
                    snapshot.status = Some(StoryStatus::Processing);
                    snapshot.error = None;
                });
                self.start_polling();
                Ok(())
            }
            Err(source) => {
                let err = StoryError::InitializationFailed(source);
                self.inner.record_error(&err);
                Err(err)
            }
        }
    }

    /// Ask the service for the scene that follows `action`, then resume
    /// polling.
    ///
    /// Does nothing if no session exists yet. The session id is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StoryError::ActionFailed` if the backend call fails. The
    /// failure is recorded in the snapshot and the status is left as it was,
    /// so the player can choose again.
    #[instrument(skip(self))]
    pub async fn next_scene(&self, action: &str) -> Result<(), StoryError> {
        let Some(story_id) = self.inner.current_story_id() else {
            debug!("no story session; ignoring action");
            return Ok(());
        };

        match self.inner.backend.next_scene(&story_id, action).await {
            Ok(()) => {
                if !self.inner.is_current(&story_id) {
                    debug!(%story_id, "session replaced; discarding next scene response");
                    return Ok(());
                }
                info!(%story_id, "next scene requested");
                self.inner.state.send_modify(|snapshot| {
                    snapshot.status = Some(StoryStatus::Processing);
                    snapshot.error = None;
                });
                self.start_polling();
                Ok(())
            }
            Err(source) => {
                let err = StoryError::ActionFailed(source);
                if self.inner.is_current(&story_id) {
                    self.inner.record_error(&err);
                }
                Err(err)
            }
        }
    }

    /// Poll once right away, restarting the timer if the session is still
    /// `processing`. This is how a player retries after a failed poll.
    ///
    /// Returns the reported status tag, or `None` when there is no session or
    /// the response was discarded as stale.
    #[instrument(skip(self))]
    pub async fn poll_now(&self) -> Option<StatusTag> {
        let story_id = self.inner.current_story_id()?;
        self.stop_polling();

        let tag = self.inner.poll_once(&story_id).await;
        if tag == Some(StatusTag::Processing) {
            self.start_polling();
        }
        tag
    }

    /// Start the polling timer if the session is `processing`.
    ///
    /// Any running timer is aborted first, so at most one exists.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start_polling(&self) {
        let mut slot = self
            .inner
            .poll_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        if self.inner.is_closed() {
            return;
        }

        let story_id = {
            let snapshot = self.inner.state.borrow();
            match (&snapshot.story_id, &snapshot.status) {
                (Some(story_id), Some(StoryStatus::Processing)) => story_id.clone(),
                _ => return,
            }
        };

        debug!(%story_id, interval = ?self.inner.config.poll_interval, "starting poll timer");
        *slot = Some(tokio::spawn(run_polling(
            Arc::downgrade(&self.inner),
            story_id,
            self.inner.config.poll_interval,
        )));
    }

    /// Abort the polling timer, if any.
    pub fn stop_polling(&self) {
        let task = self
            .inner
            .poll_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }

    /// Tear the coordinator down: stop polling and ignore any response that
    /// is still in flight.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.stop_polling();
        info!("story coordinator shut down");
    }
}

impl Inner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn current_story_id(&self) -> Option<StoryId> {
        if self.is_closed() {
            return None;
        }
        self.state.borrow().story_id.clone()
    }

    /// Whether a response issued for `story_id` may still be applied.
    fn is_current(&self, story_id: &StoryId) -> bool {
        !self.is_closed() && self.state.borrow().story_id.as_ref() == Some(story_id)
    }

    fn record_error(&self, err: &StoryError) {
        if self.is_closed() {
            return;
        }
        warn!(error = %err, "story step failed");
        let message = err.user_message().to_owned();
        self.state.send_modify(|snapshot| snapshot.error = Some(message));
    }

    /// Fetch and store the status of `story_id`.
    ///
    /// Returns `None` when the response is stale and was discarded.
    async fn poll_once(&self, story_id: &StoryId) -> Option<StatusTag> {
        let result = self.backend.story_status(story_id).await;
        if !self.is_current(story_id) {
            debug!(%story_id, "discarding stale status response");
            return None;
        }

        match result {
            Ok(status) => {
                let tag = status.tag();
                debug!(%story_id, status = %tag, "polled story status");
                let error = (tag == StatusTag::Error).then(|| {
                    let err = StoryError::GenerationFailed(story_id.clone());
                    warn!(error = %err, "story service reported an error");
                    err.user_message().to_owned()
                });
                self.state.send_modify(|snapshot| {
                    snapshot.status = Some(status);
                    snapshot.error = error;
                });
                Some(tag)
            }
            Err(source) => {
                let err = StoryError::PollFailed(source);
                warn!(error = %err, "story step failed");
                let message = err.user_message().to_owned();
                self.state.send_modify(|snapshot| {
                    snapshot.status = Some(StoryStatus::Error);
                    snapshot.error = Some(message);
                });
                Some(StatusTag::Error)
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let task = self
            .poll_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

/// Poll `story_id` every `period` until the service reports a terminal status
/// or the coordinator goes away.
async fn run_polling(inner: Weak<Inner>, story_id: StoryId, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        match inner.poll_once(&story_id).await {
            Some(tag) if tag.is_terminal() => {
                debug!(%story_id, status = %tag, "polling finished");
                break;
            }
            Some(_) => {}
            None => break,
        }
    }
}
