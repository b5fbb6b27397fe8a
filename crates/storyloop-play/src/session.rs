//! Interactive play loop over a [`StoryProgressCoordinator`].
//!
//! Reads player answers line by line and writes prompts to any
//! [`Write`] sink, so the loop runs the same against a terminal or an
//! in-memory buffer.

use std::io::Write;
use std::path::PathBuf;

use storyloop_coordinator::{StoryProgressCoordinator, StorySnapshot};
use storyloop_core::error::StoryError;
use storyloop_core::story::{SceneResult, StoryStatus};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, info, warn};

use crate::genres::{self, GENRES};

const LOADING_MESSAGE: &str = "Loading your story... What do you think will happen?";
const QUIT_PROMPT: &str = "Are you sure you want to end this story?\nQuit this story? [y/N]";

/// Errors that end a play session.
#[derive(Debug, Error)]
pub enum PlayError {
    /// Reading input or writing output failed.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The story could not be started.
    #[error(transparent)]
    Story(#[from] StoryError),

    /// `--genre` named a genre that is not in the catalog.
    #[error("unknown genre: {0}")]
    UnknownGenre(String),

    /// Input ended before a theme was chosen.
    #[error("no theme chosen")]
    NoTheme,

    /// The coordinator went away while the session was waiting on it.
    #[error("story coordinator closed")]
    Closed,
}

/// How a play session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The player confirmed quitting.
    Quit,
    /// Input ran out.
    EndOfInput,
}

/// A player's answer at a scene or error prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneInput {
    /// 0-based index of the chosen action.
    Choose(usize),
    /// `q`: ask to end the story.
    Quit,
    /// `r`: poll again.
    Retry,
    /// Anything else.
    Invalid,
}

/// Parse one answer. Action numbers are 1-based and checked against
/// `action_count`.
#[must_use]
pub fn parse_scene_input(line: &str, action_count: usize) -> SceneInput {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return SceneInput::Quit;
    }
    if line.eq_ignore_ascii_case("r") {
        return SceneInput::Retry;
    }
    match line.parse::<usize>() {
        Ok(n) if (1..=action_count).contains(&n) => SceneInput::Choose(n - 1),
        _ => SceneInput::Invalid,
    }
}

/// One terminal play session.
pub struct Player<R, W> {
    coordinator: StoryProgressCoordinator,
    input: Lines<R>,
    output: W,
    audio_dir: Option<PathBuf>,
    scenes_shown: usize,
}

impl<R, W> Player<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// Create a player reading answers from `input` and prompting on `output`.
    pub fn new(coordinator: StoryProgressCoordinator, input: R, output: W) -> Self {
        Self {
            coordinator,
            input: input.lines(),
            output,
            audio_dir: None,
            scenes_shown: 0,
        }
    }

    /// Save each scene's narration audio as `scene-N.mp3` under `dir`.
    #[must_use]
    pub fn with_audio_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.audio_dir = dir;
        self
    }

    /// Resolve the story theme from `--theme`, `--genre`, or the genre menu.
    ///
    /// # Errors
    ///
    /// Returns `PlayError::UnknownGenre` for a genre outside the catalog and
    /// `PlayError::NoTheme` if input ends before a valid answer.
    pub async fn choose_theme(
        &mut self,
        theme: Option<String>,
        genre: Option<String>,
    ) -> Result<String, PlayError> {
        if let Some(theme) = theme.filter(|t| !t.trim().is_empty()) {
            return Ok(theme);
        }
        if let Some(genre) = genre {
            return genres::find(&genre)
                .map(str::to_owned)
                .ok_or(PlayError::UnknownGenre(genre));
        }

        writeln!(self.output, "Choose a genre:")?;
        for (i, genre) in GENRES.iter().enumerate() {
            writeln!(self.output, "{:>3}. {genre}", i + 1)?;
        }
        loop {
            writeln!(self.output, "Pick a number or describe your own story:")?;
            self.output.flush()?;
            let Some(line) = self.input.next_line().await? else {
                return Err(PlayError::NoTheme);
            };
            if let Some(theme) = genres::parse_theme_choice(&line) {
                return Ok(theme);
            }
            writeln!(self.output, "Please enter 1-{} or a theme.", GENRES.len())?;
        }
    }

    /// Start the story for `theme` and play until the player quits or input
    /// ends. The coordinator is shut down on every exit path.
    ///
    /// # Errors
    ///
    /// Returns `PlayError::NoTheme` for a blank theme, `PlayError::Story` if
    /// the story cannot be started, and `PlayError::Io` on terminal failures.
    pub async fn play(&mut self, theme: &str) -> Result<Outcome, PlayError> {
        if theme.trim().is_empty() {
            self.coordinator.shutdown();
            return Err(PlayError::NoTheme);
        }
        let result = self.run(theme).await;
        self.coordinator.shutdown();
        result
    }

    async fn run(&mut self, theme: &str) -> Result<Outcome, PlayError> {
        info!(theme, "starting story");
        if let Err(err) = self.coordinator.initialize(theme).await {
            writeln!(self.output, "{}", err.user_message())?;
            return Err(err.into());
        }

        loop {
            let snapshot = self.wait_for_scene().await?;
            let outcome = match &snapshot.status {
                Some(StoryStatus::Completed { result }) => self.on_scene(result).await?,
                _ => self.on_error(&snapshot).await?,
            };
            if let Some(outcome) = outcome {
                return Ok(outcome);
            }
        }
    }

    /// Wait until the session leaves `processing`.
    async fn wait_for_scene(&mut self) -> Result<StorySnapshot, PlayError> {
        if self.coordinator.snapshot().is_processing() {
            writeln!(self.output, "{LOADING_MESSAGE}")?;
            self.output.flush()?;
        }
        let mut updates = self.coordinator.subscribe();
        let snapshot = updates
            .wait_for(|s| s.status.is_some() && !s.is_processing())
            .await
            .map_err(|_| PlayError::Closed)?
            .clone();
        Ok(snapshot)
    }

    /// Show a completed scene and act on the player's choice.
    ///
    /// Returns `Some` when the session is over.
    async fn on_scene(&mut self, scene: &SceneResult) -> Result<Option<Outcome>, PlayError> {
        self.scenes_shown += 1;
        self.save_audio(scene).await;

        writeln!(self.output)?;
        writeln!(self.output, "{}", scene.narration_text)?;
        writeln!(self.output, "Video: {}", scene.video)?;
        for (i, action) in scene.actions.iter().enumerate() {
            writeln!(self.output, "  {}. {action}", i + 1)?;
        }

        loop {
            writeln!(self.output, "What do you do? (number, or q to quit)")?;
            self.output.flush()?;
            let Some(line) = self.input.next_line().await? else {
                return Ok(Some(Outcome::EndOfInput));
            };

            match parse_scene_input(&line, scene.actions.len()) {
                SceneInput::Choose(index) => {
                    let action = &scene.actions[index];
                    debug!(action, "player chose action");
                    match self.coordinator.next_scene(action).await {
                        Ok(()) => return Ok(None),
                        Err(err) => writeln!(self.output, "{}", err.user_message())?,
                    }
                }
                SceneInput::Quit => {
                    if let Some(outcome) = self.confirm_quit().await? {
                        return Ok(Some(outcome));
                    }
                }
                SceneInput::Retry | SceneInput::Invalid => {
                    writeln!(
                        self.output,
                        "Please enter 1-{} or q.",
                        scene.actions.len()
                    )?;
                }
            }
        }
    }

    /// Show the failure and offer a retry.
    async fn on_error(&mut self, snapshot: &StorySnapshot) -> Result<Option<Outcome>, PlayError> {
        let message = snapshot
            .error
            .as_deref()
            .unwrap_or("Something went wrong with your story");
        writeln!(self.output, "{message}")?;

        loop {
            writeln!(self.output, "r to try again, q to quit")?;
            self.output.flush()?;
            let Some(line) = self.input.next_line().await? else {
                return Ok(Some(Outcome::EndOfInput));
            };

            match parse_scene_input(&line, 0) {
                SceneInput::Retry => {
                    self.coordinator.poll_now().await;
                    return Ok(None);
                }
                SceneInput::Quit => {
                    if let Some(outcome) = self.confirm_quit().await? {
                        return Ok(Some(outcome));
                    }
                }
                SceneInput::Choose(_) | SceneInput::Invalid => {}
            }
        }
    }

    async fn confirm_quit(&mut self) -> Result<Option<Outcome>, PlayError> {
        writeln!(self.output, "{QUIT_PROMPT}")?;
        self.output.flush()?;
        let Some(line) = self.input.next_line().await? else {
            return Ok(Some(Outcome::EndOfInput));
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("y") || line.eq_ignore_ascii_case("yes") {
            info!("player ended the story");
            return Ok(Some(Outcome::Quit));
        }
        Ok(None)
    }

    /// Write the scene's narration audio, if an audio directory is set.
    /// Failures are reported and otherwise ignored.
    async fn save_audio(&mut self, scene: &SceneResult) {
        let Some(dir) = &self.audio_dir else {
            return;
        };
        let bytes = match scene.decode_narration_audio() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "narration audio is not valid base64");
                return;
            }
        };
        let path = dir.join(format!("scene-{}.mp3", self.scenes_shown));
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => debug!(path = %path.display(), "saved narration audio"),
            Err(e) => warn!(error = %e, path = %path.display(), "failed to save narration audio"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use storyloop_coordinator::CoordinatorConfig;
    use storyloop_core::error::BackendError;
    use storyloop_test_support::{BackendCall, ScriptedStoryBackend, completed_scene};

    fn coordinator_for(backend: &Arc<ScriptedStoryBackend>) -> StoryProgressCoordinator {
        StoryProgressCoordinator::new(
            backend.clone(),
            CoordinatorConfig {
                poll_interval: Duration::from_secs(5),
            },
        )
    }

    async fn play_with(
        backend: &Arc<ScriptedStoryBackend>,
        input: &str,
    ) -> (Result<Outcome, PlayError>, String) {
        let mut output = Vec::new();
        let result = Player::new(coordinator_for(backend), input.as_bytes(), &mut output)
            .play("Noir")
            .await;
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_parse_scene_input() {
        assert_eq!(parse_scene_input(" 2 ", 2), SceneInput::Choose(1));
        assert_eq!(parse_scene_input("3", 2), SceneInput::Invalid);
        assert_eq!(parse_scene_input("0", 2), SceneInput::Invalid);
        assert_eq!(parse_scene_input("Q", 2), SceneInput::Quit);
        assert_eq!(parse_scene_input("r", 0), SceneInput::Retry);
        assert_eq!(parse_scene_input("flee", 2), SceneInput::Invalid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_a_scene_then_quits_after_confirmation() {
        // Arrange
        let backend = Arc::new(ScriptedStoryBackend::new("abc123").with_statuses(
            [Ok(StoryStatus::Processing), Ok(completed_scene())],
        ));

        // Act
        let (result, output) = play_with(&backend, "q\ny\n").await;

        // Assert
        assert_eq!(result.unwrap(), Outcome::Quit);
        assert!(output.contains(LOADING_MESSAGE));
        assert!(output.contains("A door stands before you."));
        assert!(output.contains("Video: v.mp4"));
        assert!(output.contains("  1. Open the door\n  2. Flee"));
        assert!(output.contains("Quit this story? [y/N]"));
        assert_eq!(backend.poll_count(), 2);
        assert_eq!(backend.next_scene_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chosen_action_advances_the_story() {
        // Arrange
        let backend = Arc::new(ScriptedStoryBackend::new("abc123").with_statuses(
            [Ok(completed_scene()), Ok(completed_scene())],
        ));

        // Act: an invalid answer, a declined quit, then action 2.
        let (result, output) = play_with(&backend, "7\nq\nn\n2\n").await;

        // Assert
        assert_eq!(result.unwrap(), Outcome::EndOfInput);
        assert!(output.contains("Please enter 1-2 or q."));
        assert!(backend.calls().contains(&BackendCall::NextScene {
            story_id: "abc123".into(),
            action: "Flee".to_owned(),
        }));
        assert_eq!(backend.poll_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_action_lets_the_player_choose_again() {
        // Arrange
        let backend = Arc::new(ScriptedStoryBackend::new("abc123").with_statuses(
            [Ok(completed_scene())],
        ));
        backend.push_next_scene_result(Err(BackendError::Status(500)));

        // Act
        let (result, output) = play_with(&backend, "1\n").await;

        // Assert
        assert_eq!(result.unwrap(), Outcome::EndOfInput);
        assert!(output.contains("Failed to progress to next scene"));
        assert_eq!(backend.next_scene_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_failed_poll() {
        // Arrange
        let backend = Arc::new(ScriptedStoryBackend::new("abc123").with_statuses(
            [
                Err(BackendError::Transport("connection reset".into())),
                Ok(completed_scene()),
            ],
        ));

        // Act
        let (result, output) = play_with(&backend, "x\nr\nq\ny\n").await;

        // Assert
        assert_eq!(result.unwrap(), Outcome::Quit);
        assert!(output.contains("Failed to fetch story status"));
        assert!(output.contains("r to try again, q to quit"));
        assert!(output.contains("A door stands before you."));
        assert_eq!(backend.poll_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_theme_is_rejected_without_starting_a_story() {
        // Arrange
        let backend = Arc::new(ScriptedStoryBackend::new("abc123"));
        let mut output = Vec::new();
        let mut player = Player::new(coordinator_for(&backend), "".as_bytes(), &mut output);

        // Act
        let result = tokio::time::timeout(Duration::from_secs(3600), player.play("   ")).await;

        // Assert
        assert!(matches!(result, Ok(Err(PlayError::NoTheme))));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_failure_is_reported() {
        // Arrange
        let backend = Arc::new(ScriptedStoryBackend::failing_initialize(
            BackendError::Status(503),
        ));

        // Act
        let (result, output) = play_with(&backend, "").await;

        // Assert
        assert!(matches!(
            result,
            Err(PlayError::Story(StoryError::InitializationFailed(_)))
        ));
        assert!(output.contains("Failed to initialize story"));
        assert_eq!(backend.poll_count(), 0);
    }

    #[tokio::test]
    async fn test_choose_theme_from_menu() {
        // Arrange
        let backend = Arc::new(ScriptedStoryBackend::new("abc123"));
        let mut output = Vec::new();
        let mut player = Player::new(coordinator_for(&backend), "99\n15\n".as_bytes(), &mut output);

        // Act
        let theme = player.choose_theme(None, None).await.unwrap();

        // Assert
        assert_eq!(theme, "Space Opera");
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains(" 22. Military Sci-Fi"));
        assert!(output.contains("Please enter 1-22 or a theme."));
    }

    #[tokio::test]
    async fn test_choose_theme_prefers_flags() {
        // Arrange
        let backend = Arc::new(ScriptedStoryBackend::new("abc123"));
        let mut output = Vec::new();
        let mut player = Player::new(coordinator_for(&backend), "".as_bytes(), &mut output);

        // Act
        let by_theme = player
            .choose_theme(Some("A haunted lighthouse".into()), Some("Noir".into()))
            .await
            .unwrap();
        let by_genre = player.choose_theme(None, Some("noir".into())).await.unwrap();
        let unknown = player.choose_theme(None, Some("Opera".into())).await;
        let no_input = player.choose_theme(None, None).await;

        // Assert
        assert_eq!(by_theme, "A haunted lighthouse");
        assert_eq!(by_genre, "Noir");
        assert!(matches!(unknown, Err(PlayError::UnknownGenre(g)) if g == "Opera"));
        assert!(matches!(no_input, Err(PlayError::NoTheme)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_saves_narration_audio_per_scene() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("storyloop-play-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let backend = Arc::new(ScriptedStoryBackend::new("abc123").with_statuses(
            [Ok(completed_scene())],
        ));
        let mut output = Vec::new();

        // Act
        let result = Player::new(coordinator_for(&backend), "".as_bytes(), &mut output)
            .with_audio_dir(Some(dir.clone()))
            .play("Noir")
            .await;

        // Assert
        assert_eq!(result.unwrap(), Outcome::EndOfInput);
        assert_eq!(tokio::fs::read(dir.join("scene-1.mp3")).await.unwrap(), b"A");
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
