//! Storyloop terminal player.
//!
//! Starts a story against a storyloop proxy, shows each scene, and sends the
//! player's chosen action back until they quit.

mod genres;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use storyloop_coordinator::{CoordinatorConfig, StoryProgressCoordinator};
use storyloop_http::{HttpBackendConfig, HttpStoryBackend};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use crate::session::{PlayError, Player};

/// Play an interactive story in the terminal.
#[derive(Debug, Parser)]
#[command(name = "storyloop-play", version, about)]
struct Cli {
    /// Base URL of the storyloop proxy.
    #[arg(long, env = "STORYLOOP_BASE_URL", default_value = "http://localhost:3000")]
    base_url: String,

    /// Free-form story theme. Skips the genre menu.
    #[arg(long)]
    theme: Option<String>,

    /// Genre from the built-in catalog. Skips the genre menu.
    #[arg(long, conflicts_with = "theme")]
    genre: Option<String>,

    /// Seconds between status polls.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_secs: u64,

    /// Directory to save each scene's narration audio in.
    #[arg(long)]
    audio_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with the story on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, "session ended");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<session::Outcome, Box<dyn std::error::Error>> {
    let backend = HttpStoryBackend::new(&HttpBackendConfig::new(cli.base_url))?;
    let coordinator = StoryProgressCoordinator::new(
        Arc::new(backend),
        CoordinatorConfig {
            poll_interval: Duration::from_secs(cli.poll_interval_secs),
        },
    );

    if let Some(dir) = &cli.audio_dir {
        tokio::fs::create_dir_all(dir).await.map_err(PlayError::Io)?;
    }

    let mut player = Player::new(
        coordinator,
        BufReader::new(tokio::io::stdin()),
        std::io::stdout(),
    )
    .with_audio_dir(cli.audio_dir);

    let theme = player.choose_theme(cli.theme, cli.genre).await?;
    Ok(player.play(&theme).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["storyloop-play", "--genre", "Noir"]).unwrap();

        assert_eq!(cli.poll_interval_secs, 5);
        assert_eq!(cli.genre.as_deref(), Some("Noir"));
        assert!(cli.theme.is_none());
        assert!(cli.audio_dir.is_none());
    }

    #[test]
    fn test_cli_rejects_theme_with_genre_and_zero_interval() {
        assert!(
            Cli::try_parse_from(["storyloop-play", "--theme", "x", "--genre", "Noir"]).is_err()
        );
        assert!(Cli::try_parse_from(["storyloop-play", "--poll-interval-secs", "0"]).is_err());
    }
}
