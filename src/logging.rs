//! File logging. The terminal belongs to the TUI, so logs go to a daily file
//! under `<data dir>/logs` and never to stdout.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

const LOG_DIR_NAME: &str = "logs";
const LOG_FILE_PREFIX: &str = "setlist-metronome.log";
const FALLBACK_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install the global subscriber. `RUST_LOG` overrides `default_filter`.
/// Later calls are no-ops. Returns the log directory.
pub fn init(data_dir: &Path, default_filter: &str) -> Result<PathBuf, LoggingError> {
    let log_dir = data_dir.join(LOG_DIR_NAME);
    if LOG_GUARD.get().is_some() {
        return Ok(log_dir);
    }

    fs::create_dir_all(&log_dir).map_err(|source| LoggingError::CreateDir {
        path: log_dir.clone(),
        source,
    })?;

    let file_appender = rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer);

    let subscriber = Registry::default()
        .with(build_env_filter(default_filter))
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!(dir = %log_dir.display(), "logging initialized");
    Ok(log_dir)
}

fn build_env_filter(default_filter: &str) -> EnvFilter {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    EnvFilter::new(filter_directive(env.as_deref(), default_filter))
}

/// First usable directive out of `RUST_LOG` and the configured filter, else
/// `info`. Blank values count as unset.
fn filter_directive(env: Option<&str>, configured: &str) -> String {
    env.into_iter()
        .chain(std::iter::once(configured))
        .map(str::trim)
        .find(|directive| !directive.is_empty() && EnvFilter::try_new(directive).is_ok())
        .unwrap_or(FALLBACK_FILTER)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn configured_filter_is_used_without_env() {
        assert_eq!(
            filter_directive(None, "setlist_metronome=debug"),
            "setlist_metronome=debug"
        );
    }

    #[test]
    fn env_filter_wins_over_configured() {
        assert_eq!(filter_directive(Some("trace"), "warn"), "trace");
        assert_eq!(filter_directive(Some("  "), "warn"), "warn");
    }

    #[test]
    fn invalid_directives_fall_back_to_info() {
        assert_eq!(filter_directive(None, "setlist_metronome=loud"), "info");
        assert_eq!(filter_directive(Some("db=noisy"), ""), "info");
        assert_eq!(filter_directive(Some("db=noisy"), "warn"), "warn");
    }

    #[test]
    fn init_creates_log_directory() {
        let dir = tempdir().unwrap();
        let log_dir = init(dir.path(), "debug").unwrap();
        assert_eq!(log_dir, dir.path().join("logs"));
        assert!(log_dir.is_dir());
    }
}

