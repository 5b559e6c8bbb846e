//! Log output for multibar binaries.
//!
//! Stdout carries the progress frames, so logs never go to the terminal: they
//! are written to a file through a non-blocking appender, or dropped.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "MULTIBAR_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Keeps the background log writer alive; logs are flushed on drop.
#[must_use = "dropping the guard stops log output"]
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

/// Builds the filter from `directives`, falling back to `warn` when they are
/// missing or invalid.
pub fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber writing to `log_file`.
///
/// Without a file nothing is installed and all events are discarded.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(log_file: Option<&Path>) -> Result<LogGuard> {
    let Some(path) = log_file else {
        return Ok(LogGuard { _worker: None });
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("Log path has no file name: {}", path.display()))?;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let directives = std::env::var(LOG_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(directives.as_deref()))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("Failed to install log subscriber: {err}"))?;

    Ok(LogGuard {
        _worker: Some(guard),
    })
}
