//! Logging setup
//!
//! The TUI owns the terminal, so nothing may be written to stdout/stderr while
//! it runs. Debug mode sends everything to daily-rolling files instead;
//! headless commands log to stderr.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_PREFIX: &str = "wp-migrator.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Write debug-level logs to files in `log_dir`
    pub debug_mode: bool,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Default level when `RUST_LOG` is not set
    pub level: String,
    /// Log to stderr (headless commands only)
    pub console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self {
            debug_mode: false,
            log_dir: default_log_dir(),
            level: "info".to_string(),
            console: false,
        }
    }

    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        self
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = dir;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    fn filter(&self) -> EnvFilter {
        let level = if self.debug_mode { "debug" } else { self.level.as_str() };
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("wp_migrator={level},warn")))
    }
}

/// Default log directory: `<data_local_dir>/wp-migrator/logs`
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wp-migrator")
        .join("logs")
}

/// Install the global subscriber.
///
/// Returns the appender guard when file logging is active; it must be kept
/// alive until exit or buffered lines are lost.
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>> {
    if config.debug_mode {
        std::fs::create_dir_all(&config.log_dir).with_context(|| {
            format!("Failed to create log directory: {}", config.log_dir.display())
        })?;

        let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        tracing_subscriber::registry()
            .with(config.filter())
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .context("Failed to install tracing subscriber")?;

        tracing::info!("Debug logging to {}", config.log_dir.display());
        return Ok(Some(guard));
    }

    if config.console {
        tracing_subscriber::registry()
            .with(config.filter())
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .context("Failed to install tracing subscriber")?;
    }

    Ok(None)
}

/// Remove log files older than `max_age_days` from the default log directory
pub fn cleanup_old_logs(max_age_days: u64) -> Result<usize> {
    cleanup_logs_in(&default_log_dir(), max_age_days)
}

/// Remove log files older than `max_age_days` from `dir`
pub fn cleanup_logs_in(dir: &std::path::Path, max_age_days: u64) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let max_age = Duration::from_secs(max_age_days * 24 * 60 * 60);
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read log directory: {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(LOG_FILE_PREFIX) {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// List log files in the default directory, newest first
pub fn list_log_files() -> Result<Vec<PathBuf>> {
    let dir = default_log_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX) {
            let modified = entry.metadata()?.modified()?;
            files.push((modified, entry.path()));
        }
    }
    files.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(files.into_iter().map(|(_, p)| p).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new()
            .with_debug_mode(true)
            .with_level("trace")
            .with_console(true)
            .with_log_dir(PathBuf::from("/tmp/wp-migrator-logs"));
        assert!(config.debug_mode);
        assert!(config.console);
        assert_eq!(config.level, "trace");
        assert_eq!(config.log_dir, PathBuf::from("/tmp/wp-migrator-logs"));
    }

    #[test]
    fn test_default_log_dir() {
        let dir = default_log_dir();
        assert!(dir.ends_with("wp-migrator/logs"));
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let removed = cleanup_logs_in(std::path::Path::new("/nonexistent/wp-migrator"), 7).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_cleanup_keeps_fresh_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("wp-migrator.log.2026-10-15"), "fresh").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a log").unwrap();

        // Files written just now are younger than one day
        let removed = cleanup_logs_in(dir.path(), 1).unwrap();
        assert_eq!(removed, 0);
        assert!(dir.path().join("notes.txt").exists());
    }
}
