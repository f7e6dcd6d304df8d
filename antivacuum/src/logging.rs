//! Logging setup for the command-line front end.
//!
//! Log records go to stderr so stdout stays free for feedback lines. When a
//! log file is configured, records are also written to a daily-rolling file
//! through a non-blocking writer. `RUST_LOG` takes precedence over the
//! configured level.

use std::io;
use std::path::Path;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Logging initialization errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to prepare log file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Pick the filter directive: `RUST_LOG`, then the override, then the configured level.
pub fn filter_directive(
    env: Option<&str>,
    level_override: Option<&str>,
    settings: &LoggingSettings,
) -> String {
    env.filter(|v| !v.trim().is_empty())
        .or(level_override)
        .unwrap_or(settings.level.as_str())
        .trim()
        .to_string()
}

/// Initialize the global subscriber.
///
/// # Arguments
///
/// * `settings` - `[logging]` section of the configuration
/// * `level_override` - Level given on the command line, if any
///
/// # Returns
///
/// A guard that must be kept alive while logging is needed.
pub fn init_logging(
    settings: &LoggingSettings,
    level_override: Option<&str>,
) -> Result<LoggingGuard, LoggingError> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(env.as_deref(), level_override, settings);
    let env_filter =
        EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidFilter {
            directive: directive.clone(),
            reason: e.to_string(),
        })?;

    let (file_layer, file_guard) = match &settings.file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(daily_appender(path)?);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn daily_appender(
    path: &Path,
) -> Result<tracing_appender::rolling::RollingFileAppender, LoggingError> {
    let io_error = |source| LoggingError::Io {
        path: path.display().to_string(),
        source,
    };

    let file_name = path.file_name().ok_or_else(|| {
        io_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "log path has no file name",
        ))
    })?;
    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory).map_err(io_error)?;

    Ok(tracing_appender::rolling::daily(directory, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings(level: &str) -> LoggingSettings {
        LoggingSettings {
            level: level.to_string(),
            file: None,
        }
    }

    #[test]
    fn test_configured_level_used_by_default() {
        assert_eq!(filter_directive(None, None, &settings("warn")), "warn");
    }

    #[test]
    fn test_override_beats_configured_level() {
        assert_eq!(
            filter_directive(None, Some("debug"), &settings("warn")),
            "debug"
        );
    }

    #[test]
    fn test_env_beats_everything() {
        assert_eq!(
            filter_directive(Some("antivacuum=trace"), Some("debug"), &settings("warn")),
            "antivacuum=trace"
        );
        assert_eq!(filter_directive(Some("  "), None, &settings("warn")), "warn");
    }

    #[test]
    fn test_daily_appender_creates_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("antivacuum.log");
        daily_appender(&path).unwrap();
        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn test_daily_appender_rejects_directory_path() {
        let err = daily_appender(&PathBuf::from("/")).unwrap_err();
        assert!(matches!(err, LoggingError::Io { .. }));
    }
}
