//! # Tracing Setup
//!
//! Installs the global subscriber for binaries that use the connector:
//! a colored console layer, plus a JSON file layer written through a
//! non-blocking daily rolling appender when a log directory is given.
//! `RUST_LOG` takes precedence over the configured level.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The level string is not a valid filter directive.
    #[error("invalid log filter {0:?}: {1}")]
    Filter(String, String),

    /// The log directory could not be created.
    #[error("failed to prepare log directory: {0}")]
    Io(#[from] std::io::Error),

    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TracingOptions {
    /// Fallback filter when `RUST_LOG` is unset, e.g. `info` or
    /// `lib_weekresolver=debug`.
    pub level: String,
    /// Directory for JSON log files; `None` logs to the console only.
    pub log_dir: Option<PathBuf>,
    /// File name prefix of the rolling log files.
    pub file_prefix: String,
    /// Whether the console layer uses ANSI colors.
    pub ansi: bool,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            file_prefix: "weekresolver".to_string(),
            ansi: true,
        }
    }
}

/// Builds the filter: `RUST_LOG` first, then `level`.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| LoggerError::Filter(level.to_string(), e.to_string()))
}

/// Installs the global subscriber.
///
/// When file logging is on, the returned guard must be kept alive for the
/// life of the program; dropping it flushes and stops the writer thread.
pub fn init_tracing(options: &TracingOptions) -> Result<Option<WorkerGuard>, LoggerError> {
    let env_filter = build_filter(&options.level)?;

    let console_layer = fmt::layer().with_target(true).with_ansi(options.ansi);

    let (file_layer, guard) = match &options.log_dir {
        Some(log_dir) => {
            fs::create_dir_all(log_dir)?;
            let file_appender = rolling::daily(log_dir, &options.file_prefix);
            let (writer, guard) = non_blocking(file_appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer).json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!("Logging initialized with level: {}", options.level);
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_log_to_console_at_info() {
        let options = TracingOptions::default();
        assert_eq!(options.level, "info");
        assert!(options.log_dir.is_none());
    }

    #[test]
    fn filter_accepts_levels_and_directives() {
        assert!(build_filter("debug").is_ok());
        assert!(build_filter("lib_weekresolver=trace,warn").is_ok());
    }

    #[test]
    fn init_creates_log_dir_and_returns_guard() {
        let tmp = tempfile::tempdir().unwrap();
        let log_dir = tmp.path().join("logs");
        let options = TracingOptions {
            level: "debug".to_string(),
            log_dir: Some(log_dir.clone()),
            file_prefix: "weekresolver-test".to_string(),
            ansi: false,
        };
        let guard = init_tracing(&options).unwrap();
        assert!(guard.is_some());
        assert!(log_dir.is_dir());

        // A second global subscriber is refused.
        let err = init_tracing(&TracingOptions::default()).unwrap_err();
        assert!(matches!(err, LoggerError::Init(_)));
    }
}
