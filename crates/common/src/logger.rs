use crate::error::TranscribeError;
use std::path::Path;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Log file name inside the configured log directory
pub const LOG_FILE_NAME: &str = "transcribe.log";

/// Initialize logging system
///
/// Console output is always enabled. When `log_dir` is given, records are
/// also appended to `transcribe.log` inside it.
///
/// # Arguments
/// * `log_dir` - Optional directory for the log file
/// * `log_level` - Default filter directive, `RUST_LOG` takes precedence
pub fn setup_logging(log_dir: Option<&Path>, log_level: &str) -> Result<(), TranscribeError> {
    let Some(log_dir) = log_dir else {
        return setup_console_logging(log_level);
    };

    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir).map_err(|e| {
            TranscribeError::config(format!(
                "Failed to create log directory {}: {}",
                log_dir.display(),
                e
            ))
        })?;
    }

    let log_file_path = log_dir.join(LOG_FILE_NAME);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .map_err(|e| {
            TranscribeError::config(format!(
                "Failed to open log file {}: {}",
                log_file_path.display(),
                e
            ))
        })?;

    let env_filter = build_filter(log_level);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter.clone());

    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false) // Remove ANSI color codes in files
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| TranscribeError::config(format!("Failed to install logger: {}", e)))?;

    tracing::info!(
        "Logging initialized: level={}, log_file={}",
        log_level,
        log_file_path.display()
    );

    Ok(())
}

/// Console-only logging
pub fn setup_console_logging(log_level: &str) -> Result<(), TranscribeError> {
    tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(build_filter(log_level))
        .try_init()
        .map_err(|e| TranscribeError::config(format!("Failed to install logger: {}", e)))?;

    tracing::info!("Console logging initialized: level={}", log_level);

    Ok(())
}

/// RUST_LOG wins over the configured level; an unparsable level degrades to `info`
fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', defaulting to info", log_level);
            EnvFilter::new("info")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        // Only exercised when RUST_LOG is unset in the test environment
        if std::env::var("RUST_LOG").is_err() {
            let filter = build_filter("transcribe_server=debug,info");
            assert!(filter.to_string().contains("transcribe_server=debug"));
        }
    }

    #[test]
    fn test_file_logging_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("log");

        // A global subscriber may already be set by another test; the file
        // is opened before installation either way.
        let _ = setup_logging(Some(&log_dir), "info");

        assert!(log_dir.join(LOG_FILE_NAME).exists());
    }
}
