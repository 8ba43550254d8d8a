//! Logging configuration for TableRAG
//!
//! Console output goes to stderr so that stdout carries only command output
//! (the generated answer, reports). A daily rolling file is written alongside
//! when enabled in the configuration.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::Result;

/// Log file name prefix inside the log directory
pub const LOG_FILE_PREFIX: &str = "tablerag.log";

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::new(format!("warn,tablerag={level}"))
}

/// Initialize logging with configuration
///
/// The returned guard flushes the file writer when dropped, so hold it for
/// the lifetime of the process.
pub fn init_logging_with_config(
    config: &LoggingConfig,
    level_override: Option<&str>,
) -> Result<Option<WorkerGuard>> {
    let level = level_override.unwrap_or(&config.level);
    let env_filter = filter_for(level);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .boxed();

    let (file_layer, guard) = if config.file_output {
        let logs_dir = Path::new(&config.directory);
        if !logs_dir.exists() {
            std::fs::create_dir_all(logs_dir)?;
        }

        let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(non_blocking)
            .with_ansi(false) // No colors in file
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::TableRagError::Custom(format!("Failed to initialize logging: {e}")))?;

    tracing::debug!(
        "Logging initialized with level: {} (file output: {})",
        level,
        config.file_output
    );

    Ok(guard)
}
