//! Tracing subscriber setup
//!
//! Logs go to a file in the data directory so they never interleave with the
//! report written to stdout.

use std::path::Path;

use anyhow::{Context, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use crate::config::{LOG_FILE_NAME, data_dir};

/// Filter directives, e.g. `composer_updates=debug`
pub const LOG_ENV: &str = "COMPOSER_UPDATES_LOG";

/// Set to `json` for structured log lines
pub const LOG_FORMAT_ENV: &str = "COMPOSER_UPDATES_LOG_FORMAT";

/// Install the global subscriber
///
/// Logging is a side channel: when the log file cannot be set up a warning
/// goes to stderr and the program runs without a subscriber. The returned
/// guard flushes buffered log lines when dropped and must be kept alive for
/// the duration of the program.
pub fn init(verbose: bool) -> Option<WorkerGuard> {
    init_in(&data_dir(), verbose)
        .inspect_err(|e| eprintln!("Warning: logging disabled: {:#}", e))
        .ok()
}

fn init_in(dir: &Path, verbose: bool) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(dir)
        .context("Failed to open log file")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = env_filter(std::env::var(LOG_ENV).ok(), verbose);
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|format| format == "json");

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

fn env_filter(directives: Option<String>, verbose: bool) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(verbose)))
}
