//! Append-only event log.
//!
//! Every organize run records its moves, renames, skips and failures as
//! `tracing` events. [`init`] routes them to a plain-text file, one
//! timestamped line per event, and mirrors the more severe ones to stderr.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, time::ChronoLocal};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "file_organizer.log";

/// Environment variable overriding the log filter (e.g. `tidysort=debug`).
pub const LOG_ENV: &str = "TIDYSORT_LOG";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to install log subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the global subscriber writing to `log_path` in append mode.
///
/// `console_level` controls what is echoed to stderr. The returned guard
/// flushes pending lines when dropped and must be kept alive for the duration
/// of the program.
pub fn init(log_path: &Path, console_level: LevelFilter) -> Result<WorkerGuard, LoggingError> {
    if let Some(parent) = log_path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|source| LoggingError::Open {
            path: log_path.to_path_buf(),
            source,
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|source| LoggingError::Open {
            path: log_path.to_path_buf(),
            source,
        })?;

    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()));

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(console_level);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(guard)
}
