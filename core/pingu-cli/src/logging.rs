//! Tracing setup for the `pingu` binary.
//!
//! Command output goes to stdout. Diagnostics go to stderr (warnings only,
//! unless debugging) and to a daily rolling file under `<root>/logs/`.

use std::env;

use pingu_core::StorageConfig;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Set to `1`/`true`/`yes` to log at debug level everywhere.
pub const DEBUG_LOG_ENV: &str = "PINGU_DEBUG_LOG";

/// Installs the global subscriber. Keep the guard alive until exit so the
/// file writer flushes.
pub fn init(storage: &StorageConfig) -> Option<WorkerGuard> {
    let debug_enabled = debug_enabled();
    let file_filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let stderr_level = if debug_enabled {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_level);

    let (writer, guard) = match file_writer(storage) {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };
    let file_layer = writer.map(|writer| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(file_filter)
    });

    // A subscriber may already be installed (tests); that is fine.
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}

fn debug_enabled() -> bool {
    env::var(DEBUG_LOG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn file_writer(storage: &StorageConfig) -> Option<(NonBlocking, WorkerGuard)> {
    let dir = storage.logs_dir();
    if let Err(err) = fs_err::create_dir_all(&dir) {
        eprintln!("pingu: file logging disabled: {}", err);
        return None;
    }
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("pingu")
        .filename_suffix("log")
        .build(&dir)
        .map_err(|err| eprintln!("pingu: file logging disabled: {}", err))
        .ok()?;
    Some(tracing_appender::non_blocking(appender))
}
