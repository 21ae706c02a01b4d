//! Tracing setup: a compact stdout layer plus a plain-text copy in `Config::log_file`.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Config;

/// Keeps the file writer flushing until process exit.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Used when `RUST_LOG` is unset or unparsable.
const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Install the global subscriber.
///
/// When the log file cannot be opened the problem is reported on stderr and only stdout
/// logging is installed. A second call is a no-op.
pub fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = match open_log_writer(&config.log_file) {
        Ok(writer) => Some(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .compact(),
        ),
        Err(message) => {
            eprintln!("{message}; logging to stdout only");
            None
        }
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .try_init();
    if installed.is_ok() {
        tracing::debug!(log_file = %config.log_file.display(), "Tracing initialized");
    }
}

/// Append-only, never-rotated writer for `path`, creating its directory first.
fn open_log_writer(path: &Path) -> Result<NonBlocking, String> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| format!("Log path {} has no file name", path.display()))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(directory)
        .map_err(|err| format!("Cannot create log directory {}: {err}", directory.display()))?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(|err| format!("Cannot open log file {}: {err}", path.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);
    Ok(writer)
}
