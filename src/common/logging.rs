//! Logging and tracing configuration
//!
//! Human output (the per-case verdict lines and the summary) goes to stdout,
//! or to stderr when the JSON report is written to stdout. Tracing goes to
//! stderr and, optionally, to a log file.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

/// Initialize tracing for a suite run
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for
/// dependencies. When `log_file` is given, a second non-ANSI layer with
/// full details writes to it; the returned guard must be held until exit so
/// buffered lines are flushed.
pub fn init_cli(verbose: bool, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("webcheck=debug,warn")
        } else {
            EnvFilter::new("webcheck=info,warn")
        }
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let file = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Warning: Could not open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    match file {
        Some(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

/// Default location for `--log-file` when given without a path
pub fn default_log_path() -> Option<PathBuf> {
    paths::log_dir().map(|d| d.join("webcheck.log"))
}
