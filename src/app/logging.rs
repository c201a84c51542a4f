//! Tracing setup: stderr for the process, plus a log file per working directory.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing::{Dispatch, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LoggingConfig;

/// Maps `-q` / `-v` flags to the stderr level.
///
/// Progress lines go to stdout, so stderr only shows warnings by default.
#[must_use]
pub fn stderr_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// `RUST_LOG` when set, otherwise `default`.
fn env_filter(default: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy()
}

/// Installs the process-wide stderr subscriber. Safe to call more than once.
pub fn init_tracing(level: LevelFilter) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(level))
        .try_init();
}

/// Builds the subscriber used while processing one working directory.
///
/// Events go to stderr at `stderr_level` and are appended to `log_path` at
/// the configured level, with the fields named by `logging.format`.
///
/// # Errors
///
/// Returns an I/O error if the log file cannot be opened.
pub fn directory_dispatch(
    stderr_level: LevelFilter,
    logging: &LoggingConfig,
    log_path: &Path,
) -> std::io::Result<Dispatch> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let format = &logging.format;
    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_level(format.level)
        .with_target(format.target)
        .with_file(format.location)
        .with_line_number(format.location)
        .with_thread_names(format.thread);
    let file_layer = if format.time {
        file_layer.boxed()
    } else {
        file_layer.without_time().boxed()
    };

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter(stderr_level)),
        )
        .with(file_layer.with_filter(env_filter(logging.level)));
    Ok(Dispatch::new(subscriber))
}

/// Prints a progress line to stdout and records it in the log.
pub fn puts(message: &str) {
    println!("{message}");
    info!("{message}");
}
