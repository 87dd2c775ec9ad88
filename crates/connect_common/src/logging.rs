//! Logging utilities for the Connect service.
//!
//! Sets up the tracing subscriber used by every crate in the workspace and a
//! helper for logging errors with their context.

use tracing::{error, info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events are enabled at the requested level by default.
const CONNECT_TARGETS: &[&str] = &[
    "connect_backend",
    "connect_common",
    "connect_config",
    "connect_stripe",
];

/// Initialize the tracing subscriber at INFO.
///
/// The returned guard must be held for the lifetime of the process when a
/// log file is configured, or buffered lines are lost on exit.
///
/// ```
/// use connect_common::logging;
///
/// let _guard = logging::init();
/// ```
pub fn init() -> Option<WorkerGuard> {
    init_with_level(Level::INFO)
}

/// Initialize the tracing subscriber with a specific log level.
///
/// `RUST_LOG` directives are honoured on top of the per-crate defaults. When
/// `LOG_DIR` is set, a daily rolling `connect.log` is written there as well.
pub fn init_with_level(level: Level) -> Option<WorkerGuard> {
    let filter = CONNECT_TARGETS.iter().fold(EnvFilter::from_default_env(), |filter, target| {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        }
    });

    let (file_layer, guard) = match std::env::var("LOG_DIR") {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "connect.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    // try_init: tests and embedding hosts may already have a subscriber
    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true),
        )
        .with(file_layer)
        .with(filter)
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
    guard
}

/// Log an error with context at the ERROR level.
pub fn log_error<E: std::fmt::Display>(error: E, context: &str) {
    error!("{}: {}", context, error);
}
