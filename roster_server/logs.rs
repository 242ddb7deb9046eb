use std::env;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info,roster=debug,tower_http=debug";

/// Logs to stdout and to a daily rotated `roster.log`.
///
/// `RUST_LOG` overrides the default filter, `ROSTER_LOG_DIR` the directory
/// (defaults to `logs/`). Records are flushed to the file only while the
/// returned guard is alive.
pub fn setup_logging() -> WorkerGuard {
    let log_dir = env::var("ROSTER_LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let file_appender = tracing_appender::rolling::daily(log_dir, "roster.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_target(true);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
