use std::path::Path;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

pub const LOG_FILE_PREFIX: &str = "presale-sync.log";

/// Logs to stdout. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let _ = fmt().with_env_filter(env_filter()).try_init();
}

/// Logs to a daily rolling file under `dir`. Keep the guard alive for as long
/// as logs should be flushed.
pub fn init_file_tracing(dir: &Path) -> WorkerGuard {
    let appender = rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(writer)
        .try_init();
    guard
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
