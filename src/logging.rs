use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter, e.g. `TREE_COPY_LOG=debug`
pub const LOG_ENV: &str = "TREE_COPY_LOG";

/// Route tracing output to `<dir>/tree-copy.log`.
///
/// The terminal belongs to the TUI, so nothing is written to stderr. Returns
/// the writer guard, which must live until exit so buffered lines are flushed.
/// Returns `None` if the log directory can't be created or a subscriber is
/// already installed.
pub fn init_logging(dir: &Path) -> Option<WorkerGuard> {
    fs::create_dir_all(dir).ok()?;
    let appender = tracing_appender::rolling::never(dir, "tree-copy.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .ok()?;
    Some(guard)
}
