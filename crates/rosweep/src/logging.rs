use std::fs::{self, OpenOptions};
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging to stderr, plus a log file when one is given.
///
/// The log level can be controlled via the `level` parameter or the `RUST_LOG`
/// environment variable. File output goes through a background writer; keep the
/// returned guard alive until the program exits so buffered lines are flushed.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> color_eyre::Result<Option<WorkerGuard>> {
    // Build filter from RUST_LOG env var or use provided level
    let default_filter = format!("rosweep={level},rosweep_core={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent()
                && !dir.as_os_str().is_empty()
            {
                fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    match log_file {
        Some(path) => tracing::debug!(log_path = %path.display(), "logging initialized"),
        None => tracing::debug!("logging initialized"),
    }
    Ok(guard)
}
