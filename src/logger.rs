use anyhow::{anyhow, Context};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::SubscriberBuilder;

/// Log file used when none is given on the command line.
pub const DEFAULT_LOG_PATH: &str = "watchdog.log";

/*
    @@@
    @init();
    . Opens (appending) the log file at 'path' and wraps it in a non-blocking writer.
    . Configures a tracing subscriber to log INFO-level events (with timestamps, levels, and targets) to that writer.
    . Installs it as the process-wide default; a second call fails instead of redirecting the output.
    . Keeps the appender alive by returning the guard, which must outlive every log call.
*/
pub fn init(path: &Path) -> anyhow::Result<WorkerGuard> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file = path
        .file_name()
        .ok_or_else(|| anyhow!("log path {} has no file name", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file.to_string_lossy())
        .build(dir)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = SubscriberBuilder::default()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("logging already initialized")?;
    Ok(guard)
}
