//! Tracing subscriber setup for embedders.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `level`. With a `file`, output goes
/// through a non-blocking appender and the returned guard must be held for
/// as long as logs should be flushed; without one, or when `file` names no
/// file, output goes to stderr. A second call leaves the first subscriber in
/// place.
pub fn init_logging(level: &str, file: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some((log_dir, file_name)) = file.and_then(split_log_path) else {
        init_stderr(env_filter);
        if let Some(path) = file {
            tracing::warn!(path = %path.display(), "log file has no file name, logging to stderr");
        }
        return None;
    };

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    if tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed");
        return None;
    }

    Some(guard)
}

fn split_log_path(path: &Path) -> Option<(&Path, &str)> {
    Some((path.parent()?, path.file_name()?.to_str()?))
}

fn init_stderr(env_filter: EnvFilter) {
    if tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed");
    }
}
