//! Tracing subscriber setup.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use selfiebox_core::config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const DEFAULT_LEVEL: &str = "info";

/// Installs the global subscriber. `RUST_LOG` wins over `log_level`.
///
/// Logs go to stderr, or to `log_file` when one is configured. Keep the
/// returned guard alive so buffered file output is flushed on exit.
pub fn init(config: &Config) -> Result<Option<WorkerGuard>> {
    let level = config.log_level.as_deref().unwrap_or(DEFAULT_LEVEL);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log_level '{level}'"))?;

    let registry = tracing_subscriber::registry().with(filter);

    let Some(log_file) = config.log_file.as_deref() else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .map_err(|err| anyhow!("install log subscriber: {err}"))?;
        return Ok(None);
    };

    let (writer, guard) = file_writer(Path::new(log_file))?;
    registry
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|err| anyhow!("install log subscriber: {err}"))?;
    Ok(Some(guard))
}

fn file_writer(path: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log_file has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}
