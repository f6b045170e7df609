//! File logging. The terminal belongs to the UI, so everything goes to a
//! daily-rotated file under the config directory.

use crate::config;
use anyhow::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "podwheel";
const DEFAULT_FILTER: &str = "podwheel=debug,warn";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(root: &Path) -> Result<WorkerGuard> {
    let dir = config::log_dir(root);
    config::ensure_dir(&dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()?;

    tracing::info!(dir = %dir.display(), "logging initialized");
    Ok(guard)
}
