//! File logging.
//!
//! Logs go to a daily-rolling file under `${CVOPT_HOME}/logs/` so they never
//! interleave with command output. `CVOPT_LOG` takes an `EnvFilter` directive
//! and overrides the configured level.

use std::fs;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::paths;

pub const LOG_ENV: &str = "CVOPT_LOG";
pub const LOG_FILE_PREFIX: &str = "cvopt.log";

/// Installs the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a subscriber
/// is already installed.
pub fn init(default_level: &str) -> Result<WorkerGuard> {
    let dir = paths::logs_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::debug!(dir = %dir.display(), "logging initialized");
    Ok(guard)
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
