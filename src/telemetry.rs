//! Logging setup.
//!
//! The dashboard owns the terminal, so interactive runs only log when a log
//! file is configured. Non-interactive runs (such as `--export`) log to
//! stderr. `RUST_LOG` takes precedence over the configured level.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// Returns `Ok(false)` when nothing was installed because the run is
/// interactive and no log file was given.
pub fn init_logging(log_file: Option<&Path>, level: &str, interactive: bool) -> Result<bool> {
    let filter = env_filter(level);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;
        }
        None if !interactive => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;
        }
        None => return Ok(false),
    }

    Ok(true)
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
