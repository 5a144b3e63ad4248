//! Tracing subscriber setup.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SPANLENS_LOG";
const FALLBACK_LEVEL: &str = "info";

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Append to a file; used while the terminal browser owns the screen.
    File(PathBuf),
}

/// Filter from `SPANLENS_LOG` when set, otherwise from the configured level.
pub fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|err| {
            eprintln!("invalid log level '{level}' ({err}); using {FALLBACK_LEVEL}");
            EnvFilter::new(FALLBACK_LEVEL)
        })
}

/// Install the global fmt subscriber. Fails if one is already installed.
pub fn init(level: &str, target: LogTarget) -> Result<()> {
    let filter = filter_for(level);
    match target {
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| anyhow::anyhow!(err))
            .context("failed to install logger")?,
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
                .map_err(|err| anyhow::anyhow!(err))
                .context("failed to install logger")?;
        }
    }
    tracing::debug!(level, "logging initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_levels_build_filters() {
        assert_eq!(filter_for("debug").to_string(), "debug");
        assert_eq!(filter_for("spanlens=trace").to_string(), "spanlens=trace");
    }

    #[test]
    fn invalid_levels_fall_back() {
        assert_eq!(filter_for("spanlens=loud").to_string(), FALLBACK_LEVEL);
    }
}
