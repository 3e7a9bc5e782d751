//! Tracing subscriber setup.
//!
//! The interactive dashboard owns the terminal, so it logs JSON lines to a
//! file. Headless subcommands log human-readable lines to stderr. In both
//! cases `RUST_LOG` takes precedence over the configured level.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log output goes.
#[derive(Debug, Clone, Copy)]
pub enum LogTarget<'a> {
    /// Append JSON lines to a file.
    File(&'a Path),
    /// Human-readable output on stderr.
    Stderr,
}

fn env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(format!("vmiwatch={level}"))
            .with_context(|| format!("invalid log level '{level}'")),
    }
}

/// Install the global subscriber.
pub fn init_logging(level: &str, target: LogTarget<'_>) -> Result<()> {
    let filter = env_filter(level)?;

    match target {
        LogTarget::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;

            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::sync::Mutex::new(file));

            tracing_subscriber::registry()
                .with(layer)
                .with(filter)
                .try_init()?;
        }
        LogTarget::Stderr => {
            let layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);

            tracing_subscriber::registry()
                .with(layer)
                .with(filter)
                .try_init()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_levels() {
        assert!(env_filter("debug").is_ok());
        assert!(env_filter("warn").is_ok());
    }

    // The global subscriber can only be installed once per test process, so
    // init_logging itself is exercised by the binary rather than here.
}
