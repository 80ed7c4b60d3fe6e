//! Logging Setup
//!
//! Installs the global `tracing` subscriber. The configured level is the
//! default directive; `RUST_LOG` refines it and `--verbose` raises it to debug.

use crate::config::LoggingConfig;
use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("Invalid log format: {}", other)),
        }
    }
}

/// Level used when nothing in the environment overrides it
pub fn effective_level(config: &LoggingConfig, verbose: bool) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    config.level.to_lowercase().parse().unwrap_or(Level::INFO)
}

/// Env filter with `level` as the default directive
pub fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the global subscriber
///
/// Logs go to stderr so command output on stdout stays machine readable.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = effective_level(config, verbose);
    let format: LogFormat = config.format.parse()?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}
