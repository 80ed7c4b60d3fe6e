// Configuration File Support
//
// This module provides configuration file parsing for netprobe.
// Supports TOML format with environment variable overrides.
// Configuration files are loaded from XDG config directory: ~/.config/netprobe/config.toml

use crate::lookup::{IpLookupClient, DEFAULT_LOOKUP_URL};
use crate::scanner::{PortSet, ScanOptions, DEFAULT_MAX_CONCURRENCY};
use crate::tools::{Allowlist, GuardConfig, DEFAULT_MAX_OUTPUT_BYTES};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Port scanner configuration
    pub scanner: ScannerConfig,

    /// Guarded command configuration
    pub commands: CommandsConfig,

    /// IP lookup provider configuration
    pub lookup: LookupConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub bind: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Port scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScannerConfig {
    /// Ports probed by `/api/scan`
    pub ports: PortSet,

    /// Per-port connect timeout in milliseconds
    pub timeout_ms: u64,

    /// Maximum simultaneous connection attempts
    pub max_concurrency: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            ports: PortSet::common(),
            timeout_ms: 1000,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Guarded command configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommandsConfig {
    /// Wall-clock limit per command in seconds
    pub timeout_secs: u64,

    /// Bytes kept per output stream
    pub max_output_bytes: usize,

    /// Directory commands run in (default: inherited)
    pub working_dir: Option<PathBuf>,

    /// Allowed base commands and their descriptions
    pub allowed: Allowlist,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            working_dir: None,
            allowed: Allowlist::default(),
        }
    }
}

/// IP lookup provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LookupConfig {
    /// Provider base URL
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LOOKUP_URL.to_string(),
            timeout_secs: 5,
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to expose `/metrics`
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    /// If the config file does not exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// Environment overrides are applied to the file contents (or to the
    /// defaults when the file is missing) before validation.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;

            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/netprobe/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "netprobe", "Netprobe") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config").join("netprobe").join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - NETPROBE_LOG_LEVEL
    /// - NETPROBE_LOG_FORMAT
    /// - NETPROBE_BIND
    /// - NETPROBE_PORT
    /// - NETPROBE_SCAN_TIMEOUT_MS
    /// - NETPROBE_SCAN_CONCURRENCY
    /// - NETPROBE_COMMAND_TIMEOUT_SECS
    /// - NETPROBE_LOOKUP_URL
    ///
    /// Values that fail to parse are ignored.
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("NETPROBE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("NETPROBE_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(bind) = std::env::var("NETPROBE_BIND") {
            self.server.bind = bind;
        }
        if let Ok(port) = std::env::var("NETPROBE_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(timeout) = std::env::var("NETPROBE_SCAN_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                if timeout > 0 {
                    self.scanner.timeout_ms = timeout;
                }
            }
        }
        if let Ok(concurrency) = std::env::var("NETPROBE_SCAN_CONCURRENCY") {
            if let Ok(concurrency) = concurrency.parse::<usize>() {
                if concurrency > 0 {
                    self.scanner.max_concurrency = concurrency;
                }
            }
        }

        if let Ok(timeout) = std::env::var("NETPROBE_COMMAND_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                if timeout > 0 {
                    self.commands.timeout_secs = timeout;
                }
            }
        }

        if let Ok(url) = std::env::var("NETPROBE_LOOKUP_URL") {
            self.lookup.base_url = url;
        }

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}. Must be one of: trace, debug, info, warn, error", self.logging.level),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!("Invalid log format: {}. Must be one of: json, pretty, compact", self.logging.format),
        }

        self.server
            .bind
            .parse::<IpAddr>()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind))?;

        if self.scanner.timeout_ms == 0 {
            anyhow::bail!("Scanner timeout must be > 0");
        }
        if self.scanner.max_concurrency == 0 {
            anyhow::bail!("Scanner concurrency must be > 0");
        }
        if self.scanner.ports.is_empty() {
            anyhow::bail!("Scanner port list must not be empty");
        }

        if self.commands.timeout_secs == 0 {
            anyhow::bail!("Command timeout must be > 0");
        }
        if self.commands.max_output_bytes == 0 {
            anyhow::bail!("Command output limit must be > 0");
        }
        if let Some(dir) = &self.commands.working_dir {
            if !dir.is_dir() {
                anyhow::bail!("Command working directory {:?} is not a directory", dir);
            }
        }
        for (name, _) in self.commands.allowed.iter() {
            if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
                anyhow::bail!("Allowed command '{}' must be a single non-empty word", name);
            }
        }

        if !(self.lookup.base_url.starts_with("http://") || self.lookup.base_url.starts_with("https://")) {
            anyhow::bail!("Lookup base URL must be http(s): {}", self.lookup.base_url);
        }
        if self.lookup.timeout_secs == 0 {
            anyhow::bail!("Lookup timeout must be > 0");
        }

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging.level.to_lowercase().parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }

    /// Address the HTTP server listens on
    pub fn server_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind))?;
        Ok(SocketAddr::from((ip, self.server.port)))
    }

    /// Scan options derived from `[scanner]`
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::new(
            Duration::from_millis(self.scanner.timeout_ms),
            self.scanner.max_concurrency,
        )
    }

    /// Guard configuration derived from `[commands]`
    pub fn guard_config(&self) -> GuardConfig {
        let config = GuardConfig::with_timeout(Duration::from_secs(self.commands.timeout_secs))
            .max_output_bytes(self.commands.max_output_bytes);
        match &self.commands.working_dir {
            Some(dir) => config.working_dir(dir.clone()),
            None => config,
        }
    }

    /// IP lookup client derived from `[lookup]`
    pub fn lookup_client(&self) -> IpLookupClient {
        IpLookupClient::new(
            self.lookup.base_url.clone(),
            Duration::from_secs(self.lookup.timeout_secs),
        )
    }
}
