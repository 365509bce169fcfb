//! Configuration loading and backend address resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

/// Environment variable overriding the backend base address
pub const BACKEND_URL_ENV: &str = "BGM_BACKEND_URL";

/// Compiled default backend base address
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Default interval between job status queries
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// TOML configuration file contents
///
/// Every field is optional in the file; missing sections take defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Base address of the media-processing service
    pub backend_url: Option<String>,
    pub logging: LoggingConfig,
    pub polling: PollingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Job status polling configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Interval between status queries (milliseconds)
    pub interval_ms: u64,

    /// Give up on a job after this many seconds (unset: poll until a terminal status)
    pub max_wait_secs: Option<u64>,

    /// Give up after this many consecutive failed status queries (unset: never)
    pub max_consecutive_failures: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_wait_secs: None,
            max_consecutive_failures: None,
        }
    }
}

/// Default configuration file location for the platform
///
/// `<config dir>/bgm-creator/config.toml`, e.g. `~/.config/bgm-creator/config.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bgm-creator").join("config.toml"))
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// This file does not exist; defaults are in use
    Missing(PathBuf),
    /// No config location could be determined; defaults are in use
    Builtin,
}

impl ConfigSource {
    /// Report the outcome of loading; call once the tracing subscriber is installed
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Missing(path) => warn!(
                "Config file not found at {} - using defaults",
                path.display()
            ),
            ConfigSource::Builtin => warn!("No config directory available - using defaults"),
        }
    }
}

/// Read TOML configuration without logging
///
/// A missing file is not an error: defaults are returned with
/// `ConfigSource::Missing`. A file that exists but cannot be read or parsed is
/// a configuration error.
pub fn read_toml_config(path: &Path) -> Result<(TomlConfig, ConfigSource)> {
    if !path.exists() {
        return Ok((TomlConfig::default(), ConfigSource::Missing(path.to_path_buf())));
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    if config.polling.interval_ms == 0 {
        return Err(Error::Config(
            "polling.interval_ms must be greater than zero".to_string(),
        ));
    }

    Ok((config, ConfigSource::File(path.to_path_buf())))
}

/// Load TOML configuration, logging where it came from
///
/// A missing file is not an error: a warning is logged and defaults are used.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let (config, source) = read_toml_config(path)?;
    source.log();
    Ok(config)
}

/// Resolve the backend base address
///
/// Priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable `BGM_BACKEND_URL`
/// 3. TOML config file
/// 4. Compiled default (fallback)
///
/// The winning value must be an http(s) address.
pub fn resolve_backend_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> Result<String> {
    let env_value = std::env::var(BACKEND_URL_ENV).ok();

    let (url, source) = if let Some(url) = non_blank(cli_arg) {
        (url, "command line")
    } else if let Some(url) = non_blank(env_value.as_deref()) {
        (url, "environment")
    } else if let Some(url) = non_blank(toml_config.backend_url.as_deref()) {
        (url, "TOML config")
    } else {
        (DEFAULT_BACKEND_URL, "compiled default")
    };

    parse_backend_url(url)?;
    info!("Backend address {} (from {})", url, source);
    Ok(url.trim_end_matches('/').to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a backend base address; anything but an absolute http(s) URL with a host is rejected
pub fn parse_backend_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid backend address {:?}: {}", raw, e)))?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "Backend address must be an http(s) URL (got {:?})",
            raw
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::Config(format!("Backend address has no host: {:?}", raw)));
    }

    Ok(url)
}
