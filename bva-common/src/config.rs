//! Configuration loading
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: the client starts with defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "BVA_API_URL";
pub const ENV_API_KEY: &str = "BVA_API_KEY";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "BVA_REQUEST_TIMEOUT_SECS";
pub const ENV_AUTOPLAY: &str = "BVA_AUTOPLAY";
pub const ENV_HEALTH_POLL_SECS: &str = "BVA_HEALTH_POLL_SECS";

/// Config file contents; every key is optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub autoplay: Option<bool>,
    /// Re-probe interval for the health monitor; 0 or absent disables polling
    pub health_poll_secs: Option<u64>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Explicit config file; when set, it must exist and parse
    pub config_path: Option<PathBuf>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub autoplay: Option<bool>,
    pub health_poll_secs: Option<u64>,
}

/// Resolved client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base service URL, without trailing slash
    pub api_url: String,
    /// Static bearer credential
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    /// Start audio feedback automatically once it is ready
    pub autoplay: bool,
    /// `None` = probe once at startup only
    pub health_poll_interval: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            autoplay: true,
            health_poll_interval: None,
        }
    }
}

impl ClientConfig {
    /// Resolve configuration from CLI overrides, process environment, config file
    pub fn resolve(cli: &ConfigOverrides) -> Result<Self> {
        Self::resolve_with_env(cli, |name| std::env::var(name).ok())
    }

    /// Resolve with an injectable environment lookup
    pub fn resolve_with_env<F>(cli: &ConfigOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match &cli.config_path {
            Some(path) => load_toml_config(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => load_toml_config(&path).unwrap_or_else(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                    TomlConfig::default()
                }),
                _ => TomlConfig::default(),
            },
        };

        let defaults = ClientConfig::default();

        let api_url = cli
            .api_url
            .clone()
            .or_else(|| env(ENV_API_URL))
            .or(file.api_url)
            .unwrap_or(defaults.api_url);
        let api_url = normalize_base_url(&api_url)?;

        let api_key = cli
            .api_key
            .clone()
            .or_else(|| env(ENV_API_KEY))
            .or(file.api_key)
            .filter(|k| !k.trim().is_empty());

        let request_timeout_secs = match cli.request_timeout_secs {
            Some(v) => v,
            None => match env(ENV_REQUEST_TIMEOUT_SECS) {
                Some(raw) => parse_u64(ENV_REQUEST_TIMEOUT_SECS, &raw)?,
                None => file
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            },
        };
        if request_timeout_secs == 0 {
            return Err(Error::Config("request timeout must be positive".to_string()));
        }

        let autoplay = match cli.autoplay {
            Some(v) => v,
            None => match env(ENV_AUTOPLAY) {
                Some(raw) => parse_bool(ENV_AUTOPLAY, &raw)?,
                None => file.autoplay.unwrap_or(defaults.autoplay),
            },
        };

        let health_poll_secs = match cli.health_poll_secs {
            Some(v) => Some(v),
            None => match env(ENV_HEALTH_POLL_SECS) {
                Some(raw) => Some(parse_u64(ENV_HEALTH_POLL_SECS, &raw)?),
                None => file.health_poll_secs,
            },
        };

        Ok(ClientConfig {
            api_url,
            api_key,
            request_timeout: Duration::from_secs(request_timeout_secs),
            autoplay,
            health_poll_interval: health_poll_secs
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
        })
    }

    /// Absolute URL for an endpoint path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<TomlConfig>(&content)?;
    Ok(config)
}

/// Platform config file location (`<config_dir>/bva/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bva").join("config.toml"))
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "API URL must start with http:// or https://: {:?}",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{} is not a boolean: {:?}", name, other))),
    }
}

fn parse_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{} is not a non-negative integer: {:?}", name, raw)))
}
