//! Configuration loading and config file resolution
//!
//! Settings are resolved with the priority order:
//! 1. Environment variable (highest priority)
//! 2. TOML config file
//! 3. Built-in default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "WAYFARER_CONFIG";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; missing values fall through to defaults
/// defined by the consuming service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// BestTime private API key
    #[serde(default)]
    pub besttime_api_key: Option<String>,

    /// Gemini API key
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Crowd forecast tuning values
    #[serde(default)]
    pub forecast: ForecastSection,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[forecast]` section of the TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastSection {
    pub gemini_model: Option<String>,
    pub provider_timeout_secs: Option<u64>,
    pub gemini_timeout_secs: Option<u64>,
    pub window_hours: Option<u32>,
    pub closing_hour_default: Option<u32>,
    pub morning_threshold_hour: Option<u32>,
    pub closed_intensity: Option<i64>,
    pub provider_requests_per_second: Option<u32>,
    pub name_match_cache_capacity: Option<usize>,
    pub name_match_threshold: Option<f64>,
    pub verify_venue_names: Option<bool>,
}

/// Determine which config file to read
///
/// `$WAYFARER_CONFIG` wins; otherwise `<config_dir>/wayfarer/wayfarer.toml`.
/// Returns `None` when the platform has no config directory.
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = env_value(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|d| d.join("wayfarer").join("wayfarer.toml"))
}

/// Load the TOML config file
///
/// A missing file yields the default (empty) configuration. A file that
/// exists but cannot be read or parsed is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)?;

    debug!(path = %path.display(), "Config file loaded");
    Ok(config)
}

/// Read an environment variable, treating empty/whitespace values as unset
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve one setting: ENV → TOML → default
///
/// An environment value that fails to parse is ignored with a warning
/// so a typo never takes a service down.
pub fn resolve_setting<T>(env_name: &str, toml_value: Option<T>, default: T) -> T
where
    T: FromStr,
{
    if let Some(raw) = env_value(env_name) {
        match raw.parse::<T>() {
            Ok(value) => return value,
            Err(_) => warn!(
                variable = env_name,
                value = %raw,
                "Ignoring unparseable environment override"
            ),
        }
    }

    toml_value.unwrap_or(default)
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve an API key: ENV → TOML
///
/// Returns `None` when neither source holds a valid key.
pub fn resolve_api_key(env_name: &str, toml_key: Option<&String>) -> Option<String> {
    if let Some(key) = env_value(env_name) {
        return Some(key);
    }

    toml_key
        .filter(|k| is_valid_key(k))
        .map(|k| k.trim().to_string())
}
