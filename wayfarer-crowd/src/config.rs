//! Configuration resolution for wayfarer-crowd
//!
//! Provides multi-tier configuration resolution with ENV → TOML → default
//! priority for every tunable of the forecast engine.

use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use wayfarer_common::config::{self, TomlConfig};
use wayfarer_common::Result;

/// Environment variable holding the BestTime private key
pub const BESTTIME_API_KEY_ENV: &str = "BESTTIME_API_PRIVATE_KEY";
/// Environment variable holding the Gemini key
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Provider intensity code meaning "closed this hour"
pub const DEFAULT_CLOSED_INTENSITY: i64 = 999;

/// Engine tunables
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSettings {
    /// Gemini model identifier
    pub gemini_model: String,
    /// Bounded wait for one provider request
    pub provider_timeout: Duration,
    /// Bounded wait for one model request
    pub gemini_timeout: Duration,
    /// Width of the recommended visiting window
    pub window_hours: u8,
    /// Closing hour assumed when a day has none
    pub closing_hour_default: u8,
    /// Quiet hours before this are described as "morning"
    pub morning_threshold_hour: u8,
    /// Provider sentinel for closed hours
    pub closed_intensity: i64,
    /// Provider request budget
    pub provider_requests_per_second: u32,
    /// Entries kept in the venue name-match memo
    pub name_match_cache_capacity: usize,
    /// Similarity at or above which names match without asking the model
    pub name_match_threshold: f64,
    /// Check provider venue names against the queried name
    pub verify_venue_names: bool,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            gemini_model: "gemini-2.0-flash".to_string(),
            provider_timeout: Duration::from_secs(60),
            gemini_timeout: Duration::from_secs(30),
            window_hours: 2,
            closing_hour_default: 23,
            morning_threshold_hour: 12,
            closed_intensity: DEFAULT_CLOSED_INTENSITY,
            provider_requests_per_second: 2,
            name_match_cache_capacity: 1024,
            name_match_threshold: 0.9,
            verify_venue_names: false,
        }
    }
}

impl ForecastSettings {
    /// Resolve every setting from ENV → TOML → default
    pub fn resolve(toml_config: &TomlConfig) -> Self {
        let section = &toml_config.forecast;
        let defaults = Self::default();

        let settings = Self {
            gemini_model: config::resolve_setting(
                "GEMINI_MODEL",
                section.gemini_model.clone(),
                defaults.gemini_model,
            ),
            provider_timeout: Duration::from_secs(config::resolve_setting(
                "BESTTIME_API_TIMEOUT_SECONDS",
                section.provider_timeout_secs,
                defaults.provider_timeout.as_secs(),
            )),
            gemini_timeout: Duration::from_secs(config::resolve_setting(
                "GEMINI_API_TIMEOUT_SECONDS",
                section.gemini_timeout_secs,
                defaults.gemini_timeout.as_secs(),
            )),
            window_hours: clamp_hour(config::resolve_setting(
                "BEST_TIME_WINDOW_HOURS",
                section.window_hours,
                defaults.window_hours as u32,
            ))
            .max(1),
            closing_hour_default: clamp_hour(config::resolve_setting(
                "BEST_TIME_CLOSING_HOUR_DEFAULT",
                section.closing_hour_default,
                defaults.closing_hour_default as u32,
            )),
            morning_threshold_hour: clamp_hour(config::resolve_setting(
                "BEST_TIME_MORNING_THRESHOLD_HOUR",
                section.morning_threshold_hour,
                defaults.morning_threshold_hour as u32,
            )),
            closed_intensity: config::resolve_setting(
                "BEST_TIME_INTENSITY_CLOSED",
                section.closed_intensity,
                defaults.closed_intensity,
            ),
            provider_requests_per_second: config::resolve_setting(
                "BESTTIME_REQUESTS_PER_SECOND",
                section.provider_requests_per_second,
                defaults.provider_requests_per_second,
            )
            .max(1),
            name_match_cache_capacity: config::resolve_setting(
                "NAME_MATCH_CACHE_CAPACITY",
                section.name_match_cache_capacity,
                defaults.name_match_cache_capacity,
            )
            .max(1),
            name_match_threshold: config::resolve_setting(
                "NAME_MATCH_THRESHOLD",
                section.name_match_threshold,
                defaults.name_match_threshold,
            )
            .clamp(0.0, 1.0),
            verify_venue_names: config::resolve_setting(
                "VERIFY_VENUE_NAMES",
                section.verify_venue_names,
                defaults.verify_venue_names,
            ),
        };

        if settings.gemini_timeout.is_zero() || settings.provider_timeout.is_zero() {
            warn!("Zero timeout configured; every external call will time out immediately");
        }

        settings
    }
}

fn clamp_hour(value: u32) -> u8 {
    value.min(24) as u8
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct CrowdConfig {
    pub settings: ForecastSettings,
    pub besttime_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl CrowdConfig {
    /// Load configuration from `path`, or from the default config location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Ok(Self::from_toml(&Self::load_toml(path)?))
    }

    /// Read the TOML layer only, without resolving the environment
    pub fn load_toml(path: Option<&Path>) -> Result<TomlConfig> {
        match path {
            Some(path) => config::load_toml_config(path),
            None => match config::config_file_path() {
                Some(default_path) => config::load_toml_config(&default_path),
                None => Ok(TomlConfig::default()),
            },
        }
    }

    /// Log filter directive: `WAYFARER_LOG_LEVEL`, then `[logging] level`
    pub fn log_level(toml_config: &TomlConfig) -> String {
        config::resolve_setting(
            "WAYFARER_LOG_LEVEL",
            Some(toml_config.logging.level.clone()),
            "info".to_string(),
        )
    }

    /// Resolve from an already-parsed TOML document plus the environment
    pub fn from_toml(toml_config: &TomlConfig) -> Self {
        let besttime_api_key =
            config::resolve_api_key(BESTTIME_API_KEY_ENV, toml_config.besttime_api_key.as_ref());
        let gemini_api_key =
            config::resolve_api_key(GEMINI_API_KEY_ENV, toml_config.gemini_api_key.as_ref());

        if besttime_api_key.is_some() {
            info!("BestTime API key configured");
        } else {
            warn!(
                "BestTime API key not configured; set {} or besttime_api_key in the config file",
                BESTTIME_API_KEY_ENV
            );
        }
        if gemini_api_key.is_none() {
            warn!(
                "Gemini API key not configured; set {} or gemini_api_key in the config file",
                GEMINI_API_KEY_ENV
            );
        }

        Self {
            settings: ForecastSettings::resolve(toml_config),
            besttime_api_key,
            gemini_api_key,
        }
    }
}
