//! Core Types and Trait Definitions for wayfarer-crowd
//!
//! Defines the data model of the crowd-forecast engine and the two
//! external collaborator seams:
//! - **ForecastProvider:** venue crowd forecasts (BestTime)
//! - **GenerativeModel:** structured/plain text generation (Gemini)
//!
//! Provider payloads cross into the engine through exactly one validation
//! boundary ([`RawDayForecast::from_provider`]); nothing downstream sees
//! untyped JSON.

use crate::error::ForecastResult;
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Day labels indexed by weekday (Monday = 0)
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Reason text used until (or instead of) generated justification
pub const DEFAULT_REASON_TEXT: &str = "Based on crowd patterns for this day";

/// Format hour (0-24) as `HH:00`
pub fn format_hour(hour: u8) -> String {
    format!("{:02}:00", hour)
}

/// Parse a strict 24h `HH:MM` clock string
pub fn parse_clock(raw: &str) -> Option<(u8, u8)> {
    let (h, m) = raw.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hour: u8 = h.parse().ok()?;
    let minute: u8 = m.parse().ok()?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}

// ============================================================================
// Attraction identity and resolution
// ============================================================================

/// Read-only view of an attraction used to build resolution candidates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttractionIdentity {
    /// Name as stored for the attraction
    pub primary_name: String,
    /// Canonical name from a places lookup, if any
    pub resolved_name: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// City the attraction belongs to
    pub city_name: Option<String>,
}

impl AttractionIdentity {
    pub fn new(primary_name: impl Into<String>) -> Self {
        Self {
            primary_name: primary_name.into(),
            ..Default::default()
        }
    }

    pub fn with_resolved_name(mut self, name: impl Into<String>) -> Self {
        self.resolved_name = Some(name.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city_name = Some(city.into());
        self
    }

    /// Address string used when the provider path is bypassed:
    /// street address, else "name, city", else the bare name.
    pub fn display_address(&self) -> String {
        if let Some(address) = present(&self.address) {
            return address.to_string();
        }
        match present(&self.city_name) {
            Some(city) => format!("{}, {}", self.primary_name, city),
            None => self.primary_name.clone(),
        }
    }
}

/// Trimmed, non-empty view of an optional field
pub(crate) fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Which identity fields a resolution attempt was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResolutionStrategy {
    ResolvedNameAddress,
    ResolvedNameCity,
    NameAddress,
    NameCity,
}

impl ResolutionStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionStrategy::ResolvedNameAddress => "resolved_name + address",
            ResolutionStrategy::ResolvedNameCity => "resolved_name + city_name",
            ResolutionStrategy::NameAddress => "name + address",
            ResolutionStrategy::NameCity => "name + city_name",
        }
    }
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One resolution attempt against the forecast provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastQuery {
    pub venue_name: String,
    pub venue_address: String,
    pub strategy: ResolutionStrategy,
}

// ============================================================================
// Forecast provider wire format
// ============================================================================

/// Forecast provider response
///
/// `analysis` is kept as raw JSON so a single malformed day cannot poison
/// the rest of the week; days are decoded one by one in [`Self::days`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub analysis: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub venue_info: Option<VenueInfo>,
}

impl ProviderResponse {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("OK")
    }

    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("Error")
    }

    /// Decode each analysis entry, dropping entries that do not fit the schema
    pub fn days(&self) -> Vec<ProviderDay> {
        self.analysis
            .iter()
            .flatten()
            .filter_map(|value| match serde_json::from_value::<ProviderDay>(value.clone()) {
                Ok(day) => Some(day),
                Err(e) => {
                    debug!(error = %e, "Dropping malformed provider analysis entry");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueInfo {
    #[serde(default)]
    pub venue_id: Option<String>,
    #[serde(default)]
    pub venue_name: Option<String>,
    #[serde(default)]
    pub venue_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderDay {
    #[serde(default)]
    pub day_info: Option<ProviderDayInfo>,
    #[serde(default)]
    pub hour_analysis: Vec<ProviderHour>,
    #[serde(default)]
    pub busy_hours: Vec<i64>,
    #[serde(default)]
    pub quiet_hours: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderDayInfo {
    #[serde(default)]
    pub day_int: Option<i64>,
    #[serde(default)]
    pub day_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderHour {
    #[serde(default)]
    pub hour: Option<i64>,
    #[serde(default)]
    pub intensity_nr: Option<i64>,
}

// ============================================================================
// Validated per-day input
// ============================================================================

/// Provider intensity reading for one hour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourIntensity {
    pub hour: u8,
    pub intensity: i64,
}

/// Unprocessed per-day payload, validated
///
/// Hours are within 0-23, unique, sorted ascending. `open_hour`/`close_hour`
/// are derived from the non-closed readings (`close_hour` exclusive, so it
/// may be 24).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDayForecast {
    pub weekday_index: u8,
    pub day_label: String,
    pub open_hour: Option<u8>,
    pub close_hour: Option<u8>,
    pub hour_intensities: Vec<HourIntensity>,
    pub quiet_hours: Vec<u8>,
    pub busy_hours: Vec<u8>,
}

impl RawDayForecast {
    /// Validate one provider day
    ///
    /// Returns `None` when the day has no usable `day_int`; such a day
    /// cannot be placed in the week.
    pub fn from_provider(day: &ProviderDay, closed_code: i64) -> Option<Self> {
        let info = day.day_info.as_ref()?;
        let weekday_index = info.day_int.filter(|d| (0..7).contains(d))? as u8;

        let mut hour_intensities: Vec<HourIntensity> = day
            .hour_analysis
            .iter()
            .filter_map(|h| {
                let hour = h.hour.filter(|h| (0..24).contains(h))? as u8;
                Some(HourIntensity {
                    hour,
                    intensity: h.intensity_nr?,
                })
            })
            .collect();
        hour_intensities.sort_by_key(|h| h.hour);
        hour_intensities.dedup_by_key(|h| h.hour);

        let day_label = info
            .day_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| WEEKDAY_NAMES[weekday_index as usize].to_string());

        let (open_hour, close_hour) = open_interval(&hour_intensities, closed_code);

        Some(Self {
            weekday_index,
            day_label,
            open_hour,
            close_hour,
            hour_intensities,
            quiet_hours: valid_hours(&day.quiet_hours),
            busy_hours: valid_hours(&day.busy_hours),
        })
    }

    /// Placeholder for a weekday the provider did not report at all
    pub fn unreported(weekday_index: u8) -> Self {
        Self {
            weekday_index,
            day_label: WEEKDAY_NAMES[weekday_index as usize % 7].to_string(),
            open_hour: None,
            close_hour: None,
            hour_intensities: Vec::new(),
            quiet_hours: Vec::new(),
            busy_hours: Vec::new(),
        }
    }

    /// True when the provider sent hour readings and every one was "closed"
    pub fn is_reported_closed(&self) -> bool {
        !self.hour_intensities.is_empty() && self.open_hour.is_none()
    }
}

/// Open interval from hourly readings: first open hour, last open hour + 1
pub fn open_interval(hours: &[HourIntensity], closed_code: i64) -> (Option<u8>, Option<u8>) {
    let mut open = hours.iter().filter(|h| h.intensity != closed_code).map(|h| h.hour);
    match open.next() {
        Some(first) => {
            let last = open.last().unwrap_or(first);
            (Some(first), Some(last + 1))
        }
        None => (None, None),
    }
}

fn valid_hours(raw: &[i64]) -> Vec<u8> {
    let mut hours: Vec<u8> = raw
        .iter()
        .filter(|h| (0..24).contains(*h))
        .map(|h| *h as u8)
        .collect();
    hours.sort_unstable();
    hours.dedup();
    hours
}

// ============================================================================
// Canonical output
// ============================================================================

/// Which fallback tier produced a day's data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Provider,
    Generated,
    Synthetic,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DataSource::Provider => "provider",
            DataSource::Generated => "generated",
            DataSource::Synthetic => "synthetic",
        })
    }
}

/// One point of an hourly crowd series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyEntry {
    /// Canonical `HH:MM`
    pub hour: String,
    /// Crowd value 0-100
    pub value: u8,
}

impl HourlyEntry {
    pub fn at_hour(hour: u8, value: u8) -> Self {
        Self {
            hour: format_hour(hour),
            value: value.min(100),
        }
    }

    /// Build from an untrusted clock string; `None` if malformed or out of range
    pub fn parse(hour: &str, value: i64) -> Option<Self> {
        let (h, m) = parse_clock(hour)?;
        if !(0..=100).contains(&value) {
            return None;
        }
        Some(Self {
            hour: format!("{:02}:{:02}", h, m),
            value: value as u8,
        })
    }

    /// `(hour, minute)` of this entry
    pub fn clock(&self) -> (u8, u8) {
        parse_clock(&self.hour).unwrap_or((0, 0))
    }

    pub fn hour_of_day(&self) -> u8 {
        self.clock().0
    }
}

/// Canonical per-day forecast record
///
/// `hourly_series` is non-empty iff `is_open`, strictly increasing, every
/// value in 0-100. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub weekday_index: u8,
    pub day_label: String,
    pub is_open: bool,
    pub open_hour: Option<u8>,
    pub close_hour: Option<u8>,
    pub aggregate_crowd_level: u8,
    pub best_window: String,
    pub reason_text: String,
    pub hourly_series: Vec<HourlyEntry>,
    pub data_source: DataSource,
}

impl ForecastDay {
    /// Whether `local` falls inside this day's open interval
    pub fn is_open_at(&self, local: &DateTime<Tz>) -> bool {
        match (self.is_open, self.open_hour, self.close_hour) {
            (true, Some(open), Some(close)) => {
                let hour = local.hour() as u8;
                open <= hour && hour < close
            }
            _ => false,
        }
    }
}

/// Card-view projection of the selected day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayCard {
    pub is_open_today: bool,
    pub is_open_now: bool,
    pub today_opening_time: Option<String>,
    pub today_closing_time: Option<String>,
    pub crowd_level_today: u8,
    pub best_time_today: String,
}

impl TodayCard {
    pub fn project(day: &ForecastDay, now: DateTime<Utc>, tz: Tz) -> Self {
        let local = now.with_timezone(&tz);
        Self {
            is_open_today: day.is_open,
            is_open_now: day.is_open_at(&local),
            today_opening_time: day.open_hour.map(format_hour),
            today_closing_time: day.close_hour.map(format_hour),
            crowd_level_today: day.aggregate_crowd_level,
            best_time_today: day.best_window.clone(),
        }
    }
}

/// Seven-day crowd schedule for one attraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyForecast {
    /// One day per weekday, sorted Monday..Sunday
    pub days: Vec<ForecastDay>,
    /// Position of "today" within `days`
    pub today_index: usize,
    /// Projection of `days[today_index]` for card display
    pub today_card: TodayCard,
    /// Not produced by the current pipeline; always empty
    pub special_days: Vec<ForecastDay>,
    /// Provider path or AI-only path
    pub data_source: DataSource,
}

impl WeeklyForecast {
    pub fn today(&self) -> &ForecastDay {
        &self.days[self.today_index]
    }
}

// ============================================================================
// External collaborator traits
// ============================================================================

/// Forecast provider seam
///
/// Implementations return `Ok` for any response the provider actually
/// produced, including `status: "Error"` bodies, so the resolver can
/// classify them. `Err` is reserved for transport-level failures.
#[async_trait::async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Request a weekly forecast for one venue identity
    async fn forecast(&self, query: &ForecastQuery) -> ForecastResult<ProviderResponse>;
}

/// Generative-text seam
///
/// The model is untrusted: `Ok(None)` means it answered with nothing
/// usable, and every `Some` payload is validated by the caller.
#[async_trait::async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model name for logging
    fn name(&self) -> &'static str;

    /// Generate and parse a JSON document
    async fn generate_structured(&self, prompt: &str) -> ForecastResult<Option<serde_json::Value>>;

    /// Generate plain text
    async fn generate_text(&self, prompt: &str) -> ForecastResult<Option<String>>;
}
