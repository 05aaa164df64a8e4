//! Hourly crowd series completion
//!
//! Ordered strategy chain, evaluated left to right with short-circuit on
//! the first non-empty result:
//!
//! 1. [`ProviderHourly`]: provider intensities mapped to 0-100
//! 2. [`GeneratedHourly`]: model-generated series, schema-validated
//! 3. [`synthesize`]: parabola peaking mid-day; cannot fail
//!
//! Step 3 is not part of the chain but the terminal case of
//! [`HourlySeriesCompleter::complete`], so the cascade always terminates
//! with a non-empty series.

use crate::services::{bounded, ScaleMapper};
use crate::types::{DataSource, GenerativeModel, HourIntensity, HourlyEntry};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Opening hour assumed when a day's hours are unknown
pub const DEFAULT_OPEN_HOUR: u8 = 9;
/// Closing hour assumed when a day's hours are unknown
pub const DEFAULT_CLOSE_HOUR: u8 = 18;

/// Weekend crowds relative to weekdays in the synthetic series
const WEEKEND_MULTIPLIER: f64 = 1.25;
const SYNTHETIC_FLOOR: i64 = 20;
const SYNTHETIC_CEILING: i64 = 90;

/// Everything a strategy may need to produce one day's series
#[derive(Debug, Clone)]
pub struct HourlyContext<'a> {
    pub venue_name: &'a str,
    pub venue_address: &'a str,
    pub day_label: &'a str,
    pub weekday_index: u8,
    pub open_hour: Option<u8>,
    pub close_hour: Option<u8>,
    pub intensities: &'a [HourIntensity],
}

impl HourlyContext<'_> {
    pub fn is_weekend(&self) -> bool {
        self.weekday_index >= 5
    }

    /// Open interval, defaulting to 09:00-18:00 when unknown or empty
    pub fn hours_or_default(&self) -> (u8, u8) {
        match (self.open_hour, self.close_hour) {
            (Some(open), Some(close)) if open < close => (open, close),
            _ => (DEFAULT_OPEN_HOUR, DEFAULT_CLOSE_HOUR),
        }
    }
}

/// Completed series with the tier that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSeries {
    pub series: Vec<HourlyEntry>,
    pub source: DataSource,
}

/// One tier of the completion chain
#[async_trait]
pub trait HourlySource: Send + Sync {
    /// Tier name for logging
    fn name(&self) -> &'static str;

    /// Provenance tag for series this tier produces
    fn source(&self) -> DataSource;

    /// Produce a series, or `None` to fall through to the next tier
    async fn attempt(&self, ctx: &HourlyContext<'_>) -> Option<Vec<HourlyEntry>>;
}

/// Tier 1: provider intensities
pub struct ProviderHourly {
    mapper: ScaleMapper,
}

impl ProviderHourly {
    pub fn new(mapper: ScaleMapper) -> Self {
        Self { mapper }
    }

    /// Map readings to 0-100, dropping closed hours
    pub fn build(&self, intensities: &[HourIntensity]) -> Vec<HourlyEntry> {
        intensities
            .iter()
            .filter_map(|reading| {
                self.mapper
                    .intensity_to_percentage(reading.intensity)
                    .map(|value| HourlyEntry::at_hour(reading.hour, value))
            })
            .collect()
    }
}

#[async_trait]
impl HourlySource for ProviderHourly {
    fn name(&self) -> &'static str {
        "provider"
    }

    fn source(&self) -> DataSource {
        DataSource::Provider
    }

    async fn attempt(&self, ctx: &HourlyContext<'_>) -> Option<Vec<HourlyEntry>> {
        let series = self.build(ctx.intensities);
        (!series.is_empty()).then_some(series)
    }
}

/// Tier 2: model-generated series
pub struct GeneratedHourly {
    model: Arc<dyn GenerativeModel>,
    timeout: Duration,
}

impl GeneratedHourly {
    pub fn new(model: Arc<dyn GenerativeModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    fn prompt(ctx: &HourlyContext<'_>, open: u8, close: u8) -> String {
        let day_type = if ctx.is_weekend() { "weekend" } else { "weekday" };
        let pattern_hint = if ctx.is_weekend() {
            "Weekend days are typically 20-40% busier than weekdays"
        } else {
            "Weekday patterns are more predictable"
        };

        format!(
            r#"You are a travel expert. Generate realistic hourly crowd level data for this attraction on a typical {day_type} {day}:

Attraction: {name}
Address: {address}
Operating Hours: {open:02}:00 - {close:02}:00
Day Type: {day_type}

Generate a JSON array with hourly crowd levels for each hour the attraction is open:

[
  {{"hour": "{open:02}:00", "value": 35}},
  ... (continue for each hour until closing)
]

Guidelines:
- Include only hours between {open:02}:00 and {close:02}:00
- Crowd values: 0-20=Very Quiet, 21-40=Quiet, 41-60=Moderate, 61-80=Busy, 81-100=Extremely Busy
- Use realistic numeric values (e.g., 35, 72, 88) not just multiples of 20
- Typical pattern: quieter at opening, peak around midday, quieter before closing
- {pattern_hint}
- Return ONLY the JSON array, no other text"#,
            day = ctx.day_label,
            name = ctx.venue_name,
            address = ctx.venue_address,
        )
    }
}

#[async_trait]
impl HourlySource for GeneratedHourly {
    fn name(&self) -> &'static str {
        "generated"
    }

    fn source(&self) -> DataSource {
        DataSource::Generated
    }

    async fn attempt(&self, ctx: &HourlyContext<'_>) -> Option<Vec<HourlyEntry>> {
        let (open, close) = ctx.hours_or_default();
        let prompt = Self::prompt(ctx, open, close);

        let payload = match bounded(
            self.timeout,
            "hourly generation",
            self.model.generate_structured(&prompt),
        )
        .await
        {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                warn!(day = %ctx.day_label, "Model returned no hourly data");
                return None;
            }
            Err(e) => {
                warn!(day = %ctx.day_label, error = %e, "Hourly generation failed");
                return None;
            }
        };

        let series = validate_generated_series(&payload, open, close);
        if series.is_empty() {
            warn!(day = %ctx.day_label, "No valid hourly entries in generated data");
            return None;
        }
        Some(series)
    }
}

/// Validation boundary for model-generated hourly data
///
/// Accepts a bare array or an object wrapping one under
/// `hourly_crowd_levels`/`hourly`. Entries need a well-formed `HH:MM`
/// `hour` and an integral `value` in 0-100; anything else is dropped.
/// Surviving entries are restricted to `[open, close)`, sorted, and
/// deduplicated so the series is strictly increasing.
pub fn validate_generated_series(payload: &Value, open: u8, close: u8) -> Vec<HourlyEntry> {
    let entries = match payload {
        Value::Array(entries) => entries,
        Value::Object(map) => match map
            .get("hourly_crowd_levels")
            .or_else(|| map.get("hourly"))
        {
            Some(Value::Array(entries)) => entries,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    let mut series: Vec<HourlyEntry> = entries
        .iter()
        .filter_map(|entry| {
            let hour = entry.get("hour")?.as_str()?;
            let value = integral_value(entry.get("value")?)?;
            let parsed = HourlyEntry::parse(hour, value);
            if parsed.is_none() {
                debug!(entry = %entry, "Skipping invalid hourly entry");
            }
            parsed
        })
        .filter(|entry| {
            let hour = entry.hour_of_day();
            open <= hour && hour < close
        })
        .collect();

    series.sort_by_key(HourlyEntry::clock);
    series.dedup_by_key(|entry| entry.clock());
    series
}

fn integral_value(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    let v = value.as_f64()?;
    (v.fract() == 0.0).then_some(v as i64)
}

/// Tier 3: symmetric parabola over `[open, close)`
///
/// `value = 100 * (1 - (2x - 1)^2)` with `x` the hour's position in the
/// open interval, boosted on weekends, clamped to 20-90.
pub fn synthesize(open: u8, close: u8, is_weekend: bool) -> Vec<HourlyEntry> {
    let (open, close) = if open < close {
        (open, close)
    } else {
        (DEFAULT_OPEN_HOUR, DEFAULT_CLOSE_HOUR)
    };
    let day_length = f64::from(close - open);

    (open..close.min(24))
        .map(|hour| {
            let x = f64::from(hour - open) / day_length;
            let mut base = 100.0 * (1.0 - (2.0 * x - 1.0).powi(2));
            if is_weekend {
                base *= WEEKEND_MULTIPLIER;
            }
            let value = (base as i64).clamp(SYNTHETIC_FLOOR, SYNTHETIC_CEILING);
            HourlyEntry::at_hour(hour, value as u8)
        })
        .collect()
}

/// Ordered completion chain with a synthetic terminal case
pub struct HourlySeriesCompleter {
    chain: Vec<Box<dyn HourlySource>>,
}

impl HourlySeriesCompleter {
    /// Chain from explicit tiers (synthetic is always appended implicitly)
    pub fn new(chain: Vec<Box<dyn HourlySource>>) -> Self {
        Self { chain }
    }

    /// provider → generated → synthetic
    pub fn for_provider_days(
        mapper: ScaleMapper,
        model: Arc<dyn GenerativeModel>,
        timeout: Duration,
    ) -> Self {
        Self::new(vec![
            Box::new(ProviderHourly::new(mapper)),
            Box::new(GeneratedHourly::new(model, timeout)),
        ])
    }

    /// generated → synthetic (no provider data exists on the AI-only path)
    pub fn for_generated_days(model: Arc<dyn GenerativeModel>, timeout: Duration) -> Self {
        Self::new(vec![Box::new(GeneratedHourly::new(model, timeout))])
    }

    /// Complete one day's series; never empty
    pub async fn complete(&self, ctx: &HourlyContext<'_>) -> CompletedSeries {
        for tier in &self.chain {
            if let Some(series) = tier.attempt(ctx).await {
                if tier.source() != DataSource::Provider {
                    info!(
                        day = %ctx.day_label,
                        tier = tier.name(),
                        points = series.len(),
                        "Hourly data filled by fallback tier"
                    );
                }
                return CompletedSeries {
                    series,
                    source: tier.source(),
                };
            }
            debug!(day = %ctx.day_label, tier = tier.name(), "Hourly tier produced nothing");
        }

        let (open, close) = ctx.hours_or_default();
        warn!(day = %ctx.day_label, "Generating synthetic hourly data");
        CompletedSeries {
            series: synthesize(open, close, ctx.is_weekend()),
            source: DataSource::Synthetic,
        }
    }
}
