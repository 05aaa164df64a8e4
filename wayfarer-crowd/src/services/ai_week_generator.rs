//! AI-only week generation
//!
//! Used when every provider candidate fails. Opening hours come from one
//! structured model call (09:00-18:00 when it yields nothing). Each of the
//! seven days then gets its own best-time call plus an hourly series from
//! the generated → synthetic completer, so a silent model still produces a
//! complete week.

use crate::services::forecast_normalizer::aggregate_level;
use crate::services::reason_batcher::MAX_REASON_CHARS;
use crate::services::{bounded, HourlyContext, HourlySeriesCompleter, WindowFinder};
use crate::types::{
    parse_clock, DataSource, ForecastDay, GenerativeModel, HourlyEntry, WEEKDAY_NAMES,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use wayfarer_common::time::local_weekday_index;

const DEFAULT_OPENING: (u8, u8) = (9, 0);
const DEFAULT_CLOSING: (u8, u8) = (18, 0);

/// Opening hours for every generated day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedHours {
    pub open_hour: u8,
    pub close_hour: u8,
}

impl Default for GeneratedHours {
    fn default() -> Self {
        Self {
            open_hour: DEFAULT_OPENING.0,
            close_hour: DEFAULT_CLOSING.0,
        }
    }
}

impl GeneratedHours {
    /// Read `opening_time`/`closing_time`, defaulting malformed fields
    ///
    /// An interval that does not close after it opens is replaced by the
    /// defaults as a whole.
    pub fn from_payload(payload: &Value) -> Self {
        let clock = |field: &str, default: (u8, u8)| {
            payload
                .get(field)
                .and_then(Value::as_str)
                .and_then(parse_clock)
                .unwrap_or(default)
        };
        let (open_hour, _) = clock("opening_time", DEFAULT_OPENING);
        let (close_hour, _) = clock("closing_time", DEFAULT_CLOSING);

        if open_hour < close_hour {
            Self { open_hour, close_hour }
        } else {
            warn!(
                open_hour,
                close_hour,
                "Generated opening hours are not a valid interval, using defaults"
            );
            Self::default()
        }
    }
}

/// Best window and reason for one generated day
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedDayDetails {
    /// `None` when the model gave no usable window
    pub window: Option<String>,
    pub reason: Option<String>,
}

impl GeneratedDayDetails {
    pub fn from_payload(payload: &Value) -> Self {
        let clock = |field: &str| payload.get(field).and_then(Value::as_str).and_then(parse_clock);
        let window = match (clock("best_time_start"), clock("best_time_end")) {
            (Some((sh, sm)), Some((eh, em))) => {
                Some(format!("{:02}:{:02} - {:02}:{:02}", sh, sm, eh, em))
            }
            _ => None,
        };
        let reason = payload
            .get("reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(|r| r.chars().take(MAX_REASON_CHARS).collect());

        Self { window, reason }
    }
}

pub struct AiWeekGenerator {
    model: Arc<dyn GenerativeModel>,
    timeout: Duration,
    windows: WindowFinder,
    completer: HourlySeriesCompleter,
}

impl AiWeekGenerator {
    pub fn new(model: Arc<dyn GenerativeModel>, timeout: Duration, windows: WindowFinder) -> Self {
        Self {
            completer: HourlySeriesCompleter::for_generated_days(model.clone(), timeout),
            model,
            timeout,
            windows,
        }
    }

    /// Generate a full week, sorted Monday..Sunday
    ///
    /// `None` only when there is no venue name to generate for.
    pub async fn generate(
        &self,
        venue_name: &str,
        venue_address: &str,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Option<Vec<ForecastDay>> {
        let venue_name = venue_name.trim();
        if venue_name.is_empty() {
            error!("Cannot generate a forecast for an unnamed venue");
            return None;
        }

        let hours = self.opening_hours(venue_name, venue_address).await;
        info!(
            venue = %venue_name,
            open_hour = hours.open_hour,
            close_hour = hours.close_hour,
            "Generating AI-only week"
        );

        let today = local_weekday_index(now, tz);
        let mut days = Vec::with_capacity(7);
        for offset in 0..7u8 {
            let weekday_index = (today + offset) % 7;
            days.push(
                self.generate_day(venue_name, venue_address, weekday_index, hours)
                    .await,
            );
        }

        days.sort_by_key(|day| day.weekday_index);
        Some(days)
    }

    async fn opening_hours(&self, venue_name: &str, venue_address: &str) -> GeneratedHours {
        let prompt = format!(
            r#"You are a travel expert. Generate typical opening and closing times for this attraction:

Attraction: {venue_name}
Address: {venue_address}

Generate a JSON response with:
{{
  "opening_time": "HH:MM" (typical opening time, e.g., "09:00"),
  "closing_time": "HH:MM" (typical closing time, e.g., "18:00")
}}

Return ONLY the JSON."#
        );

        match bounded(self.timeout, "opening hours", self.model.generate_structured(&prompt)).await {
            Ok(Some(payload)) if payload.is_object() => GeneratedHours::from_payload(&payload),
            Ok(_) => {
                warn!(venue = %venue_name, "Model returned no opening hours, assuming defaults");
                GeneratedHours::default()
            }
            Err(e) => {
                warn!(
                    venue = %venue_name,
                    error = %e,
                    "Opening hours generation failed, assuming defaults"
                );
                GeneratedHours::default()
            }
        }
    }

    async fn generate_day(
        &self,
        venue_name: &str,
        venue_address: &str,
        weekday_index: u8,
        hours: GeneratedHours,
    ) -> ForecastDay {
        let day_label = WEEKDAY_NAMES[weekday_index as usize];
        let details = self
            .day_details(venue_name, venue_address, day_label, weekday_index >= 5, hours)
            .await;

        let ctx = HourlyContext {
            venue_name,
            venue_address,
            day_label,
            weekday_index,
            open_hour: Some(hours.open_hour),
            close_hour: Some(hours.close_hour),
            intensities: &[],
        };
        let completed = self.completer.complete(&ctx).await;
        debug!(day = %day_label, source = %completed.source, "Generated day hourly series");

        let series: Vec<HourlyEntry> = completed.series;
        let best_window = details
            .window
            .unwrap_or_else(|| self.windows.best_window(&[], &series, Some(hours.close_hour)));
        let reason_text = details.reason.unwrap_or_else(|| {
            format!("Visit {} during quieter hours for the best experience.", venue_name)
        });

        ForecastDay {
            weekday_index,
            day_label: day_label.to_string(),
            is_open: !series.is_empty(),
            open_hour: Some(hours.open_hour),
            close_hour: Some(hours.close_hour),
            aggregate_crowd_level: aggregate_level(&series),
            best_window,
            reason_text,
            hourly_series: series,
            data_source: DataSource::Generated,
        }
    }

    async fn day_details(
        &self,
        venue_name: &str,
        venue_address: &str,
        day_label: &str,
        is_weekend: bool,
        hours: GeneratedHours,
    ) -> GeneratedDayDetails {
        let day_type = if is_weekend { "weekend" } else { "weekday" };
        let prompt = format!(
            r#"You are a travel expert. Generate the best time to visit this attraction on a {day_label} and explain why.

Attraction: {venue_name}
Address: {venue_address}
Day: {day_label}
Day Type: {day_type}
Operating Hours: {open:02}:00 - {close:02}:00

Generate a JSON response with:
{{
  "best_time_start": "HH:MM" (best time to arrive, e.g., "09:00"),
  "best_time_end": "HH:MM" (best time window end, e.g., "11:00"),
  "reason": "1-2 sentences explaining why this is the best time on {day_label}"
}}

Consider that {day_label} is a {day_type} and adjust accordingly.
Return ONLY the JSON."#,
            open = hours.open_hour,
            close = hours.close_hour,
        );

        match bounded(self.timeout, "day details", self.model.generate_structured(&prompt)).await {
            Ok(Some(payload)) => GeneratedDayDetails::from_payload(&payload),
            Ok(None) => {
                warn!(venue = %venue_name, day = %day_label, "Model returned no day details");
                GeneratedDayDetails::default()
            }
            Err(e) => {
                warn!(
                    venue = %venue_name,
                    day = %day_label,
                    error = %e,
                    "Day details generation failed"
                );
                GeneratedDayDetails::default()
            }
        }
    }
}
