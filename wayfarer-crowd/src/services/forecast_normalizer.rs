//! Raw provider day → canonical forecast day
//!
//! Normalization stops one step short of [`ForecastDay`]: the reason text
//! comes from a single batched model call over the whole week, so each day
//! is first produced as a [`DayDraft`] and finished once the batch returns.

use crate::services::{HourlyContext, HourlySeriesCompleter, WindowFinder};
use crate::types::{DataSource, ForecastDay, HourlyEntry, RawDayForecast};
use tracing::debug;

/// A normalized day awaiting its reason text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayDraft {
    pub weekday_index: u8,
    pub day_label: String,
    pub is_open: bool,
    pub open_hour: Option<u8>,
    pub close_hour: Option<u8>,
    pub aggregate_crowd_level: u8,
    pub best_window: String,
    pub hourly_series: Vec<HourlyEntry>,
    pub data_source: DataSource,
    /// Provider hints, kept for reason text
    pub quiet_hours: Vec<u8>,
    pub busy_hours: Vec<u8>,
}

impl DayDraft {
    /// Attach the reason text, producing the immutable day record
    pub fn finish(self, reason_text: String) -> ForecastDay {
        ForecastDay {
            weekday_index: self.weekday_index,
            day_label: self.day_label,
            is_open: self.is_open,
            open_hour: self.open_hour,
            close_hour: self.close_hour,
            aggregate_crowd_level: self.aggregate_crowd_level,
            best_window: self.best_window,
            reason_text,
            hourly_series: self.hourly_series,
            data_source: self.data_source,
        }
    }
}

/// Rounded mean of the series values (half away from zero), 0 when empty
pub fn aggregate_level(series: &[HourlyEntry]) -> u8 {
    if series.is_empty() {
        return 0;
    }
    let total: u32 = series.iter().map(|e| u32::from(e.value)).sum();
    let mean = f64::from(total) / series.len() as f64;
    mean.round().clamp(0.0, 100.0) as u8
}

/// Open interval spanned by a completed series (close exclusive)
pub fn series_interval(series: &[HourlyEntry]) -> (Option<u8>, Option<u8>) {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) => (Some(first.hour_of_day()), Some(last.hour_of_day() + 1)),
        _ => (None, None),
    }
}

pub struct ForecastNormalizer {
    windows: WindowFinder,
    completer: HourlySeriesCompleter,
}

impl ForecastNormalizer {
    pub fn new(windows: WindowFinder, completer: HourlySeriesCompleter) -> Self {
        Self { windows, completer }
    }

    /// Normalize one validated provider day
    ///
    /// A day whose every reading is "closed" stays closed with an empty
    /// series. A day without readings is assumed open and gets its series
    /// from the fallback tiers; its hours are then taken from that series.
    pub async fn normalize(
        &self,
        raw: &RawDayForecast,
        venue_name: &str,
        venue_address: &str,
    ) -> DayDraft {
        if raw.is_reported_closed() {
            debug!(day = %raw.day_label, "Provider reports venue closed all day");
            return DayDraft {
                weekday_index: raw.weekday_index,
                day_label: raw.day_label.clone(),
                is_open: false,
                open_hour: None,
                close_hour: None,
                aggregate_crowd_level: 0,
                best_window: self.windows.best_window(&raw.quiet_hours, &[], None),
                hourly_series: Vec::new(),
                data_source: DataSource::Provider,
                quiet_hours: raw.quiet_hours.clone(),
                busy_hours: raw.busy_hours.clone(),
            };
        }

        let ctx = HourlyContext {
            venue_name,
            venue_address,
            day_label: &raw.day_label,
            weekday_index: raw.weekday_index,
            open_hour: raw.open_hour,
            close_hour: raw.close_hour,
            intensities: &raw.hour_intensities,
        };
        let completed = self.completer.complete(&ctx).await;

        let (open_hour, close_hour) = match (raw.open_hour, raw.close_hour) {
            (Some(open), Some(close)) => (Some(open), Some(close)),
            _ => series_interval(&completed.series),
        };

        DayDraft {
            weekday_index: raw.weekday_index,
            day_label: raw.day_label.clone(),
            is_open: !completed.series.is_empty(),
            open_hour,
            close_hour,
            aggregate_crowd_level: aggregate_level(&completed.series),
            best_window: self
                .windows
                .best_window(&raw.quiet_hours, &completed.series, close_hour),
            hourly_series: completed.series,
            data_source: completed.source,
            quiet_hours: raw.quiet_hours.clone(),
            busy_hours: raw.busy_hours.clone(),
        }
    }
}
