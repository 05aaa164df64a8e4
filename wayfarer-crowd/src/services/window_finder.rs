//! Best visiting window selection
//!
//! Picks the recommended low-crowd window for one day:
//! 1. First provider "quiet hour", if any
//! 2. Else the hour with the lowest crowd value (earliest wins ties)
//! 3. Degenerate series: single entry + 2h, or a fixed default
//!
//! Never fails; always returns `"HH:MM - HH:MM"`.

use crate::types::{format_hour, HourlyEntry};

/// Window returned when there is nothing to choose from
pub const DEFAULT_WINDOW: &str = "09:00 - 11:00";

/// Span used for a single-entry series
const SINGLE_ENTRY_SPAN_HOURS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFinder {
    width_hours: u8,
    fallback_closing_hour: u8,
}

impl WindowFinder {
    pub fn new(width_hours: u8, fallback_closing_hour: u8) -> Self {
        Self {
            width_hours: width_hours.max(1),
            fallback_closing_hour,
        }
    }

    /// Choose the best window
    ///
    /// `quiet_hours` must be sorted ascending. `closing_hour` is the day's
    /// exclusive close, if known.
    pub fn best_window(
        &self,
        quiet_hours: &[u8],
        hourly_series: &[HourlyEntry],
        closing_hour: Option<u8>,
    ) -> String {
        if let Some(&start) = quiet_hours.first() {
            return self.window_from(start, closing_hour);
        }

        match hourly_series {
            [] => DEFAULT_WINDOW.to_string(),
            [only] => {
                let start = only.hour_of_day();
                format!(
                    "{} - {}",
                    only.hour,
                    format_hour((start + SINGLE_ENTRY_SPAN_HOURS) % 24)
                )
            }
            series => {
                // min_by_key keeps the first minimum: earliest hour wins ties
                let quietest = series
                    .iter()
                    .min_by_key(|entry| (entry.value, entry.clock()))
                    .map(HourlyEntry::hour_of_day)
                    .unwrap_or(0);
                self.window_from(quietest, closing_hour)
            }
        }
    }

    fn window_from(&self, start: u8, closing_hour: Option<u8>) -> String {
        // End is capped at closing even when the start already lies past it
        let limit = closing_hour.unwrap_or(self.fallback_closing_hour);
        let end = start.saturating_add(self.width_hours).min(limit);
        format!("{} - {}", format_hour(start), format_hour(end % 24))
    }
}
