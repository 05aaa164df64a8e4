//! Timezone-aware "today" selection
//!
//! `now` and the timezone are always injected; nothing here reads the
//! process clock.

use crate::types::ForecastDay;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;
use wayfarer_common::time::local_weekday_index;

/// Index into `days` of the day matching `now`'s weekday in `tz`
///
/// First match wins; falls back to 0 when no day matches. `None` only for
/// an empty slice.
pub fn select_today(days: &[ForecastDay], now: DateTime<Utc>, tz: Tz) -> Option<usize> {
    if days.is_empty() {
        return None;
    }

    let weekday = local_weekday_index(now, tz);
    match days.iter().position(|day| day.weekday_index == weekday) {
        Some(index) => Some(index),
        None => {
            warn!(weekday, timezone = %tz, "No forecast day matches today, using first day");
            Some(0)
        }
    }
}
