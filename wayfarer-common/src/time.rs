//! Timestamp and timezone utilities

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Resolve an IANA timezone name, falling back to UTC
///
/// Unknown or absent names are not an error: crowd data is still useful
/// with a UTC notion of "today".
pub fn resolve_timezone(name: Option<&str>) -> Tz {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(timezone = %name, "Unknown timezone, falling back to UTC");
            Tz::UTC
        }),
        None => Tz::UTC,
    }
}

/// Convert a UTC instant to wall-clock time in `tz`
pub fn local_time(now: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    now.with_timezone(&tz)
}

/// Weekday index of `now` in `tz` (Monday = 0 … Sunday = 6)
pub fn local_weekday_index(now: DateTime<Utc>, tz: Tz) -> u8 {
    local_time(now, tz).weekday().num_days_from_monday() as u8
}
