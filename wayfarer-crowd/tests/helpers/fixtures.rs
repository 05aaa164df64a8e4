//! Provider payloads and fixed instants

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use wayfarer_crowd::types::WEEKDAY_NAMES;
use wayfarer_crowd::AttractionIdentity;

/// Wednesday 2024-01-03 11:30 UTC (12:30 in Paris)
pub fn wednesday_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 3, 11, 30, 0).unwrap()
}

pub fn louvre() -> AttractionIdentity {
    AttractionIdentity::new("Louvre")
        .with_resolved_name("Musée du Louvre")
        .with_address("Rue de Rivoli, 75001 Paris")
        .with_city("Paris")
}

/// One provider day: closed at 08:00 and 18:00, open 09:00-17:00
pub fn provider_day(day_int: usize) -> Value {
    let codes = [999, -2, -1, 0, 1, 2, 2, 1, 0, -1, 999];
    let hours: Vec<Value> = codes
        .iter()
        .enumerate()
        .map(|(i, code)| json!({"hour": 8 + i, "intensity_nr": code}))
        .collect();
    json!({
        "day_info": {"day_int": day_int, "day_text": WEEKDAY_NAMES[day_int]},
        "hour_analysis": hours,
        "busy_hours": [13, 14],
        "quiet_hours": [9]
    })
}

/// Successful provider response built from `days`
pub fn provider_week(days: Vec<Value>) -> Value {
    json!({
        "status": "OK",
        "venue_info": {"venue_name": "Louvre Museum"},
        "analysis": days
    })
}

pub fn full_provider_week() -> Value {
    provider_week((0..7).map(provider_day).collect())
}

/// Model-shaped hourly array covering `[open, close)`
pub fn generated_hourly(open: u8, close: u8) -> Value {
    Value::Array(
        (open..close)
            .map(|h| json!({"hour": format!("{:02}:00", h), "value": 30 + (h - open) * 5}))
            .collect(),
    )
}
