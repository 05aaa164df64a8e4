//! Crowd scale mapping
//!
//! Converts provider intensity codes (-2..2 plus a "closed" sentinel) and
//! 0-100 percentages into the canonical crowd scales. All functions are
//! total: out-of-range input is clamped, never rejected.

use crate::config::DEFAULT_CLOSED_INTENSITY;

/// Labels for the 0-5 crowd buckets
const CROWD_LABELS: [&str; 6] = [
    "0 closed/empty",
    "1 very light",
    "2 light",
    "3 moderate",
    "4 busy",
    "5 peak",
];

/// Maps provider intensity codes onto canonical scales
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleMapper {
    closed_code: i64,
}

impl Default for ScaleMapper {
    fn default() -> Self {
        Self::new(DEFAULT_CLOSED_INTENSITY)
    }
}

impl ScaleMapper {
    pub fn new(closed_code: i64) -> Self {
        Self { closed_code }
    }

    pub fn closed_code(&self) -> i64 {
        self.closed_code
    }

    pub fn is_closed(&self, intensity_code: i64) -> bool {
        intensity_code == self.closed_code
    }

    /// Intensity code → 0-5 bucket (closed → 0)
    pub fn intensity_to_bucket(&self, intensity_code: i64) -> u8 {
        if self.is_closed(intensity_code) {
            return 0;
        }
        intensity_code.saturating_add(2).clamp(0, 5) as u8
    }

    /// Intensity code → 0-100 crowd value
    ///
    /// Closed hours have no meaningful crowd value and yield `None` so the
    /// caller leaves them out of the series.
    pub fn intensity_to_percentage(&self, intensity_code: i64) -> Option<u8> {
        if self.is_closed(intensity_code) {
            return None;
        }
        Some(intensity_code.saturating_add(2).saturating_mul(20).clamp(0, 100) as u8)
    }
}

/// 0-100 crowd value → labeled 0-5 bucket
pub fn percentage_to_label(value: u8) -> &'static str {
    let bucket = (f64::from(value) / 20.0).round().clamp(0.0, 5.0) as usize;
    CROWD_LABELS[bucket]
}
