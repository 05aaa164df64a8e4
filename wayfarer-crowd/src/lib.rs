//! wayfarer-crowd library interface
//!
//! Crowd-forecast aggregation engine: resolves an attraction to a forecast
//! provider venue, normalizes the weekly payload, completes missing hourly
//! data through the fallback tiers, and selects "today" in the attraction's
//! timezone.

pub mod clients;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use crate::config::{CrowdConfig, ForecastSettings};
pub use crate::error::{ForecastError, ForecastResult};
pub use crate::services::ForecastOrchestrator;
pub use crate::types::{
    AttractionIdentity, DataSource, ForecastDay, ForecastProvider, GenerativeModel, HourlyEntry,
    TodayCard, WeeklyForecast,
};
