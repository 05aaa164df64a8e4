//! Crowd-forecast aggregation services
//!
//! Leaves first:
//! - [`scale_mapper`]: intensity codes / percentages → canonical scales
//! - [`window_finder`]: best visiting window
//! - [`name_matcher`]: venue name verification with bounded memo
//! - [`venue_resolver`]: candidate identities → provider forecast
//! - [`hourly_completer`]: provider → generated → synthetic hourly series
//! - [`forecast_normalizer`]: raw provider day → canonical day draft
//! - [`reason_batcher`]: one model call for all seven reason texts
//! - [`today_selector`]: timezone-aware "today"
//! - [`ai_week_generator`]: AI-only week when the provider chain aborts
//! - [`forecast_orchestrator`]: the state machine tying it together

pub mod ai_week_generator;
pub mod forecast_normalizer;
pub mod forecast_orchestrator;
pub mod hourly_completer;
pub mod name_matcher;
pub mod reason_batcher;
pub mod scale_mapper;
pub mod today_selector;
pub mod venue_resolver;
pub mod window_finder;

pub use ai_week_generator::AiWeekGenerator;
pub use forecast_normalizer::{DayDraft, ForecastNormalizer};
pub use forecast_orchestrator::ForecastOrchestrator;
pub use hourly_completer::{CompletedSeries, HourlyContext, HourlySeriesCompleter, HourlySource};
pub use name_matcher::{NameMatchCache, NameMatcher};
pub use reason_batcher::ReasonTextBatcher;
pub use scale_mapper::{percentage_to_label, ScaleMapper};
pub use today_selector::select_today;
pub use venue_resolver::{Resolution, VenueResolver};
pub use window_finder::WindowFinder;

use crate::error::{ForecastError, ForecastResult};
use std::future::Future;
use std::time::Duration;

/// Run an external call with a bounded wait
///
/// Elapsed time becomes [`ForecastError::Timeout`], which every caller
/// treats as a soft failure.
pub(crate) async fn bounded<T, F>(limit: Duration, what: &str, call: F) -> ForecastResult<T>
where
    F: Future<Output = ForecastResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ForecastError::Timeout(format!(
            "{} exceeded {}s",
            what,
            limit.as_secs_f32()
        ))),
    }
}
