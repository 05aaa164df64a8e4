//! Crowd forecast aggregation workflow
//!
//! State machine per attraction:
//! START → RESOLVING → NORMALIZING → BATCHING_REASONS → SELECTING_TODAY → DONE
//!
//! with the failure branch RESOLVING → AI_FALLBACK_FULL_WEEK → DONE when the
//! provider chain aborts or its payload holds no usable day. Total
//! exhaustion is reported as `None`, never as an error.

use crate::clients::{BestTimeClient, GeminiClient};
use crate::config::{CrowdConfig, ForecastSettings};
use crate::error::ForecastResult;
use crate::services::{
    select_today, AiWeekGenerator, ForecastNormalizer, HourlySeriesCompleter, NameMatchCache,
    NameMatcher, ReasonTextBatcher, Resolution, ScaleMapper, VenueResolver, WindowFinder,
};
use crate::types::{
    AttractionIdentity, DataSource, ForecastDay, ForecastProvider, GenerativeModel,
    ProviderResponse, RawDayForecast, TodayCard, WeeklyForecast,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wayfarer_common::time::resolve_timezone;

/// Aggregation workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationState {
    Start,
    Resolving,
    Normalizing,
    BatchingReasons,
    SelectingToday,
    AiFallbackFullWeek,
    Done,
}

/// One aggregation run, tracked for logging
struct AggregationRun<'a> {
    venue: &'a str,
    state: AggregationState,
}

impl<'a> AggregationRun<'a> {
    fn new(venue: &'a str) -> Self {
        Self {
            venue,
            state: AggregationState::Start,
        }
    }

    fn transition_to(&mut self, new_state: AggregationState) {
        debug!(venue = %self.venue, from = ?self.state, to = ?new_state, "Aggregation state transition");
        self.state = new_state;
    }
}

pub struct ForecastOrchestrator {
    resolver: VenueResolver,
    normalizer: ForecastNormalizer,
    batcher: ReasonTextBatcher,
    ai_week: AiWeekGenerator,
    closed_intensity: i64,
}

impl ForecastOrchestrator {
    /// Wire the engine around the given collaborators
    pub fn new(
        provider: Arc<dyn ForecastProvider>,
        model: Arc<dyn GenerativeModel>,
        settings: &ForecastSettings,
    ) -> Self {
        let cache = Arc::new(NameMatchCache::new(settings.name_match_cache_capacity));
        Self::with_name_cache(provider, model, settings, cache)
    }

    /// Like [`Self::new`], sharing an existing name-match cache
    pub fn with_name_cache(
        provider: Arc<dyn ForecastProvider>,
        model: Arc<dyn GenerativeModel>,
        settings: &ForecastSettings,
        cache: Arc<NameMatchCache>,
    ) -> Self {
        let windows = WindowFinder::new(settings.window_hours, settings.closing_hour_default);
        let mapper = ScaleMapper::new(settings.closed_intensity);

        let mut resolver = VenueResolver::new(provider, settings.provider_timeout);
        if settings.verify_venue_names {
            resolver = resolver.with_name_verification(NameMatcher::new(
                model.clone(),
                cache,
                settings.name_match_threshold,
                settings.gemini_timeout,
            ));
        }

        Self {
            resolver,
            normalizer: ForecastNormalizer::new(
                windows,
                HourlySeriesCompleter::for_provider_days(
                    mapper,
                    model.clone(),
                    settings.gemini_timeout,
                ),
            ),
            batcher: ReasonTextBatcher::new(
                model.clone(),
                settings.gemini_timeout,
                settings.morning_threshold_hour,
            ),
            ai_week: AiWeekGenerator::new(model, settings.gemini_timeout, windows),
            closed_intensity: settings.closed_intensity,
        }
    }

    /// Build with the real BestTime and Gemini clients
    pub fn from_config(config: &CrowdConfig) -> ForecastResult<Self> {
        let settings = &config.settings;
        let provider = BestTimeClient::new(
            config.besttime_api_key.clone(),
            settings.provider_timeout,
            settings.provider_requests_per_second,
        )?;
        let model = GeminiClient::new(
            config.gemini_api_key.clone(),
            settings.gemini_model.clone(),
            settings.gemini_timeout,
        )?;
        Ok(Self::new(Arc::new(provider), Arc::new(model), settings))
    }

    /// Aggregate a weekly forecast at the current instant
    pub async fn aggregate_now(
        &self,
        attraction: &AttractionIdentity,
        timezone: Option<&str>,
    ) -> Option<WeeklyForecast> {
        self.aggregate(attraction, timezone, wayfarer_common::time::now())
            .await
    }

    /// Aggregate a weekly forecast for `attraction` as seen at `now`
    ///
    /// `timezone` is the attraction's IANA zone; unknown or absent zones
    /// fall back to UTC.
    pub async fn aggregate(
        &self,
        attraction: &AttractionIdentity,
        timezone: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<WeeklyForecast> {
        let tz = resolve_timezone(timezone);
        let mut run = AggregationRun::new(&attraction.primary_name);

        run.transition_to(AggregationState::Resolving);
        let days = match self.resolver.resolve(attraction).await {
            Resolution::Resolved { query, response } => {
                match self
                    .provider_week(&mut run, &query.venue_name, &query.venue_address, &response)
                    .await
                {
                    Some(days) => Some((days, DataSource::Provider)),
                    None => {
                        warn!(
                            venue = %attraction.primary_name,
                            "Provider analysis held no usable day, using AI fallback"
                        );
                        self.ai_fallback(&mut run, attraction, now, tz).await
                    }
                }
            }
            Resolution::Aborted { attempts } => {
                warn!(
                    venue = %attraction.primary_name,
                    attempts = attempts.len(),
                    "Forecast provider returned no data, using AI fallback"
                );
                self.ai_fallback(&mut run, attraction, now, tz).await
            }
        };

        let Some((days, data_source)) = days else {
            run.transition_to(AggregationState::Done);
            warn!(venue = %attraction.primary_name, "No forecast available");
            return None;
        };

        run.transition_to(AggregationState::SelectingToday);
        let today_index = select_today(&days, now, tz)?;
        let today_card = TodayCard::project(&days[today_index], now, tz);

        run.transition_to(AggregationState::Done);
        info!(
            venue = %attraction.primary_name,
            source = %data_source,
            today = %days[today_index].day_label,
            "Crowd forecast aggregated"
        );

        Some(WeeklyForecast {
            days,
            today_index,
            today_card,
            special_days: Vec::new(),
            data_source,
        })
    }

    /// Provider payload → seven finished days, or `None` if no day is usable
    async fn provider_week(
        &self,
        run: &mut AggregationRun<'_>,
        venue_name: &str,
        venue_address: &str,
        response: &ProviderResponse,
    ) -> Option<Vec<ForecastDay>> {
        run.transition_to(AggregationState::Normalizing);
        let raw_days = self.week_of_raw_days(response)?;

        let mut drafts = Vec::with_capacity(raw_days.len());
        for raw in &raw_days {
            drafts.push(self.normalizer.normalize(raw, venue_name, venue_address).await);
        }

        run.transition_to(AggregationState::BatchingReasons);
        let reasons = self.batcher.reasons(venue_name, &drafts).await;

        Some(
            drafts
                .into_iter()
                .zip(reasons)
                .map(|(draft, reason)| draft.finish(reason))
                .collect(),
        )
    }

    /// Validate the analysis into exactly seven days, Monday first
    ///
    /// Duplicate weekdays keep the first occurrence. Weekdays the provider
    /// did not report become placeholders that the fallback tiers fill.
    fn week_of_raw_days(&self, response: &ProviderResponse) -> Option<Vec<RawDayForecast>> {
        let mut week: [Option<RawDayForecast>; 7] = Default::default();
        let mut valid = 0usize;

        for day in response.days() {
            let Some(raw) = RawDayForecast::from_provider(&day, self.closed_intensity) else {
                warn!(day_info = ?day.day_info, "Skipping forecast day without day_int");
                continue;
            };
            let slot = &mut week[raw.weekday_index as usize];
            if slot.is_none() {
                *slot = Some(raw);
                valid += 1;
            } else {
                debug!(weekday = raw.weekday_index, "Ignoring duplicate forecast day");
            }
        }

        if valid == 0 {
            return None;
        }
        if valid < 7 {
            info!(reported = valid, "Provider analysis is missing weekdays, filling them");
        }

        Some(
            week.into_iter()
                .enumerate()
                .map(|(index, day)| day.unwrap_or_else(|| RawDayForecast::unreported(index as u8)))
                .collect(),
        )
    }

    async fn ai_fallback(
        &self,
        run: &mut AggregationRun<'_>,
        attraction: &AttractionIdentity,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Option<(Vec<ForecastDay>, DataSource)> {
        run.transition_to(AggregationState::AiFallbackFullWeek);
        let venue_name = attraction.primary_name.trim();
        let venue_address = attraction.display_address();
        self.ai_week
            .generate(venue_name, &venue_address, now, tz)
            .await
            .map(|days| (days, DataSource::Generated))
    }
}
