//! End-to-end aggregation tests
//!
//! Drives `ForecastOrchestrator` against in-memory provider/model fakes:
//! - Full provider week
//! - Provider abort → AI-only week
//! - Provider week with a day missing hourly data
//! - Provider abort with a silent model (fully synthetic)

mod helpers;

use helpers::fixtures::{
    full_provider_week, generated_hourly, louvre, provider_day, provider_week, wednesday_noon,
};
use helpers::{capture_logs, FakeModel, FakeProvider};
use serde_json::json;
use std::sync::Arc;
use wayfarer_crowd::types::{parse_clock, ResolutionStrategy};
use wayfarer_crowd::{
    AttractionIdentity, DataSource, ForecastOrchestrator, ForecastSettings, WeeklyForecast,
};

fn orchestrator(provider: &Arc<FakeProvider>, model: &Arc<FakeModel>) -> ForecastOrchestrator {
    ForecastOrchestrator::new(provider.clone(), model.clone(), &ForecastSettings::default())
}

/// Structural invariants every produced week must hold
fn assert_consistent(forecast: &WeeklyForecast) {
    assert_eq!(forecast.days.len(), 7);
    assert!(forecast.special_days.is_empty());

    for (index, day) in forecast.days.iter().enumerate() {
        assert_eq!(day.weekday_index as usize, index, "days sorted Monday..Sunday");
        assert_eq!(day.is_open, !day.hourly_series.is_empty(), "{}", day.day_label);

        let clocks: Vec<(u8, u8)> = day.hourly_series.iter().map(|e| e.clock()).collect();
        assert!(clocks.windows(2).all(|w| w[0] < w[1]), "{} not increasing", day.day_label);
        assert!(day.hourly_series.iter().all(|e| e.value <= 100));
        if let (Some(open), Some(close)) = (day.open_hour, day.close_hour) {
            assert!(clocks.iter().all(|(h, _)| open <= *h && *h < close));
        }

        let (start, end) = day.best_window.split_once(" - ").expect("window format");
        assert!(parse_clock(start).is_some() && parse_clock(end).is_some());
        assert!(!day.reason_text.is_empty());
    }

    let today = forecast.today();
    assert_eq!(forecast.today_card.is_open_today, today.is_open);
    assert_eq!(forecast.today_card.crowd_level_today, today.aggregate_crowd_level);
    assert_eq!(forecast.today_card.best_time_today, today.best_window);
}

/// Routes structured prompts by what they ask for
fn scripted_generator() -> FakeModel {
    FakeModel::new(
        |prompt| {
            if prompt.contains("opening and closing times") {
                Some(json!({"opening_time": "10:00", "closing_time": "17:00"}))
            } else if prompt.contains("best_time_start") {
                Some(json!({
                    "best_time_start": "10:00",
                    "best_time_end": "12:00",
                    "reason": "Early mornings are calm."
                }))
            } else if prompt.contains("hourly crowd level") {
                Some(generated_hourly(10, 17))
            } else {
                None
            }
        },
        |_| None,
    )
}

// ============================================================================
// Scenario A: full provider week
// ============================================================================

#[tokio::test]
async fn test_full_provider_week() {
    // Given: provider knows the venue and reports all seven days
    let provider = Arc::new(FakeProvider::always(full_provider_week()));
    let reply: Vec<String> = (1..=7).map(|i| format!("Reason for day {i}")).collect();
    let model = Arc::new(FakeModel::replying(&reply.join("\n")));

    // When: aggregating on a Wednesday in Paris
    let forecast = orchestrator(&provider, &model)
        .aggregate(&louvre(), Some("Europe/Paris"), wednesday_noon())
        .await
        .expect("forecast available");

    // Then: every day comes from the provider and today is Wednesday
    assert_consistent(&forecast);
    assert_eq!(forecast.data_source, DataSource::Provider);
    assert!(forecast.days.iter().all(|d| d.data_source == DataSource::Provider));
    assert_eq!(forecast.today().weekday_index, 2);
    assert_eq!(forecast.days[0].reason_text, "Reason for day 1");
    assert_eq!(forecast.days[6].reason_text, "Reason for day 7");

    let monday = &forecast.days[0];
    assert_eq!((monday.open_hour, monday.close_hour), (Some(9), Some(18)));
    assert_eq!(monday.hourly_series.len(), 9);
    assert_eq!(monday.aggregate_crowd_level, 44);
    assert_eq!(monday.best_window, "09:00 - 11:00");

    let card = &forecast.today_card;
    assert!(card.is_open_now);
    assert_eq!(card.today_opening_time.as_deref(), Some("09:00"));
    assert_eq!(card.today_closing_time.as_deref(), Some("18:00"));

    // First candidate resolved; one batched reason call, no structured calls
    let queries = provider.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].strategy, ResolutionStrategy::ResolvedNameAddress);
    assert_eq!(model.text_calls(), 1);
    assert_eq!(model.structured_calls(), 0);
}

#[tokio::test]
async fn test_is_open_now_follows_local_clock() {
    let provider = Arc::new(FakeProvider::always(full_provider_week()));
    let model = Arc::new(FakeModel::silent());

    // 11:30 UTC is 20:30 in Tokyo: same Wednesday, after closing
    let forecast = orchestrator(&provider, &model)
        .aggregate(&louvre(), Some("Asia/Tokyo"), wednesday_noon())
        .await
        .unwrap();

    assert_eq!(forecast.today().weekday_index, 2);
    assert!(forecast.today_card.is_open_today);
    assert!(!forecast.today_card.is_open_now);
}

// ============================================================================
// Scenario B: provider abort → AI-only week
// ============================================================================

#[tokio::test]
async fn test_venue_not_found_switches_to_generated_week() {
    // Given: no candidate is known to the provider
    let provider = Arc::new(FakeProvider::venue_not_found());
    let model = Arc::new(scripted_generator());
    let (logs, _guard) = capture_logs();

    // When
    let forecast = orchestrator(&provider, &model)
        .aggregate(&louvre(), Some("Europe/Paris"), wednesday_noon())
        .await
        .expect("AI fallback produces a week");

    // Then: all four candidates were tried, in order
    let strategies: Vec<_> = provider.queries().iter().map(|q| q.strategy).collect();
    assert_eq!(
        strategies,
        vec![
            ResolutionStrategy::ResolvedNameAddress,
            ResolutionStrategy::ResolvedNameCity,
            ResolutionStrategy::NameAddress,
            ResolutionStrategy::NameCity,
        ]
    );

    // And: the week is generated end to end
    assert_consistent(&forecast);
    assert_eq!(forecast.data_source, DataSource::Generated);
    for day in &forecast.days {
        assert_eq!(day.data_source, DataSource::Generated);
        assert_eq!((day.open_hour, day.close_hour), (Some(10), Some(17)));
        assert_eq!(day.hourly_series.len(), 7);
        assert_eq!(day.best_window, "10:00 - 12:00");
        assert_eq!(day.reason_text, "Early mornings are calm.");
    }
    assert_eq!(forecast.today().weekday_index, 2);
    assert!(forecast.today_card.is_open_now);

    // One opening-hours call, then a details and an hourly call per day
    assert_eq!(model.structured_calls(), 15);
    assert_eq!(model.text_calls(), 0);

    // And: each soft failure was logged with its strategy
    let failures = logs.matching("Resolution candidate failed");
    assert_eq!(failures.len(), 4);
    assert_eq!(failures[0].field("strategy"), Some("resolved_name + address"));
    assert_eq!(failures[3].field("strategy"), Some("name + city_name"));
    logs.assert_contains("All forecast provider candidates failed");
}

#[tokio::test]
async fn test_empty_analysis_switches_to_generated_week() {
    let provider = Arc::new(FakeProvider::always(provider_week(vec![])));
    let model = Arc::new(scripted_generator());

    let forecast = orchestrator(&provider, &model)
        .aggregate(&louvre(), None, wednesday_noon())
        .await
        .unwrap();

    assert_eq!(provider.queries().len(), 1);
    assert_eq!(forecast.data_source, DataSource::Generated);
    assert_consistent(&forecast);
}

#[tokio::test]
async fn test_rejected_venue_name_moves_to_next_candidate() {
    // Given: provider always matches an unrelated venue
    let provider = Arc::new(FakeProvider::always(json!({
        "status": "OK",
        "venue_info": {"venue_name": "Tour Eiffel"},
        "analysis": [provider_day(0)]
    })));
    let model = Arc::new(FakeModel::replying("no"));
    let settings = ForecastSettings {
        verify_venue_names: true,
        ..ForecastSettings::default()
    };
    let orchestrator = ForecastOrchestrator::new(provider.clone(), model.clone(), &settings);

    // When
    let forecast = orchestrator
        .aggregate(&louvre(), None, wednesday_noon())
        .await
        .unwrap();

    // Then: every candidate was rejected and the AI path took over
    assert_eq!(provider.queries().len(), 4);
    assert_eq!(forecast.data_source, DataSource::Generated);
    // Two distinct queried names; the repeat is served from the cache
    assert_eq!(model.text_calls(), 2);
}

#[tokio::test]
async fn test_provider_error_moves_to_next_candidate() {
    // Given: the first candidate hits a non-"not found" error, the second succeeds
    let provider = Arc::new(FakeProvider::new(|query| {
        let body = match query.strategy {
            ResolutionStrategy::ResolvedNameAddress => {
                json!({"status": "Error", "message": "Invalid API key"})
            }
            _ => full_provider_week(),
        };
        Ok(serde_json::from_value(body).unwrap())
    }));
    let model = Arc::new(FakeModel::silent());

    // When
    let forecast = orchestrator(&provider, &model)
        .aggregate(&louvre(), Some("Europe/Paris"), wednesday_noon())
        .await
        .unwrap();

    // Then: the chain kept going and the provider week was used
    let queries = provider.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].strategy, ResolutionStrategy::ResolvedNameAddress);
    assert_eq!(queries[1].strategy, ResolutionStrategy::ResolvedNameCity);
    assert_eq!(forecast.data_source, DataSource::Provider);
    assert!(forecast.days.iter().all(|d| d.data_source == DataSource::Provider));
    assert_consistent(&forecast);
}

// ============================================================================
// Scenario C: one day without hourly data
// ============================================================================

fn week_without_tuesday_hours() -> serde_json::Value {
    provider_week(
        (0..7)
            .map(|d| {
                if d == 1 {
                    json!({"day_info": {"day_int": 1, "day_text": "Tuesday"}, "hour_analysis": []})
                } else {
                    provider_day(d)
                }
            })
            .collect(),
    )
}

#[tokio::test]
async fn test_missing_day_hours_use_synthetic_tier() {
    let provider = Arc::new(FakeProvider::always(week_without_tuesday_hours()));
    let model = Arc::new(FakeModel::silent());

    let forecast = orchestrator(&provider, &model)
        .aggregate(&louvre(), Some("Europe/Paris"), wednesday_noon())
        .await
        .unwrap();

    assert_consistent(&forecast);
    assert_eq!(forecast.data_source, DataSource::Provider);
    for day in &forecast.days {
        let expected = if day.weekday_index == 1 {
            DataSource::Synthetic
        } else {
            DataSource::Provider
        };
        assert_eq!(day.data_source, expected, "{}", day.day_label);
    }

    let tuesday = &forecast.days[1];
    assert!(tuesday.is_open);
    assert_eq!((tuesday.open_hour, tuesday.close_hour), (Some(9), Some(18)));

    // Silent model: deterministic reasons from the provider hints
    assert_eq!(
        forecast.days[0].reason_text,
        "Fewer crowds during morning hours make for a more pleasant visit"
    );
    assert_eq!(
        tuesday.reason_text,
        "Visit during off-peak hours for the best experience"
    );
}

#[tokio::test]
async fn test_missing_day_hours_use_generated_tier() {
    let provider = Arc::new(FakeProvider::always(week_without_tuesday_hours()));
    let model = Arc::new(FakeModel::new(|_| Some(generated_hourly(9, 18)), |_| None));

    let forecast = orchestrator(&provider, &model)
        .aggregate(&louvre(), Some("Europe/Paris"), wednesday_noon())
        .await
        .unwrap();

    assert_consistent(&forecast);
    assert_eq!(forecast.days[1].data_source, DataSource::Generated);
    assert_eq!(forecast.days[1].hourly_series.len(), 9);
    assert_eq!(forecast.days[2].data_source, DataSource::Provider);
    // Only Tuesday needed the model
    assert_eq!(model.structured_calls(), 1);
}

#[tokio::test]
async fn test_partial_week_is_filled() {
    let provider = Arc::new(FakeProvider::always(provider_week(vec![
        provider_day(4),
        provider_day(4),
    ])));
    let model = Arc::new(FakeModel::silent());

    let forecast = orchestrator(&provider, &model)
        .aggregate(&louvre(), None, wednesday_noon())
        .await
        .unwrap();

    assert_consistent(&forecast);
    assert_eq!(forecast.days[4].data_source, DataSource::Provider);
    assert_eq!(forecast.days[0].data_source, DataSource::Synthetic);
    assert_eq!(forecast.days[0].day_label, "Monday");
}

// ============================================================================
// Scenario D: provider abort and a silent model
// ============================================================================

#[tokio::test]
async fn test_everything_fails_falls_through_to_synthetic() {
    let provider = Arc::new(FakeProvider::unreachable());
    let model = Arc::new(FakeModel::silent());

    let forecast = orchestrator(&provider, &model)
        .aggregate(&louvre(), Some("Europe/Paris"), wednesday_noon())
        .await
        .expect("synthetic week is still a forecast");

    assert_consistent(&forecast);
    assert_eq!(forecast.data_source, DataSource::Generated);
    for day in &forecast.days {
        assert!(day.is_open);
        assert_eq!((day.open_hour, day.close_hour), (Some(9), Some(18)));
        assert_eq!(day.best_window, "09:00 - 11:00");
        assert_eq!(
            day.reason_text,
            "Visit Louvre during quieter hours for the best experience."
        );
    }
    assert!(forecast.days[5].aggregate_crowd_level >= forecast.days[0].aggregate_crowd_level);
}

#[tokio::test]
async fn test_unnamed_attraction_has_no_forecast() {
    let provider = Arc::new(FakeProvider::unreachable());
    let model = Arc::new(FakeModel::silent());

    let forecast = orchestrator(&provider, &model)
        .aggregate(&AttractionIdentity::new("  "), None, wednesday_noon())
        .await;

    assert!(forecast.is_none());
    assert!(provider.queries().is_empty());
}
