//! BestTime forecast API client
//!
//! `POST {base}/forecasts` with the venue identity as query parameters.
//! Requests share one process-wide rate limiter.

use crate::error::{ForecastError, ForecastResult};
use crate::types::{ForecastProvider, ForecastQuery, ProviderResponse};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

pub const BESTTIME_BASE_URL: &str = "https://besttime.app/api/v1";
const USER_AGENT: &str = concat!("wayfarer-crowd/", env!("CARGO_PKG_VERSION"));

/// Longest response body echoed into logs and errors
pub(crate) const LOG_BODY_LIMIT: usize = 500;

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct BestTimeClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: DirectRateLimiter,
}

impl BestTimeClient {
    pub fn new(
        api_key: Option<String>,
        timeout: Duration,
        requests_per_second: u32,
    ) -> ForecastResult<Self> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        if api_key.is_none() {
            warn!("BestTime client created without API key; forecasts will be unavailable");
        }

        Ok(Self {
            http_client,
            base_url: BESTTIME_BASE_URL.to_string(),
            api_key,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ForecastProvider for BestTimeClient {
    fn name(&self) -> &'static str {
        "BestTime"
    }

    async fn forecast(&self, query: &ForecastQuery) -> ForecastResult<ProviderResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ForecastError::NotConfigured("BestTime API key missing".to_string()))?;

        self.rate_limiter.until_ready().await;

        debug!(
            venue_name = %query.venue_name,
            venue_address = %query.venue_address,
            "Querying BestTime forecasts"
        );

        let response = self
            .http_client
            .post(format!("{}/forecasts", self.base_url))
            .query(&[
                ("api_key_private", api_key),
                ("venue_name", query.venue_name.as_str()),
                ("venue_address", query.venue_address.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|e| ForecastError::Parse(format!("BestTime response: {}", e)));
        }

        // BestTime reports unknown venues as HTTP errors with a regular body
        match serde_json::from_str::<ProviderResponse>(&body) {
            Ok(parsed) if !parsed.status.is_empty() => {
                debug!(status = status.as_u16(), message = ?parsed.message, "BestTime error body");
                Ok(parsed)
            }
            _ => {
                let message = truncate(&body, LOG_BODY_LIMIT);
                warn!(status = status.as_u16(), body = %message, "BestTime request failed");
                Err(ForecastError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

/// First `limit` characters of `text`
pub(crate) fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
