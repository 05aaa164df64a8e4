//! Venue resolution against the forecast provider
//!
//! Builds the ordered candidate identities for an attraction and queries
//! the provider with each until one succeeds:
//!
//! 1. resolved_name + address
//! 2. resolved_name + city
//! 3. name + address
//! 4. name + city
//!
//! More specific identities go first because they are less likely to
//! collide with unrelated venues. Every failure short of success is soft:
//! the chain always moves on to the next candidate, and exhausting it
//! yields [`Resolution::Aborted`].

use crate::services::{bounded, NameMatcher};
use crate::types::{
    present, AttractionIdentity, ForecastProvider, ForecastQuery, ProviderResponse,
    ResolutionStrategy,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Provider messages that mean "this identity is unknown, try another"
const NOT_FOUND_MARKERS: [&str; 3] = [
    "could not find venue",
    "not does not have enough volume",
    "does not have enough volume",
];

/// Final state of one resolution run
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A candidate produced a successful forecast
    Resolved {
        query: ForecastQuery,
        response: ProviderResponse,
    },
    /// Every candidate failed; caller switches to the AI-only path
    Aborted { attempts: Vec<FailedAttempt> },
}

/// Why one candidate did not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Provider does not know this identity (or has too little data)
    VenueNotFound(String),
    /// Provider answered with some other error
    ProviderError(String),
    /// No response: network failure, timeout, missing key
    Unreachable(String),
    /// Provider matched a different venue than the one asked for
    NameMismatch(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    pub strategy: ResolutionStrategy,
    pub failure: AttemptFailure,
}

/// Classify a provider answer
///
/// `Ok(())` means the response is usable as-is.
pub fn classify_response(response: &ProviderResponse) -> Result<(), AttemptFailure> {
    if response.is_ok() {
        return Ok(());
    }

    let message = response
        .message
        .clone()
        .unwrap_or_else(|| format!("status {:?}", response.status));

    if response.is_error() {
        let lowered = message.to_lowercase();
        if NOT_FOUND_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            return Err(AttemptFailure::VenueNotFound(message));
        }
    }
    Err(AttemptFailure::ProviderError(message))
}

/// Build the ordered candidate list, skipping ones whose fields are absent
pub fn build_candidates(attraction: &AttractionIdentity) -> Vec<ForecastQuery> {
    let name = attraction.primary_name.trim();
    let resolved = present(&attraction.resolved_name);
    let address = present(&attraction.address);
    let city_address = present(&attraction.city_name).map(|city| format!("{}, {}", name, city));

    let mut candidates = Vec::with_capacity(4);
    let mut push = |venue_name: &str, venue_address: &str, strategy| {
        candidates.push(ForecastQuery {
            venue_name: venue_name.to_string(),
            venue_address: venue_address.to_string(),
            strategy,
        })
    };

    if let (Some(resolved), Some(address)) = (resolved, address) {
        push(resolved, address, ResolutionStrategy::ResolvedNameAddress);
    }
    if let (Some(resolved), Some(city_address)) = (resolved, city_address.as_deref()) {
        push(resolved, city_address, ResolutionStrategy::ResolvedNameCity);
    }
    if let Some(address) = address {
        if !name.is_empty() {
            push(name, address, ResolutionStrategy::NameAddress);
        }
    }
    if let Some(city_address) = city_address.as_deref() {
        if !name.is_empty() {
            push(name, city_address, ResolutionStrategy::NameCity);
        }
    }

    candidates
}

/// Sequential candidate chain against the forecast provider
pub struct VenueResolver {
    provider: Arc<dyn ForecastProvider>,
    timeout: Duration,
    verifier: Option<NameMatcher>,
}

impl VenueResolver {
    pub fn new(provider: Arc<dyn ForecastProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            verifier: None,
        }
    }

    /// Reject successful responses whose venue name does not match the query
    pub fn with_name_verification(mut self, matcher: NameMatcher) -> Self {
        self.verifier = Some(matcher);
        self
    }

    /// Run the candidate chain for one attraction
    pub async fn resolve(&self, attraction: &AttractionIdentity) -> Resolution {
        let candidates = build_candidates(attraction);
        if candidates.is_empty() {
            warn!(
                venue = %attraction.primary_name,
                "No resolution candidates: attraction has neither address nor city"
            );
        }

        let mut attempts = Vec::with_capacity(candidates.len());
        for (index, query) in candidates.into_iter().enumerate() {
            info!(
                venue = %attraction.primary_name,
                attempt = index + 1,
                strategy = %query.strategy,
                venue_name = %query.venue_name,
                venue_address = %query.venue_address,
                "Requesting forecast from {}",
                self.provider.name()
            );

            match self.attempt(&query).await {
                Ok(response) => {
                    info!(
                        venue = %attraction.primary_name,
                        strategy = %query.strategy,
                        "Forecast provider resolved venue"
                    );
                    return Resolution::Resolved { query, response };
                }
                Err(failure) => {
                    warn!(
                        venue = %attraction.primary_name,
                        strategy = %query.strategy,
                        failure = ?failure,
                        "Resolution candidate failed, trying next"
                    );
                    attempts.push(FailedAttempt {
                        strategy: query.strategy,
                        failure,
                    });
                }
            }
        }

        error!(
            venue = %attraction.primary_name,
            attempts = attempts.len(),
            "All forecast provider candidates failed"
        );
        Resolution::Aborted { attempts }
    }

    async fn attempt(&self, query: &ForecastQuery) -> Result<ProviderResponse, AttemptFailure> {
        let response = bounded(self.timeout, "forecast request", self.provider.forecast(query))
            .await
            .map_err(|e| AttemptFailure::Unreachable(e.to_string()))?;

        classify_response(&response)?;

        if let Some(verifier) = &self.verifier {
            let matched = response
                .venue_info
                .as_ref()
                .and_then(|info| info.venue_name.as_deref());
            if let Some(matched) = matched {
                if !verifier.matches(&query.venue_name, matched).await {
                    return Err(AttemptFailure::NameMismatch(matched.to_string()));
                }
            }
        }

        Ok(response)
    }
}
