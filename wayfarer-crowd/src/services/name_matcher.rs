//! Venue name verification
//!
//! Decides whether the venue a provider matched is the venue we asked for.
//! Cheap string similarity first; the generative model only arbitrates
//! below the threshold, and its verdicts are memoized in a bounded cache
//! shared by every request of the process.

use crate::services::bounded;
use crate::types::GenerativeModel;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Bounded memo of model verdicts keyed by normalized name pair
///
/// Oldest entries are evicted first once `capacity` is reached.
pub struct NameMatchCache {
    capacity: usize,
    inner: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    verdicts: HashMap<(String, String), bool>,
    order: VecDeque<(String, String)>,
}

impl NameMatchCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(CacheState::default()),
        }
    }

    pub async fn get(&self, key: &(String, String)) -> Option<bool> {
        self.inner.lock().await.verdicts.get(key).copied()
    }

    pub async fn insert(&self, key: (String, String), verdict: bool) {
        let mut state = self.inner.lock().await;
        if state.verdicts.insert(key.clone(), verdict).is_none() {
            state.order.push_back(key);
        }
        while state.order.len() > self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.verdicts.remove(&oldest);
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.verdicts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// NFKD without accents, lowercase, non-alphanumerics to spaces, collapsed whitespace
pub fn normalize_name(name: &str) -> String {
    let spaced: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fuzzy + model-arbitrated venue name matcher
pub struct NameMatcher {
    model: Arc<dyn GenerativeModel>,
    cache: Arc<NameMatchCache>,
    threshold: f64,
    timeout: Duration,
}

impl NameMatcher {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        cache: Arc<NameMatchCache>,
        threshold: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            cache,
            threshold: threshold.clamp(0.0, 1.0),
            timeout,
        }
    }

    /// Do `target` and `candidate` name the same place?
    pub async fn matches(&self, target: &str, candidate: &str) -> bool {
        let nt = normalize_name(target);
        let nc = normalize_name(candidate);
        if nt.is_empty() || nc.is_empty() {
            return false;
        }

        let similarity = strsim::normalized_levenshtein(&nt, &nc);
        if similarity >= self.threshold {
            debug!(queried = %target, candidate = %candidate, similarity, "Venue names match");
            return true;
        }

        let key = (nt, nc);
        if let Some(verdict) = self.cache.get(&key).await {
            debug!(queried = %target, candidate = %candidate, verdict, "Name match cache hit");
            return verdict;
        }

        info!(
            queried = %target,
            candidate = %candidate,
            similarity,
            threshold = self.threshold,
            "Fuzzy match below threshold, asking model"
        );
        let verdict = self.ask_model(target, candidate).await;
        self.cache.insert(key, verdict).await;
        verdict
    }

    async fn ask_model(&self, target: &str, candidate: &str) -> bool {
        let prompt = format!(
            "Determine if these two venue names refer to the same place. \
             Names: '{}' and '{}'. Answer with only 'yes' or 'no'.",
            target, candidate
        );

        match bounded(self.timeout, "name match", self.model.generate_text(&prompt)).await {
            Ok(Some(answer)) => answer.trim().to_lowercase().starts_with("yes"),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Model name matching failed, treating as no match");
                false
            }
        }
    }
}
