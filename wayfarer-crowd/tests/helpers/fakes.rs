//! In-memory stand-ins for the forecast provider and the generative model

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use wayfarer_crowd::error::{ForecastError, ForecastResult};
use wayfarer_crowd::types::{ForecastProvider, ForecastQuery, GenerativeModel, ProviderResponse};

type ProviderFn = dyn Fn(&ForecastQuery) -> ForecastResult<ProviderResponse> + Send + Sync;
type PromptFn<T> = dyn Fn(&str) -> Option<T> + Send + Sync;

/// Scripted forecast provider that records every query
pub struct FakeProvider {
    respond: Box<ProviderFn>,
    queries: Mutex<Vec<ForecastQuery>>,
}

impl FakeProvider {
    pub fn new(
        respond: impl Fn(&ForecastQuery) -> ForecastResult<ProviderResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Same response for every query
    pub fn always(response: Value) -> Self {
        Self::new(move |_| Ok(serde_json::from_value(response.clone()).unwrap()))
    }

    /// Every candidate is unknown to the provider
    pub fn venue_not_found() -> Self {
        Self::always(serde_json::json!({
            "status": "Error",
            "message": "Could not find venue XYZ"
        }))
    }

    /// Every request fails at the transport level
    pub fn unreachable() -> Self {
        Self::new(|_| Err(ForecastError::Network("connection refused".to_string())))
    }

    pub fn queries(&self) -> Vec<ForecastQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ForecastProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake-provider"
    }

    async fn forecast(&self, query: &ForecastQuery) -> ForecastResult<ProviderResponse> {
        self.queries.lock().unwrap().push(query.clone());
        (self.respond)(query)
    }
}

/// Scripted generative model with call counters
pub struct FakeModel {
    structured: Box<PromptFn<Value>>,
    text: Box<PromptFn<String>>,
    structured_calls: AtomicUsize,
    text_calls: AtomicUsize,
}

impl FakeModel {
    pub fn new(
        structured: impl Fn(&str) -> Option<Value> + Send + Sync + 'static,
        text: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            structured: Box::new(structured),
            text: Box::new(text),
            structured_calls: AtomicUsize::new(0),
            text_calls: AtomicUsize::new(0),
        }
    }

    /// Answers nothing, ever
    pub fn silent() -> Self {
        Self::new(|_| None, |_| None)
    }

    /// Plain-text replies only, with a fixed reply
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(|_| None, move |_| Some(text.clone()))
    }

    pub fn structured_calls(&self) -> usize {
        self.structured_calls.load(Ordering::SeqCst)
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for FakeModel {
    fn name(&self) -> &'static str {
        "fake-model"
    }

    async fn generate_structured(&self, prompt: &str) -> ForecastResult<Option<Value>> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.structured)(prompt))
    }

    async fn generate_text(&self, prompt: &str) -> ForecastResult<Option<String>> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.text)(prompt))
    }
}
