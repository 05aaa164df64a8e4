//! Gemini generateContent client
//!
//! Model output is untrusted. Text is pulled from the first candidate;
//! structured output additionally has Markdown code fences stripped and
//! must parse as JSON, otherwise the call yields `None`.

use crate::clients::besttime_client::{truncate, LOG_BODY_LIMIT};
use crate::error::{ForecastError, ForecastResult};
use crate::types::GenerativeModel;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, warn};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";

pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> ForecastResult<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;

        if api_key.is_none() {
            warn!("Gemini client created without API key; generation will be unavailable");
        }

        Ok(Self {
            http_client,
            base_url: GEMINI_BASE_URL.to_string(),
            model: model.into(),
            api_key,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn generate(&self, prompt: &str) -> ForecastResult<Option<String>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ForecastError::NotConfigured("Gemini API key missing".to_string()))?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let payload = json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        debug!(model = %self.model, prompt_chars = prompt.len(), "Calling Gemini");

        let response = self
            .http_client
            .post(url)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = truncate(&body, LOG_BODY_LIMIT);
            error!(status = status.as_u16(), body = %message, "Gemini HTTP error");
            return Err(ForecastError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let data: Value = response.json().await?;
        let text = extract_candidate_text(&data);
        if text.is_none() {
            warn!(
                response = %truncate(&data.to_string(), LOG_BODY_LIMIT),
                "Gemini response has no candidate text"
            );
        }
        Ok(text)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn generate_structured(&self, prompt: &str) -> ForecastResult<Option<Value>> {
        let Some(text) = self.generate(prompt).await? else {
            return Ok(None);
        };

        match serde_json::from_str(strip_code_fence(&text)) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(
                    error = %e,
                    text = %truncate(&text, LOG_BODY_LIMIT),
                    "Gemini output is not valid JSON"
                );
                Ok(None)
            }
        }
    }

    async fn generate_text(&self, prompt: &str) -> ForecastResult<Option<String>> {
        Ok(self
            .generate(prompt)
            .await?
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }
}

/// Concatenated text parts of the first candidate
pub fn extract_candidate_text(data: &Value) -> Option<String> {
    let parts = data
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

/// Remove a surrounding ```json / ``` fence
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
