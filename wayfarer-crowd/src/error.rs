//! Error types for wayfarer-crowd
//!
//! Every variant here is recoverable from the engine's point of view: the
//! fallback chains turn them into "try the next tier" rather than
//! propagating them to the caller.

use thiserror::Error;

/// Error raised by an external collaborator (forecast provider or model)
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Network communication error (connect, TLS, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Call exceeded its bounded wait
    #[error("Timed out: {0}")]
    Timeout(String),

    /// External API answered with a non-success HTTP status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Client has no usable API key
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for ForecastError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ForecastError::Timeout(err.to_string())
        } else if err.is_decode() {
            ForecastError::Parse(err.to_string())
        } else {
            ForecastError::Network(err.to_string())
        }
    }
}

/// Result type for external calls
pub type ForecastResult<T> = Result<T, ForecastError>;
