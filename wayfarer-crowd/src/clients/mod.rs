//! HTTP clients for the external collaborators

pub mod besttime_client;
pub mod gemini_client;

pub use besttime_client::BestTimeClient;
pub use gemini_client::GeminiClient;
