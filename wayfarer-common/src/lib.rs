//! # Wayfarer Common Library
//!
//! Shared code for the Wayfarer travel-content services including:
//! - Common error type
//! - Configuration loading (TOML file + environment)
//! - Timestamp and timezone utilities

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
