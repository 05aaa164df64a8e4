//! Test Helper Utilities
//!
//! Shared fakes, fixtures and log capture for wayfarer-crowd integration tests

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;
pub mod log_capture;

pub use fakes::{FakeModel, FakeProvider};
pub use log_capture::{capture_logs, LogCapture};
