//! Shared utilities for whyis
//!
//! This crate provides common functionality used across the whyis workspace:
//! tracing setup and the process-level application settings.

pub mod config;
pub mod logging;

pub use config::Config;
pub use logging::{LogFormat, init_tracing};
