//! # Structured Logging
//!
//! Tracing subscriber initialization for the routeplane library. Route
//! synthesis emits structured events (`debug!`/`warn!` with fields) on the
//! `routeplane` targets; embedding control planes that install their own
//! subscriber can skip this module entirely.

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Env-filter directive string, e.g. `info` or `routeplane=debug`
    pub level: String,
    /// Emit JSON log lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

/// Initialize the global tracing subscriber.
///
/// Returns an error when the filter directive is malformed or a subscriber
/// is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| Error::config(format!("Invalid log filter '{}': {}", config.level, e)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json { builder.json().try_init() } else { builder.try_init() };

    result.map_err(|e| Error::config(format!("Failed to initialize tracing: {}", e)))
}
