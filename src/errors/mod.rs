//! # Error Handling
//!
//! This module provides error handling for the routeplane library.
//! It defines custom error types using `thiserror`.
//!
//! Route assembly itself recovers from anomalies locally (dropped duplicate
//! domains, unresolvable listeners) and never surfaces them as errors; the
//! variants here cover configuration loading, observability bootstrap, and
//! invariant violations raised under strict-assertion mode.

/// Custom result type for routeplane operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the routeplane library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics exporter errors
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Control-plane invariant violations, fatal under strict assertions
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new metrics error
    pub fn metrics<S: Into<String>>(message: S) -> Self {
        Self::Metrics(message.into())
    }

    /// Create a new invariant-violation error
    pub fn invariant<S: Into<String>>(message: S) -> Self {
        Self::Invariant(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }
}
