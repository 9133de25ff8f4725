//! # Observability
//!
//! Structured logging and Prometheus metrics for route synthesis.

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, LoggingConfig};
pub use metrics::{init_prometheus, register_metrics};
