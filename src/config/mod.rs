//! # Configuration Management
//!
//! Feature flags governing route synthesis. Every flag defaults to the
//! production behavior; `from_env` overrides individual flags from
//! `ROUTEPLANE_*` environment variables.

use serde::Deserialize;

use crate::{Error, Result};

/// Route synthesis configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RdsConfig {
    /// Cache assembled route tables across pushes, keyed by fingerprint
    pub enable_caching: bool,
    /// Generate host-narrowed route tables for protocol-sniffed outbound
    /// listeners (`host:port` listener names)
    pub enable_outbound_sniffing: bool,
    /// Fail fast on control-plane invariant violations instead of degrading,
    /// and recompute cache hits to cross-check cached output
    pub strict_assertions: bool,
    /// Route unmatched outbound traffic to the passthrough cluster; when
    /// false, unmatched traffic receives a 502 direct response
    pub allow_any_outbound: bool,
}

impl Default for RdsConfig {
    fn default() -> Self {
        Self {
            enable_caching: true,
            enable_outbound_sniffing: true,
            strict_assertions: false,
            allow_any_outbound: true,
        }
    }
}

impl RdsConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            enable_caching: bool_from_env("ROUTEPLANE_ENABLE_RDS_CACHING", defaults.enable_caching)?,
            enable_outbound_sniffing: bool_from_env(
                "ROUTEPLANE_ENABLE_OUTBOUND_SNIFFING",
                defaults.enable_outbound_sniffing,
            )?,
            strict_assertions: bool_from_env(
                "ROUTEPLANE_STRICT_ASSERTIONS",
                defaults.strict_assertions,
            )?,
            allow_any_outbound: bool_from_env(
                "ROUTEPLANE_ALLOW_ANY_OUTBOUND",
                defaults.allow_any_outbound,
            )?,
        })
    }
}

fn bool_from_env(var: &str, default: bool) -> Result<bool> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| Error::config(format!("Invalid boolean for {}: {}", var, value))),
        Err(_) => Ok(default),
    }
}
