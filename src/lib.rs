//! # Routeplane
//!
//! Routeplane is the route-configuration synthesis engine of a service-mesh
//! control plane: it converts a proxy's reachability policy (which services it
//! may reach, which routing rules apply, what ports it listens on) into
//! concrete Envoy `RouteConfiguration` resources that a data-plane proxy
//! consumes to dispatch incoming requests.
//!
//! ## Architecture
//!
//! ```text
//! RouteConfigBuilder → OutboundRouteAssembler → scope resolver
//!         ↓                      ↓
//!    RouteCache      VirtualHostSynthesizer / PortMerger
//!                               ↓
//!                  DomainDeduper / AltHostGenerator
//! ```
//!
//! ## Core Components
//!
//! - **RouteConfigBuilder**: per-proxy entry point dispatching sidecar and
//!   gateway route assembly for a list of listener names
//! - **OutboundRouteAssembler**: builds one listener's virtual-host set from
//!   the services and routing rules in scope
//! - **RouteCache**: fingerprint-keyed cache of serialized route tables,
//!   shared across concurrently assembling proxies
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use routeplane::{RdsConfig, RouteCache, RouteConfigBuilder};
//! use std::sync::Arc;
//!
//! let config = RdsConfig::from_env()?;
//! let cache = Arc::new(RouteCache::new());
//! let builder = RouteConfigBuilder::new(&config, &cache);
//! let (resources, stats) = builder.build_route_configs(&proxy, &push, &route_names)?;
//! ```

pub mod config;
pub mod errors;
pub mod model;
pub mod observability;
pub mod rds;

// Re-export commonly used types and traits
pub use config::RdsConfig;
pub use errors::{Error, Result};
pub use rds::{RouteCache, RouteConfigBuilder};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "routeplane");
    }
}
