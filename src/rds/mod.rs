//! # Route Discovery
//!
//! Synthesis of Envoy route tables (RDS resources) from the mesh model.
//! [`RouteConfigBuilder`] is the entry point: it resolves each requested
//! listener name through the proxy's scope, assembles and deduplicates
//! virtual hosts, merges per-port sets for catch-all listeners, and keeps a
//! fingerprint-keyed cache of serialized tables shared across proxies.

pub mod alt_hosts;
pub mod assemble;
pub mod builder;
pub mod bundles;
pub mod cache;
pub mod dedupe;
pub mod merge;
pub mod util;
pub mod vhost;

pub use alt_hosts::generate_alt_virtual_hosts;
pub use assemble::OutboundRouteAssembler;
pub use builder::{RouteBuildStats, RouteConfigBuilder};
pub use bundles::{build_virtual_host_bundles, VirtualHostBundle};
pub use cache::{CachedRouteEntry, RouteCache, RouteCacheKey, ServiceFingerprint};
pub use dedupe::DedupeState;
pub use merge::merge_all_virtual_hosts;
pub use util::{catch_all_virtual_host, BuiltResource, ROUTE_TYPE_URL};
pub use vhost::build_sidecar_virtual_hosts;
