//! Proxy identity model.

use std::sync::Arc;

use envoy_types::pb::envoy::config::route::v3::VirtualHost;

use crate::model::sidecar::SidecarScope;

/// Role of a connected proxy, governing which route assembly path applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
    /// Workload sidecar: inbound/outbound assembly with synthesized empty
    /// tables for unresolvable listener names
    Sidecar,
    /// Edge gateway: unresolvable listener names are omitted from the output
    Router,
}

impl ProxyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Sidecar => "sidecar",
            ProxyType::Router => "router",
        }
    }
}

/// Proxy metadata that feeds the assembly fingerprint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyMetadata {
    /// Data-plane version string reported by the proxy
    pub version: String,
    /// Cluster the proxy runs in; selects per-cluster service addresses
    pub cluster_id: String,
    /// Whether the proxy captures DNS traffic
    pub dns_capture: bool,
    /// Whether addresses are auto-allocated for DNS-captured services
    pub dns_auto_allocate: bool,
}

/// A connected data-plane proxy as seen by route synthesis
#[derive(Debug, Clone)]
pub struct Proxy {
    /// Unique proxy identifier, used in diagnostics
    pub id: String,
    pub proxy_type: ProxyType,
    /// The proxy's local DNS search domain, e.g. `team-a.svc.cluster.local`;
    /// drives alternate short-form hostname generation
    pub dns_domain: String,
    pub metadata: ProxyMetadata,
    /// Reachability scope resolved for this proxy by the config store
    pub sidecar_scope: Arc<SidecarScope>,
    /// Shared catch-all template appended to non-sniffed route tables.
    /// Immutable; per-listener variants are produced by clone-then-modify.
    pub catch_all_virtual_host: VirtualHost,
}
