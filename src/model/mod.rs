//! # Mesh Model
//!
//! In-memory model of the mesh configuration route synthesis operates on:
//! proxies, services, routing rules, per-proxy scope, and the push snapshot.
//! All inputs are already resolved and consistent for the push in progress;
//! nothing here performs I/O.

pub mod proxy;
pub mod push;
pub mod service;
pub mod sidecar;
pub mod virtual_service;

pub use proxy::{Proxy, ProxyMetadata, ProxyType};
pub use push::{
    GatewayRouteSource, NoopPatcher, PatchContext, PushContext, PushMetric, RoutePatcher,
    DUPLICATED_DOMAINS,
};
pub use service::{
    Protocol, Resolution, Service, ServiceAttributes, ServiceInstance, ServicePort,
    ServiceProvider, UNSPECIFIED_IP,
};
pub use sidecar::{EgressListener, SidecarPort, SidecarScope};
pub use virtual_service::{host_matches, select_virtual_services, VirtualService};

/// Listener name marking the explicit HTTP proxy route table
pub const RDS_HTTP_PROXY: &str = "http_proxy";

/// Listener-name prefix for Unix-domain-socket listeners
pub const UNIX_ADDRESS_PREFIX: &str = "unix://";

/// Parsed identity of one requested route table.
///
/// Listener names arrive as bare ports (`"8080"`), `host:port` sniffing keys
/// (`"reviews.team-a.svc.cluster.local:9080"`), the HTTP-proxy marker, or
/// Unix-socket paths. The variant governs which services and rules are in
/// scope and whether sniffing narrowing applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerKey {
    /// A concrete listener port
    Port(u16),
    /// A protocol-sniffed `host:port` listener
    Sniffed { host: String, port: u16 },
    /// The proxy-forwarding (HTTP proxy) listener
    HttpProxy,
    /// A Unix-domain-socket listener, carrying the full `unix://` name
    UnixSocket(String),
}

impl ListenerKey {
    /// Parse a requested listener name. Sniffing keys are only recognized
    /// when outbound protocol sniffing is enabled; a name that fits no shape
    /// yields `None` and the caller treats it as unresolvable.
    pub fn parse(route_name: &str, sniffing_enabled: bool) -> Option<Self> {
        if route_name == RDS_HTTP_PROXY {
            return Some(ListenerKey::HttpProxy);
        }
        if route_name.starts_with(UNIX_ADDRESS_PREFIX) {
            return Some(ListenerKey::UnixSocket(route_name.to_string()));
        }
        if sniffing_enabled {
            if let Some(idx) = route_name.rfind(':') {
                let port = route_name[idx + 1..].parse().ok()?;
                return Some(ListenerKey::Sniffed { host: route_name[..idx].to_string(), port });
            }
        }
        route_name.parse::<u16>().ok().map(ListenerKey::Port)
    }

    /// The listener port; 0 for the catch-all/http-proxy/UDS cases
    pub fn port(&self) -> u16 {
        match self {
            ListenerKey::Port(port) => *port,
            ListenerKey::Sniffed { port, .. } => *port,
            ListenerKey::HttpProxy | ListenerKey::UnixSocket(_) => 0,
        }
    }

    pub fn is_sniffed(&self) -> bool {
        matches!(self, ListenerKey::Sniffed { .. })
    }
}
