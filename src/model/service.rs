//! Service registry model.
//!
//! A [`Service`] describes one resolvable mesh destination: a fully-qualified
//! hostname, the ports it exposes, how endpoints are resolved, and which
//! registry supplied it. Route synthesis only reads the attributes that
//! influence virtual-host domains; endpoint/cluster selection lives elsewhere.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::proxy::Proxy;

/// Address placeholder for services without an allocated virtual IP
pub const UNSPECIFIED_IP: &str = "0.0.0.0";

/// Application protocol declared on a service port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Protocol {
    Http,
    Http2,
    Grpc,
    Tcp,
    Tls,
    /// Generic proxy-forwarding listener protocol; forces port-0 assembly
    HttpProxy,
    /// Undeclared protocol, resolved at runtime by protocol sniffing
    Unsupported,
}

impl Protocol {
    /// Parse a protocol name as written in port declarations
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "HTTP" => Protocol::Http,
            "HTTP2" => Protocol::Http2,
            "GRPC" | "GRPC-WEB" => Protocol::Grpc,
            "TCP" => Protocol::Tcp,
            "TLS" | "HTTPS" => Protocol::Tls,
            "HTTP_PROXY" => Protocol::HttpProxy,
            _ => Protocol::Unsupported,
        }
    }

    /// Whether the protocol is explicitly HTTP-based
    pub fn is_http(&self) -> bool {
        matches!(self, Protocol::Http | Protocol::Http2 | Protocol::Grpc)
    }
}

/// Endpoint resolution mode for a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Endpoints are load-balanced by the control plane
    ClientSideLb,
    /// Endpoints resolved through DNS at the proxy
    DnsLb,
    /// Traffic forwarded to the requested address untouched
    Passthrough,
}

/// Registry that supplied a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceProvider {
    /// Platform-native namespaced registry
    Kubernetes,
    /// Operator-supplied external service
    External,
}

/// A single named port exposed by a service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServicePort {
    pub name: String,
    pub port: u16,
    pub protocol: Protocol,
}

/// Registry provenance attributes carried alongside a service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceAttributes {
    pub namespace: String,
    pub provider: ServiceProvider,
}

/// A mesh service as seen by route synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Fully-qualified hostname, e.g. `reviews.team-a.svc.cluster.local`
    pub hostname: String,
    /// Mesh-wide virtual IP, or [`UNSPECIFIED_IP`] when none is allocated
    pub default_address: String,
    /// Per-cluster virtual IP overrides, keyed by cluster id
    #[serde(default)]
    pub cluster_vips: HashMap<String, String>,
    pub ports: Vec<ServicePort>,
    pub resolution: Resolution,
    /// Whether the service lives outside the mesh
    #[serde(default)]
    pub mesh_external: bool,
    pub attributes: ServiceAttributes,
}

impl Service {
    /// Look up a port by number
    pub fn port_by_number(&self, port: u16) -> Option<&ServicePort> {
        self.ports.iter().find(|p| p.port == port)
    }

    /// The address this service resolves to for a specific proxy, preferring
    /// the proxy's cluster-local virtual IP over the mesh-wide default.
    pub fn address_for_proxy(&self, proxy: &Proxy) -> String {
        self.cluster_vips
            .get(&proxy.metadata.cluster_id)
            .cloned()
            .unwrap_or_else(|| self.default_address.clone())
    }

    /// A single-port copy carrying only the address, resolution, and registry
    /// attributes needed downstream. Used when narrowing a listener to a
    /// concrete port so irrelevant port data never leaks into fingerprints.
    pub fn narrowed_to_port(&self, port: &ServicePort, proxy: &Proxy) -> Service {
        Service {
            hostname: self.hostname.clone(),
            default_address: self.address_for_proxy(proxy),
            cluster_vips: HashMap::new(),
            ports: vec![port.clone()],
            resolution: self.resolution,
            mesh_external: self.mesh_external,
            attributes: self.attributes.clone(),
        }
    }
}

/// One service endpoint bound to a specific proxy, used for inbound routes
#[derive(Debug, Clone)]
pub struct ServiceInstance {
    pub service: Arc<Service>,
    pub service_port: ServicePort,
}
