//! Content-addressable route-table cache.
//!
//! Assembled, serialized route tables are cached under a fingerprint of every
//! input that influences the output. Entries are never explicitly
//! invalidated: fingerprint equality is the sole validity test, so any input
//! drift produces a different key and a fresh assembly. The cache is the
//! only state shared across concurrently assembling proxies.

use std::sync::Arc;

use dashmap::DashMap;

use crate::model::{Proxy, Resolution, Service, ServiceProvider};
use crate::model::service::Protocol;
use crate::observability::metrics;
use crate::rds::util::BuiltResource;

/// Hashable summary of one in-scope service, taken from its single-port
/// narrowed copy
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServiceFingerprint {
    pub hostname: String,
    pub namespace: String,
    pub address: String,
    pub resolution: Resolution,
    pub provider: ServiceProvider,
    pub mesh_external: bool,
    pub ports: Vec<(u16, Protocol)>,
}

impl From<&Service> for ServiceFingerprint {
    fn from(service: &Service) -> Self {
        Self {
            hostname: service.hostname.clone(),
            namespace: service.attributes.namespace.clone(),
            address: service.default_address.clone(),
            resolution: service.resolution,
            provider: service.attributes.provider,
            mesh_external: service.mesh_external,
            ports: service.ports.iter().map(|p| (p.port, p.protocol)).collect(),
        }
    }
}

/// Fingerprint of all inputs influencing one listener-port assembly. Two
/// assemblies with equal fingerprints are interchangeable. Only built for
/// concrete ports (>0); port-0/http-proxy/UDS tables are never cached.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RouteCacheKey {
    pub route_name: String,
    pub proxy_version: String,
    pub cluster_id: String,
    pub dns_domain: String,
    pub dns_capture: bool,
    pub dns_auto_allocate: bool,
    pub listener_port: u16,
    /// In-scope services sorted by hostname
    pub services: Vec<ServiceFingerprint>,
    /// Config keys of in-scope routing rules, in scope order
    pub virtual_services: Vec<String>,
    /// Config keys of delegate rules bound by the in-scope rules
    pub delegate_virtual_services: Vec<String>,
    /// Keys of operator patches applicable to the proxy
    pub patch_keys: Vec<String>,
}

impl RouteCacheKey {
    /// Assemble the fingerprint for one concrete listener port. `services`
    /// must already be sorted by hostname.
    pub fn new(
        route_name: &str,
        proxy: &Proxy,
        listener_port: u16,
        services: Vec<ServiceFingerprint>,
        virtual_services: Vec<String>,
        delegate_virtual_services: Vec<String>,
        patch_keys: Vec<String>,
    ) -> Self {
        Self {
            route_name: route_name.to_string(),
            proxy_version: proxy.metadata.version.clone(),
            cluster_id: proxy.metadata.cluster_id.clone(),
            dns_domain: proxy.dns_domain.clone(),
            dns_capture: proxy.metadata.dns_capture,
            dns_auto_allocate: proxy.metadata.dns_auto_allocate,
            listener_port,
            services,
            virtual_services,
            delegate_virtual_services,
            patch_keys,
        }
    }
}

/// A cached, serialized route table together with the push generation it was
/// computed under
#[derive(Debug)]
pub struct CachedRouteEntry {
    pub push_generation: u64,
    pub resource: BuiltResource,
}

/// Concurrent fingerprint-keyed cache of serialized route tables
#[derive(Debug, Default)]
pub struct RouteCache {
    entries: DashMap<RouteCacheKey, Arc<CachedRouteEntry>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previously assembled resource. A missing key is never an
    /// error; it simply triggers fresh assembly.
    pub fn get(&self, key: Option<&RouteCacheKey>) -> Option<Arc<CachedRouteEntry>> {
        let key = key?;
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Store an assembled resource. An entry from a newer push generation
    /// replaces an older one; an older write never clobbers newer data.
    pub fn add(&self, key: RouteCacheKey, push_generation: u64, resource: BuiltResource) {
        use dashmap::mapref::entry::Entry;
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().push_generation <= push_generation {
                    occupied.insert(Arc::new(CachedRouteEntry { push_generation, resource }));
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(CachedRouteEntry { push_generation, resource }));
            }
        }
        metrics::update_cache_entries(self.entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
        metrics::update_cache_entries(0);
    }
}
