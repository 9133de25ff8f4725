//! Push-scoped context and collaborator seams.
//!
//! A [`PushContext`] represents one consistent snapshot of mesh configuration
//! being pushed to proxies. Route assembly records diagnostics against it and
//! reads the push generation for cache bookkeeping. The patch-application and
//! gateway-assembly collaborators are modeled as traits so the surrounding
//! control plane can plug in its own implementations.

use std::sync::Arc;
use std::sync::Mutex;

use envoy_types::pb::envoy::config::route::v3::RouteConfiguration;
use tracing::debug;

use crate::model::proxy::Proxy;
use crate::model::virtual_service::VirtualService;
use crate::observability::metrics;

/// Diagnostic metric name for domains dropped due to duplication
pub const DUPLICATED_DOMAINS: &str = "duplicated_domains";

/// One diagnostic recorded during a push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMetric {
    pub metric: &'static str,
    /// The colliding key, e.g. a `host:port` virtual-host name
    pub key: String,
    pub proxy_id: String,
    pub message: String,
}

/// One consistent configuration snapshot being pushed to proxies
#[derive(Debug, Default)]
pub struct PushContext {
    /// Monotonic push generation; cache entries record the generation they
    /// were computed under
    pub generation: u64,
    diagnostics: Mutex<Vec<PushMetric>>,
}

impl PushContext {
    pub fn new(generation: u64) -> Self {
        Self { generation, diagnostics: Mutex::new(Vec::new()) }
    }

    /// Record a fire-and-forget diagnostic. Never affects control flow.
    pub fn add_metric(&self, metric: &'static str, key: &str, proxy_id: &str, message: String) {
        debug!(metric, key, proxy = proxy_id, %message, "push diagnostic");
        if metric == DUPLICATED_DOMAINS {
            metrics::record_duplicated_domain(key, proxy_id);
        }
        // Diagnostics never affect control flow; a lock poisoned by a panic
        // elsewhere must not cascade through metric recording.
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(PushMetric { metric, key: key.to_string(), proxy_id: proxy_id.to_string(), message });
    }

    /// Snapshot of diagnostics recorded so far
    pub fn diagnostics(&self) -> Vec<PushMetric> {
        self.diagnostics.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Sorted, deduplicated config keys of delegate rules bound by the given
    /// routing rules; part of the assembly fingerprint.
    pub fn delegate_virtual_service_keys(
        &self,
        virtual_services: &[Arc<VirtualService>],
    ) -> Vec<String> {
        let mut keys: Vec<String> =
            virtual_services.iter().flat_map(|vs| vs.delegates.iter().cloned()).collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

/// Which assembly path a patch or route table belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchContext {
    SidecarInbound,
    SidecarOutbound,
    Gateway,
}

/// Operator patch application, invoked exactly once per assembled route
/// table, after virtual-host assembly and before caching/serialization.
pub trait RoutePatcher: Send + Sync {
    /// Apply applicable patches to a draft route table
    fn apply(
        &self,
        context: PatchContext,
        proxy: &Proxy,
        push: &PushContext,
        route: RouteConfiguration,
    ) -> RouteConfiguration;

    /// Keys of the patches applicable to this proxy; part of the assembly
    /// fingerprint so patch changes invalidate cached tables.
    fn patch_keys(&self, _proxy: &Proxy) -> Vec<String> {
        Vec::new()
    }
}

/// Pass-through patcher used when no patch store is wired in
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPatcher;

impl RoutePatcher for NoopPatcher {
    fn apply(
        &self,
        _context: PatchContext,
        _proxy: &Proxy,
        _push: &PushContext,
        route: RouteConfiguration,
    ) -> RouteConfiguration {
        route
    }
}

/// Gateway route-table assembly, external to this crate. Returning `None`
/// omits the listener name from the output.
pub trait GatewayRouteSource: Send + Sync {
    fn route_table(
        &self,
        proxy: &Proxy,
        push: &PushContext,
        name: &str,
    ) -> Option<RouteConfiguration>;
}
