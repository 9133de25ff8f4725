//! # Metrics Collection
//!
//! Prometheus metrics for route synthesis. Metric emission is fire-and-forget
//! and never affects control flow; when no recorder is installed the calls
//! are no-ops.

use metrics::{counter, describe_counter, describe_gauge, gauge, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::{Error, Result};

/// Counter of domains or virtual-host names dropped because another virtual
/// host in the same route table already claimed them
pub const DUPLICATED_DOMAINS_TOTAL: &str = "rds_duplicated_domains_total";
/// Counter of route-table assemblies answered from the route cache
pub const CACHE_HITS_TOTAL: &str = "rds_cache_hits_total";
/// Counter of route-table assemblies computed fresh
pub const CACHE_MISSES_TOTAL: &str = "rds_cache_misses_total";
/// Gauge of live route-cache entries
pub const CACHE_ENTRIES: &str = "rds_cache_entries";
/// Counter of route-table resources handed to the transport layer
pub const ROUTES_BUILT_TOTAL: &str = "rds_routes_built_total";

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
static DESCRIBED: OnceCell<()> = OnceCell::new();

/// Register metric descriptions with the installed recorder. Idempotent.
pub fn register_metrics() {
    DESCRIBED.get_or_init(|| {
        describe_counter!(
            DUPLICATED_DOMAINS_TOTAL,
            Unit::Count,
            "Virtual-host names or domains dropped due to duplication"
        );
        describe_counter!(CACHE_HITS_TOTAL, Unit::Count, "Route cache hits");
        describe_counter!(CACHE_MISSES_TOTAL, Unit::Count, "Route cache misses");
        describe_gauge!(CACHE_ENTRIES, Unit::Count, "Live route cache entries");
        describe_counter!(ROUTES_BUILT_TOTAL, Unit::Count, "Route configurations built");
    });
}

/// Install the Prometheus recorder and return its scrape handle. Idempotent;
/// subsequent calls return the handle installed by the first.
pub fn init_prometheus() -> Result<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| Error::metrics(format!("Failed to install Prometheus recorder: {}", e)))?;
        register_metrics();
        Ok(handle)
    })
}

/// Record a dropped duplicate domain or virtual-host name
pub fn record_duplicated_domain(domain: &str, proxy_id: &str) {
    let labels = [("domain", domain.to_string()), ("proxy", proxy_id.to_string())];
    counter!(DUPLICATED_DOMAINS_TOTAL, &labels).increment(1);
}

/// Record a route cache lookup outcome
pub fn record_cache_lookup(hit: bool) {
    if hit {
        counter!(CACHE_HITS_TOTAL).increment(1);
    } else {
        counter!(CACHE_MISSES_TOTAL).increment(1);
    }
}

/// Update the route cache entry gauge
pub fn update_cache_entries(count: usize) {
    gauge!(CACHE_ENTRIES).set(count as f64);
}

/// Record route configurations produced for a proxy role
pub fn record_routes_built(proxy_type: &str, count: usize) {
    let labels = [("proxy_type", proxy_type.to_string())];
    counter!(ROUTES_BUILT_TOTAL, &labels).increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        // No recorder installed in unit tests; all helpers must be safe to call.
        register_metrics();
        record_duplicated_domain("foo.example.com:80", "sidecar~10.0.0.1");
        record_cache_lookup(true);
        record_cache_lookup(false);
        update_cache_entries(3);
        record_routes_built("sidecar", 2);
    }
}
