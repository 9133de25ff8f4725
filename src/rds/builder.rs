//! Top-level route-table build entry point.
//!
//! Dispatches a proxy's requested route-table names to the outbound
//! assembler, the inbound synthesizer, or the external gateway source, and
//! guarantees that a sidecar never waits on a name it asked for: names that
//! resolve to nothing come back as empty route tables.

use std::collections::HashMap;

use envoy_types::pb::envoy::config::route::v3::{RouteConfiguration, VirtualHost};
use envoy_types::pb::google::protobuf::BoolValue;
use tracing::{debug, instrument};

use crate::config::RdsConfig;
use crate::errors::Result;
use crate::model::{
    GatewayRouteSource, ListenerKey, NoopPatcher, PatchContext, Proxy, ProxyType, PushContext,
    RoutePatcher, ServiceInstance,
};
use crate::observability::metrics;
use crate::rds::assemble::OutboundRouteAssembler;
use crate::rds::cache::RouteCache;
use crate::rds::util::{
    default_inbound_route, empty_route_configuration, route_configuration_to_resource,
    trace_operation, BuiltResource,
};

static NOOP_PATCHER: NoopPatcher = NoopPatcher;

/// Counters for one proxy's route-table build
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouteBuildStats {
    pub routes_built: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Names that resolved to nothing and came back as empty tables
    pub empty_tables: usize,
}

/// Builds the set of route tables a proxy subscribed to
pub struct RouteConfigBuilder<'a> {
    config: &'a RdsConfig,
    cache: &'a RouteCache,
    patcher: &'a dyn RoutePatcher,
    gateway: Option<&'a dyn GatewayRouteSource>,
}

impl<'a> RouteConfigBuilder<'a> {
    pub fn new(config: &'a RdsConfig, cache: &'a RouteCache) -> Self {
        Self { config, cache, patcher: &NOOP_PATCHER, gateway: None }
    }

    /// Wire in an operator patch store
    pub fn with_patcher(mut self, patcher: &'a dyn RoutePatcher) -> Self {
        self.patcher = patcher;
        self
    }

    /// Wire in the external gateway route-table source
    pub fn with_gateway_source(mut self, gateway: &'a dyn GatewayRouteSource) -> Self {
        self.gateway = gateway.into();
        self
    }

    /// Build every requested route table for one proxy.
    ///
    /// Sidecars always get one table per requested name; gateways only get
    /// the names their route source recognizes.
    #[instrument(skip_all, fields(proxy = %proxy.id, tables = route_names.len()))]
    pub fn build_route_configs(
        &self,
        proxy: &Proxy,
        push: &PushContext,
        route_names: &[String],
    ) -> Result<(Vec<BuiltResource>, RouteBuildStats)> {
        let (resources, stats) = match proxy.proxy_type {
            ProxyType::Sidecar => self.build_sidecar_outbound(proxy, push, route_names)?,
            ProxyType::Router => self.build_gateway(proxy, push, route_names),
        };
        metrics::record_routes_built(proxy.proxy_type.as_str(), stats.routes_built);
        debug!(
            built = stats.routes_built,
            hits = stats.cache_hits,
            misses = stats.cache_misses,
            empty = stats.empty_tables,
            "route tables built"
        );
        Ok((resources, stats))
    }

    fn build_sidecar_outbound(
        &self,
        proxy: &Proxy,
        push: &PushContext,
        route_names: &[String],
    ) -> Result<(Vec<BuiltResource>, RouteBuildStats)> {
        let assembler = OutboundRouteAssembler::new(self.config, self.cache, self.patcher);
        let mut resources = Vec::with_capacity(route_names.len());
        let mut stats = RouteBuildStats::default();
        // Full per-port virtual-host lists, shared across this proxy's
        // sniffed listeners within the one sequential build.
        let mut vhost_cache: HashMap<u16, Vec<VirtualHost>> = HashMap::new();

        for route_name in route_names {
            let built = match ListenerKey::parse(route_name, self.config.enable_outbound_sniffing)
            {
                Some(listener) => {
                    let (resource, cache_hit) = assembler.build_route_config(
                        proxy,
                        push,
                        route_name,
                        &listener,
                        &mut vhost_cache,
                    )?;
                    if self.config.enable_caching {
                        metrics::record_cache_lookup(cache_hit);
                        if cache_hit {
                            stats.cache_hits += 1;
                        } else {
                            stats.cache_misses += 1;
                        }
                    }
                    resource
                }
                None => {
                    debug!(route_name, "unparsable route table name");
                    None
                }
            };
            // The proxy blocks on every name it asked for; an absent table
            // must still be answered.
            let resource = match built {
                Some(resource) => resource,
                None => {
                    stats.empty_tables += 1;
                    route_configuration_to_resource(&empty_route_configuration(route_name))
                }
            };
            stats.routes_built += 1;
            resources.push(resource);
        }
        Ok((resources, stats))
    }

    fn build_gateway(
        &self,
        proxy: &Proxy,
        push: &PushContext,
        route_names: &[String],
    ) -> (Vec<BuiltResource>, RouteBuildStats) {
        let mut resources = Vec::new();
        let mut stats = RouteBuildStats::default();
        let Some(gateway) = self.gateway else {
            debug!(proxy = %proxy.id, "no gateway route source wired in");
            return (resources, stats);
        };
        for route_name in route_names {
            let Some(route) = gateway.route_table(proxy, push, route_name) else {
                // Unlike sidecars, gateways tolerate omitted names.
                continue;
            };
            let route = self.patcher.apply(PatchContext::Gateway, proxy, push, route);
            stats.routes_built += 1;
            resources.push(route_configuration_to_resource(&route));
        }
        (resources, stats)
    }

    /// Synthesize the inbound route table for one served service port: a
    /// single wildcard virtual host routing everything to the local cluster.
    pub fn build_sidecar_inbound_route_config(
        &self,
        proxy: &Proxy,
        push: &PushContext,
        instance: &ServiceInstance,
        cluster_name: &str,
    ) -> RouteConfiguration {
        let operation =
            trace_operation(&instance.service.hostname, instance.service_port.port);
        let virtual_host = VirtualHost {
            name: format!("inbound|http|{}", instance.service_port.port),
            domains: vec!["*".to_string()],
            routes: vec![default_inbound_route(cluster_name, operation)],
            ..Default::default()
        };
        let route = RouteConfiguration {
            name: cluster_name.to_string(),
            virtual_hosts: vec![virtual_host],
            validate_clusters: Some(BoolValue { value: false }),
            ..Default::default()
        };
        self.patcher.apply(PatchContext::SidecarInbound, proxy, push, route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::model::{
        Protocol, ProxyMetadata, Resolution, Service, ServiceAttributes, ServicePort,
        ServiceProvider, SidecarScope,
    };
    use crate::rds::util::catch_all_virtual_host;
    use envoy_types::pb::envoy::config::route::v3::route::Action;

    fn sidecar() -> Proxy {
        Proxy {
            id: "sidecar~10.0.0.1~test".to_string(),
            proxy_type: ProxyType::Sidecar,
            dns_domain: "team-a.svc.cluster.local".to_string(),
            metadata: ProxyMetadata {
                version: "1.20.0".to_string(),
                cluster_id: "east".to_string(),
                dns_capture: false,
                dns_auto_allocate: false,
            },
            sidecar_scope: Arc::new(SidecarScope::default()),
            catch_all_virtual_host: catch_all_virtual_host(true),
        }
    }

    fn router() -> Proxy {
        Proxy { proxy_type: ProxyType::Router, ..sidecar() }
    }

    fn instance() -> ServiceInstance {
        ServiceInstance {
            service: Arc::new(Service {
                hostname: "reviews.team-a.svc.cluster.local".to_string(),
                default_address: "10.0.0.1".to_string(),
                cluster_vips: Default::default(),
                ports: vec![ServicePort {
                    name: "http".to_string(),
                    port: 9080,
                    protocol: Protocol::Http,
                }],
                resolution: Resolution::ClientSideLb,
                mesh_external: false,
                attributes: ServiceAttributes {
                    namespace: "team-a".to_string(),
                    provider: ServiceProvider::Kubernetes,
                },
            }),
            service_port: ServicePort {
                name: "http".to_string(),
                port: 9080,
                protocol: Protocol::Http,
            },
        }
    }

    #[test]
    fn test_sidecar_answers_every_requested_name() {
        let config = RdsConfig::default();
        let cache = RouteCache::new();
        let builder = RouteConfigBuilder::new(&config, &cache);
        let push = PushContext::new(1);

        let names = vec!["not-a-port".to_string(), "9080".to_string()];
        let (resources, stats) = builder.build_route_configs(&sidecar(), &push, &names).unwrap();

        // Unparsable and out-of-scope names still produce (empty) tables
        assert_eq!(resources.len(), 2);
        assert_eq!(stats.routes_built, 2);
        assert_eq!(stats.empty_tables, 2);
        assert_eq!(resources[0].name, "not-a-port");
        assert_eq!(resources[1].name, "9080");
    }

    #[test]
    fn test_gateway_without_source_builds_nothing() {
        let config = RdsConfig::default();
        let cache = RouteCache::new();
        let builder = RouteConfigBuilder::new(&config, &cache);
        let push = PushContext::new(1);

        let names = vec!["https.443.default.gw.team-a".to_string()];
        let (resources, stats) = builder.build_route_configs(&router(), &push, &names).unwrap();
        assert!(resources.is_empty());
        assert_eq!(stats.routes_built, 0);
    }

    #[test]
    fn test_gateway_skips_unrecognized_names() {
        struct OneTable;
        impl GatewayRouteSource for OneTable {
            fn route_table(
                &self,
                _proxy: &Proxy,
                _push: &PushContext,
                name: &str,
            ) -> Option<RouteConfiguration> {
                (name == "https.443.default.gw.team-a").then(|| RouteConfiguration {
                    name: name.to_string(),
                    ..Default::default()
                })
            }
        }

        let config = RdsConfig::default();
        let cache = RouteCache::new();
        let source = OneTable;
        let builder = RouteConfigBuilder::new(&config, &cache).with_gateway_source(&source);
        let push = PushContext::new(1);

        let names =
            vec!["https.443.default.gw.team-a".to_string(), "http.80.unknown".to_string()];
        let (resources, stats) = builder.build_route_configs(&router(), &push, &names).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name, "https.443.default.gw.team-a");
        assert_eq!(stats.routes_built, 1);
    }

    #[test]
    fn test_inbound_table_routes_everything_to_local_cluster() {
        let config = RdsConfig::default();
        let cache = RouteCache::new();
        let builder = RouteConfigBuilder::new(&config, &cache);
        let push = PushContext::new(1);

        let route = builder.build_sidecar_inbound_route_config(
            &sidecar(),
            &push,
            &instance(),
            "inbound|9080||",
        );

        assert_eq!(route.name, "inbound|9080||");
        assert_eq!(route.virtual_hosts.len(), 1);
        let vhost = &route.virtual_hosts[0];
        assert_eq!(vhost.name, "inbound|http|9080");
        assert_eq!(vhost.domains, vec!["*".to_string()]);
        assert_eq!(vhost.routes.len(), 1);
        match vhost.routes[0].action.as_ref().unwrap() {
            Action::Route(_) => {}
            other => panic!("unexpected action: {:?}", other),
        }
        assert!(!route.validate_clusters.as_ref().unwrap().value);
    }
}
