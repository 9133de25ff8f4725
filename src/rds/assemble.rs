//! Outbound route-table assembly for one listener.
//!
//! Orchestrates one listener's build: resolves services and routing rules
//! from the proxy's scope, narrows them to the relevant port, synthesizes and
//! merges virtual hosts, appends the catch-all host when sniffing is not in
//! effect, applies operator patches, and probes/feeds the route cache.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use envoy_types::pb::envoy::config::route::v3::{RouteConfiguration, VirtualHost};
use envoy_types::pb::google::protobuf::BoolValue;
use tracing::warn;

use crate::config::RdsConfig;
use crate::errors::{Error, Result};
use crate::model::{
    select_virtual_services, ListenerKey, PatchContext, Protocol, Proxy, PushContext,
    RoutePatcher, Service, VirtualService,
};
use crate::rds::bundles::build_virtual_host_bundles;
use crate::rds::cache::{CachedRouteEntry, RouteCache, RouteCacheKey, ServiceFingerprint};
use crate::rds::dedupe::DedupeState;
use crate::rds::merge::merge_all_virtual_hosts;
use crate::rds::util::{route_configuration_to_resource, sort_virtual_hosts, BuiltResource};
use crate::rds::vhost::build_sidecar_virtual_hosts;

/// Result of assembling one listener's virtual hosts
struct AssembledVirtualHosts {
    virtual_hosts: Vec<VirtualHost>,
    /// Cached resource short-circuiting the remaining steps
    cached: Option<Arc<CachedRouteEntry>>,
    /// Under strict assertions a cache hit is recomputed and cross-checked
    /// against this entry instead of being returned directly
    verify_against: Option<Arc<CachedRouteEntry>>,
    fingerprint: Option<RouteCacheKey>,
}

/// Builds outbound route tables for one proxy's listeners
pub struct OutboundRouteAssembler<'a> {
    config: &'a RdsConfig,
    cache: &'a RouteCache,
    patcher: &'a dyn RoutePatcher,
}

impl<'a> OutboundRouteAssembler<'a> {
    pub fn new(
        config: &'a RdsConfig,
        cache: &'a RouteCache,
        patcher: &'a dyn RoutePatcher,
    ) -> Self {
        Self { config, cache, patcher }
    }

    /// Assemble the route table for one listener name.
    ///
    /// Returns `(None, _)` when the listener resolves to no route table; the
    /// second element reports whether the route cache answered the request.
    /// `vhost_cache` holds the full per-port virtual-host lists already
    /// assembled in this proxy's build, reused across its sniffed listeners;
    /// it is confined to a single proxy's sequential build.
    pub fn build_route_config(
        &self,
        proxy: &Proxy,
        push: &PushContext,
        route_name: &str,
        listener: &ListenerKey,
        vhost_cache: &mut HashMap<u16, Vec<VirtualHost>>,
    ) -> Result<(Option<BuiltResource>, bool)> {
        let use_sniffing = listener.is_sniffed();
        let listener_port = listener.port();

        let mut virtual_hosts: Option<Vec<VirtualHost>> = None;
        let mut fingerprint = None;
        let mut verify_against = None;

        if use_sniffing && listener_port != 0 {
            // Reuse the full per-port list if this port was already
            // assembled once in this push.
            if let Some(port_hosts) = vhost_cache.get(&listener_port) {
                virtual_hosts = Some(self.narrow_to_sniffed_host(
                    port_hosts.clone(),
                    route_name,
                )?);
            }
        }

        let mut virtual_hosts = match virtual_hosts {
            Some(virtual_hosts) => virtual_hosts,
            None => {
                let Some(assembled) =
                    self.build_virtual_hosts(proxy, push, route_name, listener_port)
                else {
                    return Ok((None, false));
                };
                if let Some(entry) = assembled.cached {
                    return Ok((Some(entry.resource.clone()), true));
                }
                fingerprint = assembled.fingerprint;
                verify_against = assembled.verify_against;

                let mut virtual_hosts = assembled.virtual_hosts;
                if use_sniffing && listener_port > 0 {
                    // Cache full per-port lists for tcp ports only, not uds
                    vhost_cache.insert(listener_port, virtual_hosts.clone());
                }
                if use_sniffing {
                    virtual_hosts = self.narrow_to_sniffed_host(virtual_hosts, route_name)?;
                }
                virtual_hosts
            }
        };

        sort_virtual_hosts(&mut virtual_hosts);

        if !use_sniffing {
            // Downstream patching may mutate this host; the shared template
            // stays untouched.
            virtual_hosts.push(proxy.catch_all_virtual_host.clone());
        }

        let route = RouteConfiguration {
            name: route_name.to_string(),
            virtual_hosts,
            validate_clusters: Some(BoolValue { value: false }),
            ..Default::default()
        };
        let route = self.patcher.apply(PatchContext::SidecarOutbound, proxy, push, route);
        let resource = route_configuration_to_resource(&route);

        if let Some(stale) = verify_against {
            if stale.resource != resource {
                warn!(
                    route_name,
                    proxy = %proxy.id,
                    "cached route table differs from fresh build under equal fingerprints"
                );
            }
        }

        if self.config.enable_caching {
            if let Some(fingerprint) = fingerprint {
                self.cache.add(fingerprint, push.generation, resource.clone());
            }
        }

        Ok((Some(resource), false))
    }

    /// Assemble the full virtual-host set for one listener port. `None` when
    /// the scope resolver yields no listener for the name — an upstream
    /// invariant violation handled as "no route table" rather than a crash.
    fn build_virtual_hosts(
        &self,
        proxy: &Proxy,
        push: &PushContext,
        route_name: &str,
        listener_port: u16,
    ) -> Option<AssembledVirtualHosts> {
        let egress = match proxy.sidecar_scope.egress_listener_for_rds(listener_port, route_name) {
            Some(egress) => egress,
            None => {
                warn!(
                    route_name,
                    proxy = %proxy.id,
                    "no egress listener in scope for a requested route table"
                );
                return None;
            }
        };

        // Ports declared with the proxy-forwarding protocol assemble as the
        // catch-all regardless of the nominal listener port.
        let mut listener_port = listener_port;
        if let Some(declared) = &egress.port {
            if declared.protocol == Protocol::HttpProxy {
                listener_port = 0;
            }
        }

        // Correctness requires the listener's own services and rules, not
        // everything visible to the proxy.
        let mut virtual_services: Vec<Arc<VirtualService>> =
            egress.virtual_services().to_vec();

        let mut services_by_name: BTreeMap<String, Arc<Service>> = BTreeMap::new();
        let mut hosts_by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for service in egress.services() {
            if listener_port == 0 {
                // Catch-all: take every service under all of its ports and
                // let the routing rules resolve to the right one.
                services_by_name.insert(service.hostname.clone(), Arc::clone(service));
            } else if let Some(port) = service.port_by_number(listener_port) {
                services_by_name.insert(
                    service.hostname.clone(),
                    Arc::new(service.narrowed_to_port(port, proxy)),
                );
            } else {
                continue;
            }
            hosts_by_namespace
                .entry(service.attributes.namespace.clone())
                .or_default()
                .push(service.hostname.clone());
        }

        // Legacy carve-out: port 80 keeps every rule in scope even when it
        // matches no service.
        if listener_port != 80 {
            virtual_services = select_virtual_services(&virtual_services, &hosts_by_namespace);
        }

        let fingerprint = (listener_port > 0).then(|| {
            RouteCacheKey::new(
                route_name,
                proxy,
                listener_port,
                services_by_name.values().map(|s| ServiceFingerprint::from(s.as_ref())).collect(),
                virtual_services.iter().map(|vs| vs.config_key()).collect(),
                push.delegate_virtual_service_keys(&virtual_services),
                self.patcher.patch_keys(proxy),
            )
        });

        let mut verify_against = None;
        if self.config.enable_caching {
            if let Some(entry) = self.cache.get(fingerprint.as_ref()) {
                if self.config.strict_assertions {
                    // Recompute anyway and cross-check the cached bytes.
                    verify_against = Some(entry);
                } else {
                    return Some(AssembledVirtualHosts {
                        virtual_hosts: Vec::new(),
                        cached: Some(entry),
                        verify_against: None,
                        fingerprint,
                    });
                }
            }
        }

        let bundles =
            build_virtual_host_bundles(&services_by_name, &virtual_services, listener_port);
        let mut dedupe = DedupeState::new();
        let mut per_port = build_sidecar_virtual_hosts(proxy, push, &bundles, &mut dedupe);

        let virtual_hosts = if listener_port == 0 {
            merge_all_virtual_hosts(&per_port)
        } else {
            per_port.remove(&listener_port).unwrap_or_default()
        };

        Some(AssembledVirtualHosts { virtual_hosts, cached: None, verify_against, fingerprint })
    }

    /// Narrow a full per-port virtual-host list to the hosts serving one
    /// protocol-sniffed `host:port` listener. A single match has its domains
    /// rewritten to the wildcard since sniffing guarantees the listener only
    /// ever serves that host; multiple matches violate a control-plane
    /// invariant and halt the build under strict assertions.
    fn narrow_to_sniffed_host(
        &self,
        virtual_hosts: Vec<VirtualHost>,
        route_name: &str,
    ) -> Result<Vec<VirtualHost>> {
        let mut matched: Vec<VirtualHost> = virtual_hosts
            .into_iter()
            .filter(|vhost| vhost.domains.iter().any(|domain| domain == route_name))
            .collect();

        match matched.len() {
            0 => Ok(matched),
            1 => {
                matched[0].domains = vec!["*".to_string()];
                Ok(matched)
            }
            n => {
                if self.config.strict_assertions {
                    return Err(Error::invariant(format!(
                        "sniffed listener {} unexpectedly matched {} virtual hosts",
                        route_name, n
                    )));
                }
                warn!(
                    route_name,
                    matches = n,
                    "sniffed listener matched multiple virtual hosts; returning all"
                );
                Ok(matched)
            }
        }
    }
}
