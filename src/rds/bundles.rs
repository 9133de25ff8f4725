//! Grouping of services and routing rules into per-port virtual-host bundles.
//!
//! One bundle pairs the route entries of a routing rule (or a synthesized
//! default route) with the hostnames they apply to on one port: registry
//! services matched by the rule's hosts, plus rule hosts backed by no
//! service at all. The synthesizer turns each bundle into virtual hosts.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use envoy_types::pb::envoy::config::route::v3::Route;

use crate::model::{host_matches, Protocol, Service, VirtualService};
use crate::rds::util::default_outbound_route;

/// Routes paired with the hostnames they serve on one port
#[derive(Debug, Clone)]
pub struct VirtualHostBundle {
    pub port: u16,
    /// Registry services covered by the originating rule, sorted by hostname
    pub services: Vec<Arc<Service>>,
    /// Rule hostnames with no backing registry service
    pub virtual_service_hosts: Vec<String>,
    pub routes: Vec<Route>,
}

/// Whether a port can carry HTTP routes: declared HTTP protocols always,
/// undeclared protocols via sniffing
fn is_route_worthy(protocol: Protocol) -> bool {
    protocol.is_http() || protocol == Protocol::Unsupported
}

/// Build the bundles for one listener.
///
/// Rules come first, in scope order: each contributes one bundle per
/// applicable port, splitting its hosts into matched services and plain
/// hostnames. Services not covered by any rule then get a default
/// prefix-`/` bundle per route-worthy port. At a concrete listener port the
/// service map already holds single-port narrowed copies; port 0 keeps every
/// service under all of its ports.
pub fn build_virtual_host_bundles(
    services_by_name: &BTreeMap<String, Arc<Service>>,
    virtual_services: &[Arc<VirtualService>],
    listener_port: u16,
) -> Vec<VirtualHostBundle> {
    let mut bundles = Vec::new();
    let mut claimed: BTreeSet<String> = BTreeSet::new();

    for rule in virtual_services {
        let mut matched: Vec<Arc<Service>> = Vec::new();
        let mut plain_hosts: Vec<String> = Vec::new();
        for rule_host in &rule.hosts {
            let mut matched_any = false;
            for (hostname, service) in services_by_name {
                if host_matches(rule_host, hostname) {
                    matched.push(service.clone());
                    claimed.insert(hostname.clone());
                    matched_any = true;
                }
            }
            if !matched_any {
                plain_hosts.push(rule_host.clone());
            }
        }
        matched.sort_by(|a, b| a.hostname.cmp(&b.hostname));
        matched.dedup_by(|a, b| a.hostname == b.hostname);

        let ports: Vec<u16> = if listener_port > 0 {
            vec![listener_port]
        } else {
            // Catch-all listener: one bundle per route-worthy port of the
            // matched services; rules matching no service fall back to the
            // plain HTTP port.
            let mut ports: BTreeSet<u16> = matched
                .iter()
                .flat_map(|svc| svc.ports.iter())
                .filter(|p| is_route_worthy(p.protocol))
                .map(|p| p.port)
                .collect();
            if ports.is_empty() {
                ports.insert(80);
            }
            ports.into_iter().collect()
        };

        for port in ports {
            bundles.push(VirtualHostBundle {
                port,
                services: matched.clone(),
                virtual_service_hosts: plain_hosts.clone(),
                routes: rule.http_routes.clone(),
            });
        }
    }

    // Services without a covering rule get a default route per port.
    for (hostname, service) in services_by_name {
        if claimed.contains(hostname) {
            continue;
        }
        for port in &service.ports {
            if !is_route_worthy(port.protocol) {
                continue;
            }
            if listener_port > 0 && port.port != listener_port {
                continue;
            }
            bundles.push(VirtualHostBundle {
                port: port.port,
                services: vec![service.clone()],
                virtual_service_hosts: Vec::new(),
                routes: vec![default_outbound_route(hostname, port.port)],
            });
        }
    }

    bundles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Resolution, ServiceAttributes, ServicePort, ServiceProvider};
    use envoy_types::pb::envoy::config::route::v3::route::Action;
    use envoy_types::pb::envoy::config::route::v3::route_action::ClusterSpecifier;

    fn service(hostname: &str, ports: &[(u16, Protocol)]) -> Arc<Service> {
        Arc::new(Service {
            hostname: hostname.to_string(),
            default_address: "10.0.0.1".to_string(),
            cluster_vips: Default::default(),
            ports: ports
                .iter()
                .map(|(port, protocol)| ServicePort {
                    name: format!("port-{}", port),
                    port: *port,
                    protocol: *protocol,
                })
                .collect(),
            resolution: Resolution::ClientSideLb,
            mesh_external: false,
            attributes: ServiceAttributes {
                namespace: "team-a".to_string(),
                provider: ServiceProvider::Kubernetes,
            },
        })
    }

    fn service_map(services: &[Arc<Service>]) -> BTreeMap<String, Arc<Service>> {
        services.iter().map(|s| (s.hostname.clone(), s.clone())).collect()
    }

    fn rule(hosts: &[&str], routes: usize) -> Arc<VirtualService> {
        Arc::new(VirtualService {
            name: "rule".to_string(),
            namespace: "team-a".to_string(),
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            http_routes: (0..routes)
                .map(|i| Route { name: format!("r{}", i), ..Default::default() })
                .collect(),
            delegates: Vec::new(),
        })
    }

    #[test]
    fn test_uncovered_services_get_default_bundles() {
        let services = vec![service(
            "reviews.team-a.svc.cluster.local",
            &[(9080, Protocol::Http), (9090, Protocol::Tcp)],
        )];
        let bundles = build_virtual_host_bundles(&service_map(&services), &[], 0);

        // TCP port contributes nothing
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].port, 9080);
        assert_eq!(bundles[0].routes.len(), 1);
        let action = bundles[0].routes[0].action.as_ref().unwrap();
        match action {
            Action::Route(route_action) => match route_action.cluster_specifier.as_ref().unwrap() {
                ClusterSpecifier::Cluster(cluster) => {
                    assert_eq!(cluster, "outbound|9080||reviews.team-a.svc.cluster.local");
                }
                other => panic!("unexpected cluster specifier: {:?}", other),
            },
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_rule_splits_matched_and_plain_hosts() {
        let services = vec![service("reviews.team-a.svc.cluster.local", &[(9080, Protocol::Http)])];
        let rules = vec![rule(&["reviews.team-a.svc.cluster.local", "bookinfo.com"], 1)];
        let bundles = build_virtual_host_bundles(&service_map(&services), &rules, 0);

        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].services.len(), 1);
        assert_eq!(bundles[0].virtual_service_hosts, vec!["bookinfo.com".to_string()]);
        // The covered service gets no extra default bundle
        assert!(bundles.iter().all(|b| b.routes[0].name == "r0"));
    }

    #[test]
    fn test_rule_without_matching_service_defaults_to_port_80() {
        let bundles = build_virtual_host_bundles(&BTreeMap::new(), &[rule(&["bookinfo.com"], 1)], 0);
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].port, 80);
        assert!(bundles[0].services.is_empty());
    }

    #[test]
    fn test_concrete_listener_port_pins_bundle_port() {
        let services = vec![service("reviews.team-a.svc.cluster.local", &[(9080, Protocol::Http)])];
        let rules = vec![rule(&["reviews.team-a.svc.cluster.local"], 2)];
        let bundles = build_virtual_host_bundles(&service_map(&services), &rules, 9080);
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].port, 9080);
        assert_eq!(bundles[0].routes.len(), 2);
    }
}
