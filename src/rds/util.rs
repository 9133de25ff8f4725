//! Shared helpers for route-table construction: host/domain formatting,
//! resource serialization, and well-known virtual hosts.

use envoy_types::pb::envoy::config::route::v3::{
    route::Action, route_action::ClusterSpecifier, route_match::PathSpecifier, Decorator,
    DirectResponseAction, Route, RouteAction, RouteConfiguration, RouteMatch, VirtualHost,
};
use envoy_types::pb::google::protobuf::{Any, BoolValue};
use prost::Message;

/// Type URL of the serialized route-table resource
pub const ROUTE_TYPE_URL: &str = "type.googleapis.com/envoy.config.route.v3.RouteConfiguration";

/// Cluster receiving unmatched outbound traffic in allow-any mode
pub const PASSTHROUGH_CLUSTER: &str = "PassthroughCluster";

/// Name of the allow-any catch-all virtual host
pub const ALLOW_ANY: &str = "allow_any";

/// Name of the block-all catch-all virtual host
pub const BLOCK_ALL: &str = "block_all";

/// Wrapper for a built route-table resource along with its name
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltResource {
    pub name: String,
    pub resource: Any,
}

impl BuiltResource {
    pub fn into_any(self) -> Any {
        self.resource
    }

    pub fn type_url(&self) -> &str {
        &self.resource.type_url
    }
}

/// Pack a protobuf message into `Any` under the given type URL
pub fn message_to_any<M: Message>(type_url: &str, message: &M) -> Any {
    Any { type_url: type_url.to_string(), value: message.encode_to_vec() }
}

/// Serialize a route table into the named resource handed to the transport
/// layer
pub fn route_configuration_to_resource(route: &RouteConfiguration) -> BuiltResource {
    BuiltResource { name: route.name.clone(), resource: message_to_any(ROUTE_TYPE_URL, route) }
}

/// An explicitly empty route table with downstream cluster validation
/// disabled, emitted for sidecar listener names that fail to resolve
pub fn empty_route_configuration(name: &str) -> RouteConfiguration {
    RouteConfiguration {
        name: name.to_string(),
        virtual_hosts: Vec::new(),
        validate_clusters: Some(BoolValue { value: false }),
        ..Default::default()
    }
}

/// `host:port`, bracketing IPv6 literals
pub fn domain_name(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Bracket bare IPv6 literals so they are valid Host-header domains
pub fn ipv6_compliant(host: &str) -> String {
    if host.contains(':') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

/// Deterministic virtual-host order, applied before a route table is
/// returned so repeated runs produce identical output
pub fn sort_virtual_hosts(virtual_hosts: &mut [VirtualHost]) {
    virtual_hosts.sort_by(|a, b| a.name.cmp(&b.name));
}

/// Trace decorator operation for a service endpoint
pub fn trace_operation(host: &str, port: u16) -> String {
    format!("{}:{}/*", host, port)
}

/// The default prefix-`/` route to an outbound service cluster, used for
/// services not covered by any routing rule
pub fn default_outbound_route(hostname: &str, port: u16) -> Route {
    Route {
        name: "default".to_string(),
        r#match: Some(RouteMatch {
            path_specifier: Some(PathSpecifier::Prefix("/".to_string())),
            ..Default::default()
        }),
        action: Some(Action::Route(RouteAction {
            cluster_specifier: Some(ClusterSpecifier::Cluster(format!(
                "outbound|{}||{}",
                port, hostname
            ))),
            ..Default::default()
        })),
        ..Default::default()
    }
}

/// The default inbound route delivering traffic to a local endpoint cluster
pub fn default_inbound_route(cluster_name: &str, operation: String) -> Route {
    Route {
        name: "default".to_string(),
        r#match: Some(RouteMatch {
            path_specifier: Some(PathSpecifier::Prefix("/".to_string())),
            ..Default::default()
        }),
        action: Some(Action::Route(RouteAction {
            cluster_specifier: Some(ClusterSpecifier::Cluster(cluster_name.to_string())),
            ..Default::default()
        })),
        decorator: Some(Decorator { operation, ..Default::default() }),
        ..Default::default()
    }
}

/// The proxy-wide catch-all virtual host covering unmatched outbound
/// traffic: passthrough forwarding in allow-any mode, a 502 direct response
/// otherwise. Shared read-mostly across listeners; callers clone before any
/// per-listener mutation.
pub fn catch_all_virtual_host(allow_any: bool) -> VirtualHost {
    let (name, action) = if allow_any {
        (
            ALLOW_ANY,
            Action::Route(RouteAction {
                cluster_specifier: Some(ClusterSpecifier::Cluster(PASSTHROUGH_CLUSTER.to_string())),
                ..Default::default()
            }),
        )
    } else {
        (
            BLOCK_ALL,
            Action::DirectResponse(DirectResponseAction { status: 502, ..Default::default() }),
        )
    };

    VirtualHost {
        name: name.to_string(),
        domains: vec!["*".to_string()],
        routes: vec![Route {
            name: name.to_string(),
            r#match: Some(RouteMatch {
                path_specifier: Some(PathSpecifier::Prefix("/".to_string())),
                ..Default::default()
            }),
            action: Some(action),
            ..Default::default()
        }],
        include_request_attempt_count: true,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_name_brackets_ipv6() {
        assert_eq!(domain_name("reviews.team-a", 9080), "reviews.team-a:9080");
        assert_eq!(domain_name("2001:db8::5", 9080), "[2001:db8::5]:9080");
    }

    #[test]
    fn test_ipv6_compliant() {
        assert_eq!(ipv6_compliant("reviews.team-a"), "reviews.team-a");
        assert_eq!(ipv6_compliant("2001:db8::5"), "[2001:db8::5]");
    }

    #[test]
    fn test_sort_virtual_hosts_is_by_name() {
        let mut vhosts = vec![
            VirtualHost { name: "b:80".to_string(), ..Default::default() },
            VirtualHost { name: "a:80".to_string(), ..Default::default() },
        ];
        sort_virtual_hosts(&mut vhosts);
        assert_eq!(vhosts[0].name, "a:80");
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let route = empty_route_configuration("8080");
        let first = route_configuration_to_resource(&route);
        let second = route_configuration_to_resource(&route);
        assert_eq!(first, second);
        assert_eq!(first.type_url(), ROUTE_TYPE_URL);
        assert_eq!(first.name, "8080");
    }

    #[test]
    fn test_catch_all_variants() {
        let allow = catch_all_virtual_host(true);
        assert_eq!(allow.name, ALLOW_ANY);
        assert_eq!(allow.domains, vec!["*".to_string()]);

        let block = catch_all_virtual_host(false);
        assert_eq!(block.name, BLOCK_ALL);
        assert!(matches!(
            block.routes[0].action,
            Some(Action::DirectResponse(DirectResponseAction { status: 502, .. }))
        ));
    }
}
