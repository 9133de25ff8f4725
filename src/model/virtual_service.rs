//! Routing-rule model.
//!
//! A [`VirtualService`] is a hostname-keyed routing rule: the route entries it
//! produces are translated ahead of time by the config store, so route
//! synthesis only decides which rules are in scope and which virtual hosts
//! carry their routes. The rule schema itself is external to this crate.

use std::collections::BTreeMap;
use std::sync::Arc;

use envoy_types::pb::envoy::config::route::v3::Route;

/// A hostname-scoped routing rule producing an ordered list of route entries
#[derive(Debug, Clone, Default)]
pub struct VirtualService {
    pub name: String,
    pub namespace: String,
    /// Hostnames this rule applies to; entries may be `*.`-wildcards
    pub hosts: Vec<String>,
    /// Pre-translated route entries, in rule order
    pub http_routes: Vec<Route>,
    /// `namespace/name` keys of delegate rules this rule binds
    pub delegates: Vec<String>,
}

impl VirtualService {
    /// Stable config-store key, used in assembly fingerprints
    pub fn config_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Wildcard-aware host match between a rule host pattern and a concrete
/// service hostname. Either side may carry a `*.` prefix; a bare `*` matches
/// everything.
pub fn host_matches(pattern: &str, host: &str) -> bool {
    if pattern == "*" || host == "*" {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return host == suffix || host.ends_with(&format!(".{}", suffix));
    }
    if let Some(suffix) = host.strip_prefix("*.") {
        return pattern == suffix || pattern.ends_with(&format!(".{}", suffix));
    }
    pattern == host
}

/// Narrow a routing-rule list to only rules whose hosts intersect the
/// supplied per-namespace hostname sets. Order-preserving.
pub fn select_virtual_services(
    virtual_services: &[Arc<VirtualService>],
    hosts_by_namespace: &BTreeMap<String, Vec<String>>,
) -> Vec<Arc<VirtualService>> {
    virtual_services
        .iter()
        .filter(|vs| {
            vs.hosts.iter().any(|rule_host| {
                hosts_by_namespace
                    .values()
                    .flatten()
                    .any(|svc_host| host_matches(rule_host, svc_host))
            })
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vs(name: &str, hosts: &[&str]) -> Arc<VirtualService> {
        Arc::new(VirtualService {
            name: name.to_string(),
            namespace: "team-a".to_string(),
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            ..Default::default()
        })
    }

    #[test]
    fn test_host_matches() {
        assert!(host_matches("reviews.team-a.svc.cluster.local", "reviews.team-a.svc.cluster.local"));
        assert!(host_matches("*", "anything.example.com"));
        assert!(host_matches("*.example.com", "api.example.com"));
        assert!(host_matches("*.example.com", "deep.api.example.com"));
        assert!(!host_matches("*.example.com", "example.org"));
        assert!(!host_matches("api.example.com", "web.example.com"));
        // Wildcard service hostname matched by a concrete rule host
        assert!(host_matches("api.example.com", "*.example.com"));
    }

    #[test]
    fn test_select_virtual_services_filters_unmatched_rules() {
        let rules = vec![
            vs("reviews-route", &["reviews.team-a.svc.cluster.local"]),
            vs("external-route", &["bookinfo.com"]),
            vs("wildcard-route", &["*.team-b.svc.cluster.local"]),
        ];
        let hosts = BTreeMap::from([
            ("team-a".to_string(), vec!["reviews.team-a.svc.cluster.local".to_string()]),
            ("team-b".to_string(), vec!["ratings.team-b.svc.cluster.local".to_string()]),
        ]);

        let selected = select_virtual_services(&rules, &hosts);
        let names: Vec<&str> = selected.iter().map(|vs| vs.name.as_str()).collect();
        assert_eq!(names, vec!["reviews-route", "wildcard-route"]);
    }

    #[test]
    fn test_config_key() {
        let rule = vs("reviews-route", &[]);
        assert_eq!(rule.config_key(), "team-a/reviews-route");
    }
}
