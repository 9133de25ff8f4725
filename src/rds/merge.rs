//! Per-port virtual-host merging for the catch-all listener.
//!
//! A port-0 (sniffing-agnostic) route table carries the virtual hosts of
//! every port, with non-uniform rules: port 80 is the plain HTTP port and
//! passes through unchanged, while hosts from any other port survive only
//! through their explicitly port-qualified domains. Bare forms from those
//! ports are pointless on a catch-all listener and would collide with the
//! port-80 bare forms.

use std::collections::BTreeMap;

use envoy_types::pb::envoy::config::route::v3::VirtualHost;

/// Merge per-port virtual-host sets into the catch-all listener's set.
/// Input hosts are never mutated; narrowed variants are copies.
pub fn merge_all_virtual_hosts(
    per_port: &BTreeMap<u16, Vec<VirtualHost>>,
) -> Vec<VirtualHost> {
    let mut merged = Vec::new();
    for (port, virtual_hosts) in per_port {
        if *port == 80 {
            merged.extend(virtual_hosts.iter().cloned());
            continue;
        }
        for vhost in virtual_hosts {
            let port_qualified: Vec<String> =
                vhost.domains.iter().filter(|d| d.contains(':')).cloned().collect();
            if port_qualified.is_empty() {
                continue;
            }
            let mut narrowed = vhost.clone();
            narrowed.domains = port_qualified;
            merged.push(narrowed);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vhost(name: &str, domains: &[&str]) -> VirtualHost {
        VirtualHost {
            name: name.to_string(),
            domains: domains.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_port_80_passes_through_unmodified() {
        let per_port = BTreeMap::from([
            (80, vec![vhost("a.com:80", &["a.com"])]),
            (8080, vec![vhost("b.com:8080", &["b.com"])]),
        ]);

        let merged = merge_all_virtual_hosts(&per_port);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "a.com:80");
        assert_eq!(merged[0].domains, vec!["a.com".to_string()]);
    }

    #[test]
    fn test_other_ports_keep_only_port_qualified_domains() {
        let per_port = BTreeMap::from([(
            9080,
            vec![vhost("c.com:9080", &["c.com", "c.com:9080", "c", "c:9080"])],
        )]);

        let merged = merge_all_virtual_hosts(&per_port);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].domains, vec!["c.com:9080".to_string(), "c:9080".to_string()]);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let per_port =
            BTreeMap::from([(9080, vec![vhost("c.com:9080", &["c.com", "c.com:9080"])])]);
        let _ = merge_all_virtual_hosts(&per_port);
        assert_eq!(
            per_port[&9080][0].domains,
            vec!["c.com".to_string(), "c.com:9080".to_string()]
        );
    }

    #[test]
    fn test_port_without_qualified_domains_contributes_nothing() {
        let per_port = BTreeMap::from([
            (80, vec![vhost("a.com:80", &["a.com"])]),
            (8080, vec![vhost("b.com:8080", &["b.com"]), vhost("d.com:8080", &["d.com:8080"])]),
        ]);

        let merged = merge_all_virtual_hosts(&per_port);
        let names: Vec<&str> = merged.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a.com:80", "d.com:8080"]);
    }
}
