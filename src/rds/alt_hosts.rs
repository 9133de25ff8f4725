//! Alternate Host-header generation.
//!
//! Given a fully-qualified service hostname and the requesting proxy's local
//! DNS domain, computes the shorter Host-header forms that are valid for that
//! proxy. For example, a service `foo.local.campus.net` on port 80 seen from
//! proxy domain `local.campus.net` can be reached as `http://foo:80` within
//! the `.local` network and as `http://foo.local:80` by other clients in the
//! `campus.net` domain. The fully-qualified name itself is never emitted here
//! since it is always added alongside.
//!
//! Namespaced platform domains (containing a `.svc.` segment) follow distinct
//! rules: a proxy in the same namespace may use the bare service name, while
//! a proxy in a remote namespace must never reach the service through an
//! ambiguous bare name and only gets the `name.namespace` forms.

use crate::rds::util::domain_name;

/// Marker segment of namespaced platform domains
const NAMESPACED_DOMAIN_MARKER: &str = ".svc.";

/// Compute the ordered alternate Host-header forms for `hostname` on `port`
/// as seen from a proxy in `proxy_domain`. Empty when the two share no DNS
/// suffix and neither is namespaced.
pub fn generate_alt_virtual_hosts(hostname: &str, port: u16, proxy_domain: &str) -> Vec<String> {
    if let Some(proxy_marker) = proxy_domain.find(NAMESPACED_DOMAIN_MARKER) {
        return alt_hosts_for_namespaced_service(hostname, port, proxy_domain, proxy_marker);
    }

    let (unique, shared) = split_unique_and_shared_dns_domain(hostname, proxy_domain);
    // No shared DNS suffix (e.g. foobar.com service on local.net proxy
    // domain): no alternate representations exist.
    if shared.is_empty() {
        return Vec::new();
    }

    let unique_hostname = unique.join(".");
    let mut vhosts = vec![unique_hostname.clone(), domain_name(&unique_hostname, port)];
    if unique.len() == 2 {
        // The unique part already carries a namespace; also valid one shared
        // label deeper, e.g. foo.local.campus for foo.local.campus.net.
        let dns_hostname = format!("{}.{}", unique_hostname, shared[0]);
        vhosts.push(dns_hostname.clone());
        vhosts.push(domain_name(&dns_hostname, port));
    }
    vhosts
}

/// Alternate forms when the proxy runs in a namespaced platform domain like
/// `ns.svc.cluster.local`.
fn alt_hosts_for_namespaced_service(
    hostname: &str,
    port: u16,
    proxy_domain: &str,
    proxy_marker: usize,
) -> Vec<String> {
    let Some(host_marker) = hostname.find(NAMESPACED_DOMAIN_MARKER).filter(|idx| *idx > 0) else {
        // Proxy is namespaced but the service hostname is not: no alternates.
        return Vec::new();
    };

    let Some(name_end) = hostname.find('.') else {
        return Vec::new();
    };
    // Malformed namespaced hostname: the marker sits at or before the
    // service/namespace boundary.
    if name_end + 1 >= hostname.len() || name_end + 1 > host_marker {
        return Vec::new();
    }

    let name = &hostname[..name_end];
    let name_and_namespace = &hostname[..host_marker];
    let service_namespace = &hostname[name_end + 1..host_marker];
    let proxy_namespace = &proxy_domain[..proxy_marker];

    if service_namespace == proxy_namespace {
        let name_svc = format!("{}.svc", name);
        vec![
            name.to_string(),
            domain_name(name, port),
            name_svc.clone(),
            domain_name(&name_svc, port),
            name_and_namespace.to_string(),
            domain_name(name_and_namespace, port),
        ]
    } else {
        // Remote namespace: never the ambiguous bare name.
        let name_namespace_svc = format!("{}.svc", name_and_namespace);
        vec![
            name_and_namespace.to_string(),
            domain_name(name_and_namespace, port),
            name_namespace_svc.clone(),
            domain_name(&name_namespace_svc, port),
        ]
    }
}

/// Split a fully-qualified hostname against the proxy's domain into the
/// labels unique to the hostname and the DNS suffix labels the two share
/// (label-by-label equality from the end). With no shared suffix, every
/// hostname label is unique and the shared part is empty.
fn split_unique_and_shared_dns_domain(
    fqdn: &str,
    proxy_domain: &str,
) -> (Vec<String>, Vec<String>) {
    let host_labels: Vec<&str> = fqdn.split('.').collect();
    let domain_labels: Vec<&str> = proxy_domain.split('.').collect();

    let shared_len = host_labels
        .iter()
        .rev()
        .zip(domain_labels.iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    if shared_len == 0 {
        return (host_labels.iter().map(|s| s.to_string()).collect(), Vec::new());
    }

    let unique =
        host_labels[..host_labels.len() - shared_len].iter().map(|s| s.to_string()).collect();
    let shared = host_labels[host_labels.len() - shared_len..]
        .iter()
        .map(|s| s.to_string())
        .collect();
    (unique, shared)
}
