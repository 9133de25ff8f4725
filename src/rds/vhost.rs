//! Virtual-host synthesis for one listener.
//!
//! Turns per-port bundles into fully-formed virtual hosts: computes each
//! host's domain set (fully-qualified and port-qualified forms, alternate
//! short forms, wildcard expansions, resolvable addresses), deduplicates
//! names and domains across the whole run, and records diagnostics on
//! collision.

use std::collections::BTreeMap;
use std::sync::Arc;

use envoy_types::pb::envoy::config::route::v3::{Route, VirtualHost};

use crate::model::{
    Proxy, PushContext, Resolution, Service, ServiceProvider, DUPLICATED_DOMAINS, UNSPECIFIED_IP,
};
use crate::rds::alt_hosts::generate_alt_virtual_hosts;
use crate::rds::bundles::VirtualHostBundle;
use crate::rds::dedupe::DedupeState;
use crate::rds::util::{domain_name, ipv6_compliant};

const WILDCARD_DOMAIN_PREFIX: &str = "*.";

/// Synthesize the per-port virtual-host sets for one listener.
///
/// Every service FQDN is indexed into the known-FQDN set up front; domain
/// filtering relies on the complete index. Bundles contributing zero routes
/// are skipped outright. Within a bundle, routing-rule hostnames are built
/// before service hostnames.
pub fn build_sidecar_virtual_hosts(
    proxy: &Proxy,
    push: &PushContext,
    bundles: &[VirtualHostBundle],
    dedupe: &mut DedupeState,
) -> BTreeMap<u16, Vec<VirtualHost>> {
    for bundle in bundles {
        for service in &bundle.services {
            dedupe.index_known_fqdn(domain_name(&service.hostname, bundle.port));
            dedupe.index_known_fqdn(service.hostname.clone());
        }
    }

    let mut per_port: BTreeMap<u16, Vec<VirtualHost>> = BTreeMap::new();
    for bundle in bundles {
        // None of this bundle's routes apply to the requesting proxy
        if bundle.routes.is_empty() {
            continue;
        }

        let mut virtual_hosts =
            Vec::with_capacity(bundle.virtual_service_hosts.len() + bundle.services.len());
        for hostname in &bundle.virtual_service_hosts {
            if let Some(vhost) =
                build_virtual_host(hostname, bundle.port, &bundle.routes, None, proxy, push, dedupe)
            {
                virtual_hosts.push(vhost);
            }
        }
        for service in &bundle.services {
            if let Some(vhost) = build_virtual_host(
                &service.hostname,
                bundle.port,
                &bundle.routes,
                Some(service),
                proxy,
                push,
                dedupe,
            ) {
                virtual_hosts.push(vhost);
            }
        }
        per_port.entry(bundle.port).or_default().extend(virtual_hosts);
    }
    per_port
}

fn build_virtual_host(
    hostname: &str,
    port: u16,
    routes: &[Route],
    service: Option<&Arc<Service>>,
    proxy: &Proxy,
    push: &PushContext,
    dedupe: &mut DedupeState,
) -> Option<VirtualHost> {
    let name = domain_name(hostname, port);
    let collision_message = || match service {
        None => format!("duplicate domain from virtual service: {}", name),
        Some(_) => format!("duplicate domain from service: {}", name),
    };

    if dedupe.claim_name(&name) {
        // Another hostname/rule already produced a virtual host of this name.
        push.add_metric(DUPLICATED_DOMAINS, &name, &proxy.id, collision_message());
        return None;
    }

    let (domains, alt_hosts) = match service {
        None => (vec![ipv6_compliant(hostname), name.clone()], Vec::new()),
        Some(service) => generate_virtual_host_domains(service, port, proxy),
    };

    let (domains, dropped) = dedupe.dedupe_domains(domains, &alt_hosts);
    // Every domain was legitimately owned elsewhere: not an error, drop the
    // host without a diagnostic.
    if domains.is_empty() {
        return None;
    }
    if dropped {
        push.add_metric(DUPLICATED_DOMAINS, &name, &proxy.id, collision_message());
    }

    Some(VirtualHost {
        name,
        domains,
        routes: routes.to_vec(),
        include_request_attempt_count: true,
        ..Default::default()
    })
}

/// The domain matches for a service as reached from one proxy: literal and
/// port-qualified hostname, alternate short forms, wildcard-prefixed copies
/// for passthrough platform services, and the proxy-resolvable address.
/// Returns the domains plus the alt-host subset (the deduper treats
/// expansions specially).
pub fn generate_virtual_host_domains(
    service: &Service,
    port: u16,
    proxy: &Proxy,
) -> (Vec<String>, Vec<String>) {
    let alt_hosts = generate_alt_virtual_hosts(&service.hostname, port, &proxy.dns_domain);

    let mut domains = vec![ipv6_compliant(&service.hostname), domain_name(&service.hostname, port)];
    domains.extend(alt_hosts.iter().cloned());

    if service.resolution == Resolution::Passthrough
        && service.attributes.provider == ServiceProvider::Kubernetes
    {
        let wildcards: Vec<String> =
            domains.iter().map(|d| format!("{}{}", WILDCARD_DOMAIN_PREFIX, d)).collect();
        domains.extend(wildcards);
    }

    let address = service.address_for_proxy(proxy);
    if !address.is_empty() && address != UNSPECIFIED_IP {
        domains.push(ipv6_compliant(&address));
        domains.push(domain_name(&address, port));
    }

    (domains, alt_hosts)
}
