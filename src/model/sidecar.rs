//! Per-proxy reachability scope (the scope resolver).
//!
//! The config store resolves, per proxy, an ordered list of egress listeners;
//! each carries the services and routing rules visible on it. Route assembly
//! asks the scope for the listener matching a listener key and treats a
//! missing listener as "no route table", never as a fault.

use std::sync::Arc;

use crate::model::service::{Protocol, Service};
use crate::model::virtual_service::VirtualService;

/// Port declaration on an operator-defined egress listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarPort {
    pub name: String,
    pub number: u16,
    pub protocol: Protocol,
}

/// One egress listener in a proxy's scope, with the services and routing
/// rules visible on it
#[derive(Debug, Clone, Default)]
pub struct EgressListener {
    /// Declared port; `None` marks the catch-all listener, always last
    pub port: Option<SidecarPort>,
    /// Bind address for Unix-domain-socket listeners
    pub bind: Option<String>,
    services: Vec<Arc<Service>>,
    virtual_services: Vec<Arc<VirtualService>>,
}

impl EgressListener {
    pub fn new(
        port: Option<SidecarPort>,
        bind: Option<String>,
        services: Vec<Arc<Service>>,
        virtual_services: Vec<Arc<VirtualService>>,
    ) -> Self {
        Self { port, bind, services, virtual_services }
    }

    /// Services importable through this listener
    pub fn services(&self) -> &[Arc<Service>] {
        &self.services
    }

    /// Routing rules scoped to this listener. Correctness requires using
    /// these rather than every rule visible to the proxy.
    pub fn virtual_services(&self) -> &[Arc<VirtualService>] {
        &self.virtual_services
    }
}

/// The resolved reachability scope for one proxy
#[derive(Debug, Clone, Default)]
pub struct SidecarScope {
    pub egress_listeners: Vec<EgressListener>,
}

impl SidecarScope {
    /// Locate the egress listener serving a route-table request.
    ///
    /// Port 0 together with a `unix://` bind selects a Unix-domain-socket
    /// listener by exact bind match; any other port selects the listener
    /// declaring it. The catch-all listener (no declared port) matches
    /// everything that reaches it.
    pub fn egress_listener_for_rds(&self, port: u16, bind: &str) -> Option<&EgressListener> {
        for listener in &self.egress_listeners {
            match &listener.port {
                // Catch-all listener, always last in the list
                None => return Some(listener),
                Some(declared) if declared.number == port => {
                    if port == 0 {
                        // Unix domain socket: must match the bind exactly
                        if listener.bind.as_deref() == Some(bind) {
                            return Some(listener);
                        }
                        continue;
                    }
                    return Some(listener);
                }
                Some(_) => {}
            }
        }
        None
    }
}
