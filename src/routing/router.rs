//! Route lookup.
//!
//! # Responsibilities
//! - Store bindings per (port, host) in registration order
//! - Resolve a request to its binding or an explicit miss
//!
//! # Design Decisions
//! - Immutable after construction (shared behind `Arc` without locks)
//! - O(1) port and host lookup via HashMap
//! - O(n) path prefix scan; first match wins

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BalancerError, Result};
use crate::load_balancer::SelectionAlgorithm;
use crate::routing::matcher::{clean_path, decode_path, matches_prefix, normalize_host};

/// A path prefix served by one algorithm.
#[derive(Clone)]
pub struct Binding {
    pub prefix: String,
    pub algorithm: Arc<dyn SelectionAlgorithm>,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("prefix", &self.prefix)
            .field("algorithm", &self.algorithm.kind())
            .finish()
    }
}

/// port → host → ordered bindings.
#[derive(Debug, Default)]
pub struct RoutingTable {
    ports: HashMap<u16, HashMap<String, Vec<Binding>>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding for `host` on `port`.
    pub fn register_binding(
        &mut self,
        port: u16,
        host: &str,
        prefix: impl Into<String>,
        algorithm: Arc<dyn SelectionAlgorithm>,
    ) {
        self.ports
            .entry(port)
            .or_default()
            .entry(normalize_host(host))
            .or_default()
            .push(Binding {
                prefix: prefix.into(),
                algorithm,
            });
    }

    /// Find the binding for a request.
    ///
    /// `host` is the raw Host header; `path` the raw request path.
    pub fn resolve(&self, port: u16, host: &str, path: &str) -> Result<&Binding> {
        let host = normalize_host(host);
        let bindings = self
            .ports
            .get(&port)
            .and_then(|hosts| hosts.get(&host))
            .ok_or_else(|| BalancerError::UnknownHost {
                host: host.clone(),
                port,
            })?;

        let path = clean_path(&decode_path(path));
        bindings
            .iter()
            .find(|b| matches_prefix(&b.prefix, &path))
            .ok_or(BalancerError::NoRouteMatch { host, path })
    }

    /// Distinct ports with at least one binding.
    pub fn ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.ports.keys().copied().collect();
        ports.sort_unstable();
        ports
    }

    /// Bindings registered for (`port`, `host`), in order.
    pub fn bindings(&self, port: u16, host: &str) -> &[Binding] {
        self.ports
            .get(&port)
            .and_then(|hosts| hosts.get(&normalize_host(host)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every binding in the table.
    pub fn all_bindings(&self) -> impl Iterator<Item = (u16, &str, &Binding)> + '_ {
        self.ports.iter().flat_map(|(port, hosts)| {
            hosts.iter().flat_map(move |(host, bindings)| {
                bindings.iter().map(move |b| (*port, host.as_str(), b))
            })
        })
    }
}
