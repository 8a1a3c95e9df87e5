//! Round-robin load balancing strategy.

use std::sync::Arc;

use crate::error::{BalancerError, Result};
use crate::load_balancer::pool::{BackendPool, Expansion};
use crate::load_balancer::{AlgorithmKind, BackendServer, SelectionAlgorithm};

/// Round-robin selector.
/// Rotates through the eligible members; weights are ignored.
#[derive(Debug)]
pub struct RoundRobinAlgorithm {
    pool: BackendPool,
}

impl RoundRobinAlgorithm {
    pub fn new(servers: Vec<Arc<BackendServer>>) -> Self {
        Self {
            pool: BackendPool::new(servers, Expansion::Members),
        }
    }
}

impl SelectionAlgorithm for RoundRobinAlgorithm {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::RoundRobin
    }

    fn pool(&self) -> &BackendPool {
        &self.pool
    }

    fn next_server(&self) -> Result<Arc<BackendServer>> {
        self.pool.advance().ok_or(BalancerError::NoBackendAvailable)
    }
}
