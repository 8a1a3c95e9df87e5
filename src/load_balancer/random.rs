//! Random load balancing strategy.

use std::sync::Arc;

use rand::Rng;

use crate::error::{BalancerError, Result};
use crate::load_balancer::pool::{BackendPool, Expansion};
use crate::load_balancer::{AlgorithmKind, BackendServer, SelectionAlgorithm};

/// Uniform pick among the eligible members. Weights are ignored.
#[derive(Debug)]
pub struct RandomAlgorithm {
    pool: BackendPool,
}

impl RandomAlgorithm {
    pub fn new(servers: Vec<Arc<BackendServer>>) -> Self {
        Self {
            pool: BackendPool::new(servers, Expansion::Members),
        }
    }
}

impl SelectionAlgorithm for RandomAlgorithm {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Random
    }

    fn pool(&self) -> &BackendPool {
        &self.pool
    }

    fn next_server(&self) -> Result<Arc<BackendServer>> {
        self.pool.with_members(|members| {
            if members.is_empty() {
                return Err(BalancerError::NoBackendAvailable);
            }
            let index = rand::thread_rng().gen_range(0..members.len());
            Ok(members[index].clone())
        })
    }
}
