//! Weighted round-robin load balancing strategy.
//!
//! Each healthy backend appears `weight` times in a row in the dispatch
//! sequence, so weights 3, 2, 1 yield `A A A B B C` per cycle. A backend
//! with weight 0 is still probed and reported healthy but never dispatched.

use std::sync::Arc;

use crate::error::{BalancerError, Result};
use crate::load_balancer::pool::{BackendPool, Expansion};
use crate::load_balancer::{AlgorithmKind, BackendServer, SelectionAlgorithm};

#[derive(Debug)]
pub struct WeightedRoundRobinAlgorithm {
    pool: BackendPool,
}

impl WeightedRoundRobinAlgorithm {
    pub fn new(servers: Vec<Arc<BackendServer>>) -> Self {
        Self {
            pool: BackendPool::new(servers, Expansion::Weighted),
        }
    }
}

impl SelectionAlgorithm for WeightedRoundRobinAlgorithm {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::WeightedRoundRobin
    }

    fn pool(&self) -> &BackendPool {
        &self.pool
    }

    fn next_server(&self) -> Result<Arc<BackendServer>> {
        self.pool.advance().ok_or(BalancerError::NoBackendAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::{HealthState, ProbeOutcome};

    fn weighted(weights: &[u32]) -> (WeightedRoundRobinAlgorithm, Vec<Arc<BackendServer>>) {
        let servers: Vec<_> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| Arc::new(BackendServer::new("127.0.0.1", 8080 + i as u16, *w)))
            .collect();
        (WeightedRoundRobinAlgorithm::new(servers.clone()), servers)
    }

    fn picks(lb: &WeightedRoundRobinAlgorithm, n: usize) -> Vec<u16> {
        (0..n).map(|_| lb.next_server().unwrap().port()).collect()
    }

    #[test]
    fn test_three_two_one() {
        let (lb, _) = weighted(&[3, 2, 1]);
        assert_eq!(picks(&lb, 6), vec![8080, 8080, 8080, 8081, 8081, 8082]);
    }

    #[test]
    fn test_sequence_repeats() {
        let (lb, _) = weighted(&[3, 2]);
        assert_eq!(
            picks(&lb, 10),
            vec![8080, 8080, 8080, 8081, 8081, 8080, 8080, 8080, 8081, 8081]
        );
    }

    #[test]
    fn test_zero_weight_never_dispatched() {
        let (lb, _) = weighted(&[0, 1]);
        assert_eq!(lb.healthy_servers().len(), 2);
        assert_eq!(picks(&lb, 4), vec![8081; 4]);
    }

    #[test]
    fn test_all_zero_weights() {
        let (lb, _) = weighted(&[0, 0]);
        assert!(matches!(
            lb.next_server(),
            Err(BalancerError::NoBackendAvailable)
        ));
    }

    #[test]
    fn test_failed_backend_drops_out() {
        let (lb, servers) = weighted(&[2, 1]);
        lb.pool().apply_probe_results(&[
            ProbeOutcome {
                server: servers[0].clone(),
                status: HealthState::Unhealthy,
            },
            ProbeOutcome {
                server: servers[1].clone(),
                status: HealthState::Healthy,
            },
        ]);
        assert_eq!(picks(&lb, 3), vec![8081; 3]);
    }
}
