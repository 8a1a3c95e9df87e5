//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → location's algorithm identified
//!     → pool.rs (eligible view of healthy backends)
//!     → Apply load balancing algorithm:
//!         - random.rs (uniform pick among members)
//!         - round_robin.rs (rotate through members)
//!         - weighted.rs (rotate through weight-expanded sequence)
//!     → backend.rs (count the dispatch)
//!     → Return backend or NoBackendAvailable
//! ```
//!
//! # Design Decisions
//! - Algorithms are trait objects built from a closed `AlgorithmKind`
//! - All variants share `BackendPool`; they differ only in how they pick
//! - Unhealthy backends are excluded by the health monitor, not at pick time

pub mod backend;
pub mod pool;
pub mod random;
pub mod round_robin;
pub mod weighted;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{BalancerError, Result};

pub use backend::{BackendServer, HealthState, MAX_WEIGHT};
pub use pool::{BackendPool, PoolChange, ProbeOutcome};
pub use random::RandomAlgorithm;
pub use round_robin::RoundRobinAlgorithm;
pub use weighted::WeightedRoundRobinAlgorithm;

/// The selection strategies a location can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    Random,
    RoundRobin,
    WeightedRoundRobin,
}

impl AlgorithmKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::RoundRobin => "round-robin",
            Self::WeightedRoundRobin => "weighted-round-robin",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmKind {
    type Err = BalancerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "random" | "Random" => Ok(Self::Random),
            "round-robin" | "round_robin" | "RoundRobin" => Ok(Self::RoundRobin),
            "weighted-round-robin" | "weighted_round_robin" | "WeightedRoundRobin" => {
                Ok(Self::WeightedRoundRobin)
            }
            other => Err(BalancerError::Configuration(format!(
                "unsupported algorithm {other:?}"
            ))),
        }
    }
}

/// A backend selection strategy over one location's pool.
pub trait SelectionAlgorithm: Send + Sync + fmt::Debug {
    fn kind(&self) -> AlgorithmKind;

    fn pool(&self) -> &BackendPool;

    /// Pick the backend for the next request.
    fn next_server(&self) -> Result<Arc<BackendServer>>;

    /// Every configured backend, in configuration order.
    fn all_servers(&self) -> Vec<Arc<BackendServer>> {
        self.pool().servers().to_vec()
    }

    /// Backends currently eligible for dispatch.
    fn healthy_servers(&self) -> Vec<Arc<BackendServer>> {
        self.pool().members()
    }
}

/// Build the algorithm for `kind` over `servers`.
pub fn build_algorithm(
    kind: AlgorithmKind,
    servers: Vec<Arc<BackendServer>>,
) -> Arc<dyn SelectionAlgorithm> {
    match kind {
        AlgorithmKind::Random => Arc::new(RandomAlgorithm::new(servers)),
        AlgorithmKind::RoundRobin => Arc::new(RoundRobinAlgorithm::new(servers)),
        AlgorithmKind::WeightedRoundRobin => Arc::new(WeightedRoundRobinAlgorithm::new(servers)),
    }
}
