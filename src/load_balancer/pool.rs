//! Backend pool management.
//!
//! # Responsibilities
//! - Own the full backend list of one location (configuration order)
//! - Maintain the eligible view: healthy members, dispatch sequence, cursor
//! - Apply a batch of probe results in a single critical section
//!
//! Probes never run while the view lock is held; the health monitor
//! collects outcomes first and hands them over in one call.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::load_balancer::backend::{BackendServer, HealthState};

/// How the dispatch sequence is derived from the eligible members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// Sequence equals the member list.
    Members,
    /// Each member repeated `weight` times, in member order.
    Weighted,
}

/// Result of probing one backend.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub server: Arc<BackendServer>,
    pub status: HealthState,
}

/// Membership changes produced by one probe pass.
#[derive(Debug, Default)]
pub struct PoolChange {
    pub added: Vec<Arc<BackendServer>>,
    pub removed: Vec<Arc<BackendServer>>,
}

impl PoolChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug)]
struct EligibleView {
    members: Vec<Arc<BackendServer>>,
    sequence: Vec<Arc<BackendServer>>,
    // None means "before the first element".
    cursor: Option<usize>,
}

/// State shared by every selection algorithm.
#[derive(Debug)]
pub struct BackendPool {
    servers: Vec<Arc<BackendServer>>,
    expansion: Expansion,
    view: RwLock<EligibleView>,
}

impl BackendPool {
    /// Create a pool. Backends already healthy become members in config order.
    pub fn new(servers: Vec<Arc<BackendServer>>, expansion: Expansion) -> Self {
        let members: Vec<_> = servers.iter().filter(|s| s.is_healthy()).cloned().collect();
        let sequence = expand(&members, expansion);
        Self {
            servers,
            expansion,
            view: RwLock::new(EligibleView {
                members,
                sequence,
                cursor: None,
            }),
        }
    }

    /// Every configured backend, in configuration order.
    pub fn servers(&self) -> &[Arc<BackendServer>] {
        &self.servers
    }

    /// Eligible members in the order they became healthy.
    pub fn members(&self) -> Vec<Arc<BackendServer>> {
        self.read().members.clone()
    }

    /// Snapshot of the current dispatch sequence.
    pub fn sequence(&self) -> Vec<Arc<BackendServer>> {
        self.read().sequence.clone()
    }

    /// Run `f` over the eligible members under the shared lock.
    pub fn with_members<R>(&self, f: impl FnOnce(&[Arc<BackendServer>]) -> R) -> R {
        f(&self.read().members)
    }

    /// Step the cursor and return the backend it lands on.
    ///
    /// Returns `None` when the sequence is empty.
    pub fn advance(&self) -> Option<Arc<BackendServer>> {
        let mut view = self.write();
        let len = view.sequence.len();
        if len == 0 {
            return None;
        }
        let next = match view.cursor {
            Some(c) => (c + 1) % len,
            None => 0,
        };
        view.cursor = Some(next);
        Some(view.sequence[next].clone())
    }

    /// Apply one probe pass atomically.
    ///
    /// Records every verdict on its backend, appends newly healthy backends
    /// to the members, drops failed ones and rebuilds the sequence from
    /// current weights. The cursor survives only if the sequence is unchanged.
    ///
    /// The new view is built from a snapshot outside the lock and swapped in
    /// under the write lock; if the members moved in between, it is rebuilt.
    pub fn apply_probe_results(&self, outcomes: &[ProbeOutcome]) -> PoolChange {
        let outcomes: Vec<&ProbeOutcome> = outcomes
            .iter()
            .filter(|o| self.servers.iter().any(|s| s.id() == o.server.id()))
            .collect();

        loop {
            let snapshot = self.members();
            let (members, change) = next_members(&snapshot, &outcomes);
            let sequence = expand(&members, self.expansion);

            let mut view = self.write();
            if !same_backends(&view.members, &snapshot) {
                continue;
            }
            for outcome in &outcomes {
                outcome.server.record_probe(outcome.status);
            }
            view.members = members;
            if !same_backends(&view.sequence, &sequence) {
                view.sequence = sequence;
                view.cursor = None;
            }
            return change;
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, EligibleView> {
        self.view.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EligibleView> {
        self.view.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn next_members(
    current: &[Arc<BackendServer>],
    outcomes: &[&ProbeOutcome],
) -> (Vec<Arc<BackendServer>>, PoolChange) {
    let mut members = current.to_vec();
    let mut change = PoolChange::default();

    for outcome in outcomes {
        let id = outcome.server.id();
        let present = members.iter().any(|m| m.id() == id);
        match (outcome.status, present) {
            (HealthState::Healthy, false) => {
                members.push(outcome.server.clone());
                change.added.push(outcome.server.clone());
            }
            (HealthState::Unhealthy, true) => {
                members.retain(|m| m.id() != id);
                change.removed.push(outcome.server.clone());
            }
            _ => {}
        }
    }
    (members, change)
}

fn same_backends(a: &[Arc<BackendServer>], b: &[Arc<BackendServer>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.id() == y.id())
}

fn expand(members: &[Arc<BackendServer>], expansion: Expansion) -> Vec<Arc<BackendServer>> {
    match expansion {
        Expansion::Members => members.to_vec(),
        Expansion::Weighted => members
            .iter()
            .flat_map(|m| std::iter::repeat_n(m.clone(), m.weight() as usize))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::MAX_WEIGHT;

    fn server(port: u16, weight: u32) -> Arc<BackendServer> {
        Arc::new(BackendServer::new("127.0.0.1", port, weight))
    }

    fn outcome(server: &Arc<BackendServer>, status: HealthState) -> ProbeOutcome {
        ProbeOutcome {
            server: server.clone(),
            status,
        }
    }

    fn ports(servers: &[Arc<BackendServer>]) -> Vec<u16> {
        servers.iter().map(|s| s.port()).collect()
    }

    #[test]
    fn weighted_expansion_repeats_by_weight() {
        let pool = BackendPool::new(
            vec![server(1, 3), server(2, 0), server(3, 1)],
            Expansion::Weighted,
        );
        assert_eq!(ports(&pool.sequence()), vec![1, 1, 1, 3]);
        assert_eq!(pool.members().len(), 3);
    }

    #[test]
    fn advance_starts_at_first_element_and_wraps() {
        let pool = BackendPool::new(vec![server(1, 1), server(2, 1)], Expansion::Members);
        let picks: Vec<u16> = (0..3).map(|_| pool.advance().unwrap().port()).collect();
        assert_eq!(picks, vec![1, 2, 1]);
    }

    #[test]
    fn failed_backend_leaves_and_recovered_backend_rejoins_at_end() {
        let a = server(1, 1);
        let b = server(2, 1);
        let c = server(3, 1);
        let pool = BackendPool::new(vec![a.clone(), b.clone(), c.clone()], Expansion::Members);

        let change = pool.apply_probe_results(&[
            outcome(&a, HealthState::Unhealthy),
            outcome(&b, HealthState::Healthy),
            outcome(&c, HealthState::Healthy),
        ]);
        assert_eq!(ports(&change.removed), vec![1]);
        assert_eq!(ports(&pool.members()), vec![2, 3]);
        assert!(!a.is_healthy());

        let change = pool.apply_probe_results(&[
            outcome(&a, HealthState::Healthy),
            outcome(&b, HealthState::Healthy),
            outcome(&c, HealthState::Healthy),
        ]);
        assert_eq!(ports(&change.added), vec![1]);
        assert_eq!(ports(&pool.members()), vec![2, 3, 1]);
        assert_eq!(ports(pool.servers()), vec![1, 2, 3]);
    }

    #[test]
    fn unchanged_sequence_keeps_cursor() {
        let a = server(1, 1);
        let b = server(2, 1);
        let pool = BackendPool::new(vec![a.clone(), b.clone()], Expansion::Members);

        assert_eq!(pool.advance().unwrap().port(), 1);
        let change = pool.apply_probe_results(&[
            outcome(&a, HealthState::Healthy),
            outcome(&b, HealthState::Healthy),
        ]);
        assert!(change.is_empty());
        assert_eq!(pool.advance().unwrap().port(), 2);
    }

    #[test]
    fn changed_sequence_resets_cursor() {
        let a = server(1, 1);
        let b = server(2, 1);
        let c = server(3, 1);
        let pool = BackendPool::new(vec![a.clone(), b.clone(), c.clone()], Expansion::Members);

        pool.advance();
        pool.advance();
        pool.apply_probe_results(&[outcome(&b, HealthState::Unhealthy)]);
        assert_eq!(pool.advance().unwrap().port(), 1);
    }

    #[test]
    fn weight_change_applies_on_next_pass() {
        let a = server(1, 1);
        let b = server(2, 1);
        let pool = BackendPool::new(vec![a.clone(), b.clone()], Expansion::Weighted);
        assert_eq!(ports(&pool.sequence()), vec![1, 2]);

        a.set_weight(2).unwrap();
        assert_eq!(ports(&pool.sequence()), vec![1, 2]);

        pool.apply_probe_results(&[
            outcome(&a, HealthState::Healthy),
            outcome(&b, HealthState::Healthy),
        ]);
        assert_eq!(ports(&pool.sequence()), vec![1, 1, 2]);
    }

    #[test]
    fn outcomes_for_foreign_backends_are_ignored() {
        let a = server(1, 1);
        let stranger = server(9, 1);
        let pool = BackendPool::new(vec![a], Expansion::Members);

        let change = pool.apply_probe_results(&[outcome(&stranger, HealthState::Unhealthy)]);
        assert!(change.is_empty());
        assert!(stranger.is_healthy());
    }

    #[test]
    fn rebuild_at_max_weight_stays_bounded() {
        let a = server(1, MAX_WEIGHT);
        let b = server(2, MAX_WEIGHT);
        let pool = BackendPool::new(vec![a.clone(), b.clone()], Expansion::Weighted);
        assert_eq!(pool.sequence().len(), 2 * MAX_WEIGHT as usize);

        assert!(a.set_weight(i64::from(MAX_WEIGHT) + 1).is_err());
        pool.apply_probe_results(&[
            outcome(&a, HealthState::Healthy),
            outcome(&b, HealthState::Healthy),
        ]);
        assert_eq!(pool.sequence().len(), 2 * MAX_WEIGHT as usize);
    }

    #[test]
    fn empty_pool_has_nothing_to_advance() {
        let pool = BackendPool::new(Vec::new(), Expansion::Members);
        assert!(pool.advance().is_none());
    }
}
