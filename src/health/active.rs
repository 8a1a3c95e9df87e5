//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend of one location
//! - Apply the whole pass to the location's pool in one step
//! - Stop promptly when its shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::health::probe::{HttpProber, Prober};
use crate::lifecycle::Shutdown;
use crate::load_balancer::{HealthState, ProbeOutcome, SelectionAlgorithm};
use crate::observability::metrics;

/// Periodic prober for one algorithm's backends.
pub struct HealthMonitor<P = HttpProber> {
    label: String,
    algorithm: Arc<dyn SelectionAlgorithm>,
    prober: P,
    interval: Duration,
}

impl<P: Prober + 'static> HealthMonitor<P> {
    /// `label` names the location in logs (e.g., `example.com:8080/api`).
    pub fn new(
        label: impl Into<String>,
        algorithm: Arc<dyn SelectionAlgorithm>,
        prober: P,
        interval: Duration,
    ) -> Self {
        Self {
            label: label.into(),
            algorithm,
            prober,
            interval,
        }
    }

    /// Probe on every tick until `shutdown` fires. The first pass runs at once.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            location = %self.label,
            algorithm = %self.algorithm.kind(),
            interval_secs = self.interval.as_secs_f64(),
            backends = self.algorithm.all_servers().len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!(location = %self.label, "Health monitor stopping");
                    break;
                }
            }
        }
    }

    /// Run the monitor on its own task with its own stop signal.
    pub fn spawn(self) -> MonitorHandle {
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        let task = tokio::spawn(self.run(rx));
        MonitorHandle { shutdown, task }
    }

    /// One probe pass. Backends are probed concurrently, so a pass takes
    /// about one probe timeout however many backends hang. Probes run
    /// without touching the pool lock.
    pub async fn check_all(&self) {
        let servers = self.algorithm.all_servers();
        let results = join_all(servers.iter().map(|server| self.prober.probe(server))).await;

        let mut outcomes = Vec::with_capacity(servers.len());
        for (server, result) in servers.into_iter().zip(results) {
            let status = match result {
                Ok(()) => HealthState::Healthy,
                Err(e) => {
                    tracing::warn!(
                        location = %self.label,
                        backend = %server.address(),
                        error = %e,
                        "Health check failed"
                    );
                    HealthState::Unhealthy
                }
            };
            metrics::record_backend_health(&server.address(), status == HealthState::Healthy);
            outcomes.push(ProbeOutcome { server, status });
        }

        let change = self.algorithm.pool().apply_probe_results(&outcomes);

        for server in &change.added {
            tracing::info!(location = %self.label, backend = %server.address(), "Backend is healthy");
        }
        for server in &change.removed {
            tracing::info!(location = %self.label, backend = %server.address(), "Backend is unhealthy");
        }

        tracing::debug!(
            location = %self.label,
            healthy = self.algorithm.healthy_servers().len(),
            total = outcomes.len(),
            "Health check pass complete"
        );
    }
}

/// Stop handle for a spawned monitor.
#[derive(Debug)]
pub struct MonitorHandle {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the monitor and wait for its task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Health monitor task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
