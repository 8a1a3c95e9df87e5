//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track health state (Healthy/Unhealthy) and when it was last probed
//! - Hold the mutable weight used by weighted round-robin
//! - Count dispatched requests

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use uuid::Uuid;

use crate::config::BackendConfig;
use crate::error::{BalancerError, Result};

/// Largest accepted weight. Weighted round-robin materialises one sequence
/// slot per unit of weight, so the cap bounds each pool rebuild.
pub const MAX_WEIGHT: u32 = 10_000;

/// Health State enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

#[derive(Debug)]
struct BackendState {
    weight: u32,
    status: HealthState,
    request_count: u64,
    last_checked: SystemTime,
}

/// A single backend server.
///
/// Identity and address are fixed at construction. Everything that changes
/// at runtime sits behind one lock so readers always see a consistent
/// status/weight pair.
#[derive(Debug)]
pub struct BackendServer {
    id: Uuid,
    host: String,
    port: u16,
    state: RwLock<BackendState>,
}

impl BackendServer {
    /// Create a new backend. It starts Healthy with a zero request count.
    pub fn new(host: impl Into<String>, port: u16, weight: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            host: host.into(),
            port,
            state: RwLock::new(BackendState {
                weight,
                status: HealthState::Healthy,
                request_count: 0,
                last_checked: SystemTime::now(),
            }),
        }
    }

    /// Build a backend from its config entry, falling back to `default_weight`.
    pub fn from_config(config: &BackendConfig, default_weight: u32) -> Result<Self> {
        let weight = match config.weight {
            Some(w) => checked_weight(w)?,
            None => checked_weight(i64::from(default_weight))?,
        };
        Ok(Self::new(config.host.clone(), config.port, weight))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, used as the backend label in logs and metrics.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL requests and probes are sent to.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn status(&self) -> HealthState {
        self.read().status
    }

    pub fn is_healthy(&self) -> bool {
        self.status() == HealthState::Healthy
    }

    pub fn set_status(&self, status: HealthState) {
        self.write().status = status;
    }

    /// Store a probe verdict together with the time it was taken.
    pub fn record_probe(&self, status: HealthState) {
        let mut state = self.write();
        state.status = status;
        state.last_checked = SystemTime::now();
    }

    pub fn last_checked(&self) -> SystemTime {
        self.read().last_checked
    }

    pub fn weight(&self) -> u32 {
        self.read().weight
    }

    /// Change the weight. Negative values or values above [`MAX_WEIGHT`]
    /// leave it untouched.
    pub fn set_weight(&self, weight: i64) -> Result<()> {
        let weight = checked_weight(weight)?;
        self.write().weight = weight;
        Ok(())
    }

    pub fn request_count(&self) -> u64 {
        self.read().request_count
    }

    /// Count one dispatched request and return the new total.
    pub fn increment_request_count(&self) -> u64 {
        let mut state = self.write();
        state.request_count += 1;
        state.request_count
    }

    // Writers never leave BackendState half-updated; poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, BackendState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BackendState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn checked_weight(weight: i64) -> Result<u32> {
    if weight < 0 {
        return Err(BalancerError::Configuration(format!(
            "weight cannot be negative (got {weight})"
        )));
    }
    match u32::try_from(weight) {
        Ok(w) if w <= MAX_WEIGHT => Ok(w),
        _ => Err(BalancerError::Configuration(format!(
            "weight {weight} exceeds the maximum of {MAX_WEIGHT}"
        ))),
    }
}
