//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (active.rs, one task per location)
//!     → probe.rs: GET {backend}/ping, expect "Pong"
//!     → collect outcomes (no locks held)
//!     → BackendPool::apply_probe_results (one critical section)
//! ```
//!
//! # Design Decisions
//! - Every monitor has its own stop handle
//! - A single failed probe removes a backend; a single success restores it
//! - The prober is a trait so the monitor can be driven without sockets

pub mod active;
pub mod probe;

pub use active::{HealthMonitor, MonitorHandle};
pub use probe::{HttpProber, ProbeError, Prober};
