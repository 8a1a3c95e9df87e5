//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → wait_for_signal() returns
//!
//! Shutdown (shutdown.rs):
//!     trigger() → listeners stop accepting and drain
//!               → health monitors stop
//! ```
//!
//! # Design Decisions
//! - One broadcast channel per stoppable component
//! - Listeners drain in-flight requests within a grace period

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
