//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (local port, Host header, path)
//!     → matcher.rs (normalize host, clean path)
//!     → router.rs (port → host → first matching prefix)
//!     → Return: Binding, UnknownHost or NoRouteMatch
//!
//! Table construction (at startup):
//!     ProxyEntry[] → one algorithm per location → register in config order
//! ```
//!
//! # Design Decisions
//! - Table built once, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - First match wins (configuration order)

pub mod matcher;
pub mod router;

pub use router::{Binding, RoutingTable};
