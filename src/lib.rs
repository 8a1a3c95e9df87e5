//! Virtual-host aware HTTP load balancer.
//!
//! Listens on one or more ports (plain HTTP, TLS or mTLS), routes each
//! request by Host header and path prefix to a location, picks a healthy
//! backend with that location's algorithm and forwards the request.
//!
//! ```text
//! config ──▶ Balancer::from_config ──▶ RoutingTable ──▶ SelectionAlgorithm ──▶ BackendPool
//!                     │                                        ▲
//!                     └──▶ HealthMonitor (one per location) ───┘
//! ```

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod routing;

// Traffic management
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use error::{BalancerError, Result};
pub use http::Balancer;
pub use lifecycle::Shutdown;
