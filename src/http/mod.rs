//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (axum-server)
//!     → server.rs (request ID, trace span, dispatch)
//!     → routing table resolves (port, host, path)
//!     → algorithm picks a backend
//!     → forward.rs (rewrite URI, strip hop headers, X-Forwarded-For)
//!     → stream backend response to the client
//! ```

pub mod forward;
pub mod server;

pub use forward::Forwarder;
pub use server::Balancer;
