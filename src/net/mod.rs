//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured port
//!     → listener.rs (bind {bind_address}:{port})
//!     → tls.rs (optional TLS / mTLS handshake config)
//!     → Hand off to the HTTP layer (axum-server)
//! ```
//!
//! # Design Decisions
//! - One listener per distinct port, shared by every host on it
//! - TLS is optional per port; mTLS when a client CA is configured

pub mod listener;
pub mod tls;

pub use listener::bind_listener;
pub use tls::{build_server_config, load_tls_config};
