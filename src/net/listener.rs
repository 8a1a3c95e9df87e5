//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind `{bind_address}:{port}` for each configured port
//! - Report bind failures with the port that failed
//!
//! Sockets are bound synchronously so every port is known to be open (or
//! known to have failed) before any of them starts serving.

use std::net::TcpListener;

use crate::error::{BalancerError, Result};

/// Bind a non-blocking listener ready to hand to the async server.
pub fn bind_listener(bind_address: &str, port: u16) -> Result<TcpListener> {
    let bind_err = |source| BalancerError::ListenerBind { port, source };

    let listener = TcpListener::bind((bind_address, port)).map_err(bind_err)?;
    listener.set_nonblocking(true).map_err(bind_err)?;

    let local_addr = listener.local_addr().map_err(bind_err)?;
    tracing::info!(address = %local_addr, "Listener bound");

    Ok(listener)
}
