//! Error types and HTTP status mapping.
//!
//! Construction-time variants (`Configuration`, `Tls`, `ListenerBind`) and
//! `ListenersStopped` propagate to `main`. Everything else is a per-request condition that
//! ends at the request handler as a status code.

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Every failure the balancer can produce.
#[derive(Debug, thiserror::Error)]
pub enum BalancerError {
    /// Invalid algorithm name, negative weight, or other bad configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The algorithm's eligible set is empty.
    #[error("no backend available")]
    NoBackendAvailable,

    /// A listener could not bind its port.
    #[error("failed to bind listener on port {port}: {source}")]
    ListenerBind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Every listener ended without a shutdown request.
    #[error("listeners stopped unexpectedly: {0}")]
    ListenersStopped(String),

    /// Certificate, key or CA bundle could not be loaded.
    #[error("tls error: {0}")]
    Tls(String),

    /// No bindings are registered for this host on this port.
    #[error("no routes registered for host {host} on port {port}")]
    UnknownHost { host: String, port: u16 },

    /// The host is known but no path prefix matches.
    #[error("no route matches {host}{path}")]
    NoRouteMatch { host: String, path: String },

    /// The forwarding URL for the chosen backend could not be built.
    #[error("invalid backend url {url}: {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    /// The backend could not be reached or broke the connection.
    #[error("upstream request failed: {0}")]
    Upstream(String),
}

impl BalancerError {
    /// Returns the HTTP status code corresponding to this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownHost { .. } | Self::NoBackendAvailable | Self::Upstream(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::NoRouteMatch { .. } => StatusCode::NOT_FOUND,
            Self::Configuration(_)
            | Self::Tls(_)
            | Self::ListenerBind { .. }
            | Self::ListenersStopped(_)
            | Self::InvalidBackendUrl { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short client-facing message; internal details stay in the logs.
    fn public_message(&self) -> &'static str {
        match self {
            Self::UnknownHost { .. } => "host not found",
            Self::NoRouteMatch { .. } => "no matching route",
            Self::NoBackendAvailable => "backend unavailable",
            Self::Upstream(_) => "bad gateway",
            Self::InvalidBackendUrl { .. } => "invalid backend url",
            Self::Configuration(_)
            | Self::Tls(_)
            | Self::ListenerBind { .. }
            | Self::ListenersStopped(_) => "internal error",
        }
    }
}

impl IntoResponse for BalancerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = Response::new(Body::from(self.public_message()));
        *response.status_mut() = status;
        response
    }
}

pub type Result<T, E = BalancerError> = std::result::Result<T, E>;
