//! Backend probing.
//!
//! A probe is a `GET {base_url}{path}` that must answer 2xx with a body
//! exactly equal to the expected token, all within the probe timeout.

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::load_balancer::BackendServer;

// Largest body a probe reads before giving up.
const MAX_PROBE_BODY: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid probe uri: {0}")]
    InvalidUri(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("timed out")]
    Timeout,
    #[error("non-success status {0}")]
    Status(u16),
    #[error("failed to read body: {0}")]
    Body(String),
    #[error("unexpected body {0:?}")]
    UnexpectedBody(String),
}

/// Decides whether one backend is alive.
pub trait Prober: Send + Sync {
    fn probe(&self, server: &BackendServer) -> impl Future<Output = Result<(), ProbeError>> + Send;
}

/// Production prober over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client<HttpConnector, Body>,
    path: String,
    expected_body: String,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(config: &HealthCheckConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeout_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            path: config.path.clone(),
            expected_body: config.expected_body.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn fetch(&self, uri: Uri) -> Result<(), ProbeError> {
        let request = Request::get(uri)
            .header("user-agent", "vhost-balancer-health-check")
            .body(Body::empty())
            .map_err(|e| ProbeError::InvalidUri(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ProbeError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let bytes = axum::body::to_bytes(Body::new(response.into_body()), MAX_PROBE_BODY)
            .await
            .map_err(|e| ProbeError::Body(e.to_string()))?;

        if bytes.as_ref() != self.expected_body.as_bytes() {
            return Err(ProbeError::UnexpectedBody(
                String::from_utf8_lossy(&bytes).into_owned(),
            ));
        }
        Ok(())
    }
}

impl Prober for HttpProber {
    async fn probe(&self, server: &BackendServer) -> Result<(), ProbeError> {
        let target = format!("{}{}", server.base_url(), self.path);
        let uri: Uri = target
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| ProbeError::InvalidUri(e.to_string()))?;

        match time::timeout(self.timeout, self.fetch(uri)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout),
        }
    }
}
