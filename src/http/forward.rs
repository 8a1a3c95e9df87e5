//! Upstream request forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the chosen backend
//! - Strip hop-by-hop headers in both directions
//! - Append the client address to `X-Forwarded-For`
//! - Stream the backend response back unchanged otherwise
//!
//! The client's `Host` header is kept so backends see the virtual host.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Request, Response, Uri, Version};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::error::{BalancerError, Result};
use crate::load_balancer::BackendServer;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Shared HTTP client for talking to backends.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
}

impl Forwarder {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }

    /// Send `request` to `backend` and return its response.
    pub async fn forward(
        &self,
        backend: &BackendServer,
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response<Body>> {
        let (mut parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target = format!("{}{}", backend.base_url(), path_and_query);
        let uri: Uri = target
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| BalancerError::InvalidBackendUrl {
                url: target.clone(),
                reason: e.to_string(),
            })?;

        // HTTP/2 clients carry the host in the URI authority only.
        if !parts.headers.contains_key(header::HOST) {
            if let Some(value) = parts
                .uri
                .authority()
                .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
            {
                parts.headers.insert(header::HOST, value);
            }
        }

        strip_hop_by_hop(&mut parts.headers);
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut parts.headers, addr);
        }

        parts.uri = uri;
        parts.version = Version::HTTP_11;

        let response = self
            .client
            .request(Request::from_parts(parts, body))
            .await
            .map_err(|e| BalancerError::Upstream(e.to_string()))?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, addr: SocketAddr) {
    let ip = addr.ip().to_string();
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.is_empty() => format!("{prior}, {ip}"),
        _ => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
