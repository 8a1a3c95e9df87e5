//! Metrics collection and exposition.
//!
//! # Metrics
//! - `balancer_requests_total` (counter): routed requests by port, status
//! - `balancer_backend_dispatch_total` (counter): requests sent per backend
//! - `balancer_backend_healthy` (gauge): 1=healthy, 0=unhealthy

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(port: u16, status: u16) {
    ::metrics::counter!(
        "balancer_requests_total",
        "port" => port.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_dispatch(backend: &str) {
    ::metrics::counter!("balancer_backend_dispatch_total", "backend" => backend.to_string())
        .increment(1);
}

pub fn record_backend_health(backend: &str, healthy: bool) {
    ::metrics::gauge!("balancer_backend_healthy", "backend" => backend.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
