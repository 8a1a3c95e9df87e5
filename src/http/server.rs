//! Balancer setup and request dispatch.
//!
//! # Responsibilities
//! - Build the routing table and one algorithm per location from config
//! - Spawn one health monitor per location
//! - Bind one listener per distinct port (plain, TLS or mTLS)
//! - Resolve each request (host, prefix) and forward it to a backend
//! - Map routing and upstream failures to status codes
//! - Drain listeners and stop monitors on shutdown

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, Request};
use axum::response::{IntoResponse, Response};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::error::{BalancerError, Result};
use crate::health::{HealthMonitor, HttpProber, MonitorHandle};
use crate::http::forward::Forwarder;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{build_algorithm, AlgorithmKind, BackendServer};
use crate::net::{bind_listener, load_tls_config};
use crate::observability::metrics;
use crate::routing::RoutingTable;

type ServeResult = (u16, std::io::Result<()>);

// Time in-flight requests get to finish once shutdown starts.
const DRAIN_GRACE: Duration = Duration::from_secs(10);

/// State injected into the per-port handler.
#[derive(Clone)]
struct PortState {
    port: u16,
    routes: Arc<RoutingTable>,
    forwarder: Forwarder,
}

/// The whole balancer: routing table, monitors and listeners.
pub struct Balancer {
    bind_address: String,
    routes: Arc<RoutingTable>,
    tls: HashMap<u16, RustlsConfig>,
    monitors: Vec<HealthMonitor<HttpProber>>,
    forwarder: Forwarder,
    shutdown: Shutdown,
}

impl Balancer {
    /// Build every algorithm, binding and monitor described by `config`.
    ///
    /// Unknown algorithm names, negative weights and unreadable TLS
    /// material are fatal here. For a port shared by several proxies, the
    /// first proxy's TLS settings apply.
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let mut routes = RoutingTable::new();
        let mut tls = HashMap::new();
        let mut seen_ports = HashSet::new();
        let mut monitors = Vec::new();
        let prober = HttpProber::new(&config.health_check);

        for proxy in &config.proxies {
            if seen_ports.insert(proxy.port) {
                if let Some(tls_config) = &proxy.tls {
                    tls.insert(proxy.port, load_tls_config(tls_config)?);
                }
            }

            for location in &proxy.locations {
                let kind: AlgorithmKind = location.algorithm.parse()?;
                let servers = location
                    .backends
                    .iter()
                    .map(|b| BackendServer::from_config(b, config.defaults.weight).map(Arc::new))
                    .collect::<Result<Vec<_>>>()?;

                let algorithm = build_algorithm(kind, servers);
                routes.register_binding(proxy.port, &proxy.host, &location.path, algorithm.clone());

                let interval = location
                    .health_check_interval_secs
                    .unwrap_or(config.health_check.interval_secs);
                monitors.push(HealthMonitor::new(
                    format!("{}:{}{}", proxy.host, proxy.port, location.path),
                    algorithm,
                    prober.clone(),
                    Duration::from_secs(interval),
                ));

                tracing::debug!(
                    port = proxy.port,
                    host = %proxy.host,
                    prefix = %location.path,
                    algorithm = %kind,
                    backends = location.backends.len(),
                    "Registered location"
                );
            }
        }

        Ok(Self {
            bind_address: config.bind_address.clone(),
            routes: Arc::new(routes),
            tls,
            monitors,
            forwarder: Forwarder::new(Duration::from_secs(config.timeouts.connect_secs)),
            shutdown: Shutdown::new(),
        })
    }

    pub fn routes(&self) -> &Arc<RoutingTable> {
        &self.routes
    }

    /// Handle that stops a running balancer when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// The request handler for one listening port.
    pub fn router_for_port(&self, port: u16) -> Router {
        let state = PortState {
            port,
            routes: self.routes.clone(),
            forwarder: self.forwarder.clone(),
        };

        Router::new().fallback(dispatch).with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get("x-request-id")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id,
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// Serve until the shutdown handle fires.
    ///
    /// A port that cannot be bound is logged and skipped; the call fails
    /// only if no port could be bound at all.
    pub async fn start(self) -> Result<()> {
        let mut shutdown_rx = self.shutdown.subscribe();

        let mut listeners = Vec::new();
        let mut first_error = None;
        for port in self.routes.ports() {
            match bind_listener(&self.bind_address, port) {
                Ok(listener) => listeners.push((port, listener)),
                Err(e) => {
                    tracing::error!(port, error = %e, "Skipping port");
                    first_error.get_or_insert(e);
                }
            }
        }
        if listeners.is_empty() {
            return Err(first_error.unwrap_or_else(|| {
                BalancerError::Configuration("no ports configured".to_string())
            }));
        }

        let handle = Handle::new();
        let mut servers = JoinSet::new();
        for (port, listener) in listeners {
            let app = self
                .router_for_port(port)
                .into_make_service_with_connect_info::<SocketAddr>();

            match self.tls.get(&port) {
                Some(tls) => {
                    let server =
                        axum_server::from_tcp_rustls(listener, tls.clone()).handle(handle.clone());
                    servers.spawn(async move { (port, server.serve(app).await) });
                }
                None => {
                    let server = axum_server::from_tcp(listener).handle(handle.clone());
                    servers.spawn(async move { (port, server.serve(app).await) });
                }
            }
            tracing::info!(port, tls = self.tls.contains_key(&port), "Serving");
        }

        let monitors: Vec<MonitorHandle> =
            self.monitors.into_iter().map(HealthMonitor::spawn).collect();

        let outcome = supervise(&mut servers, &mut shutdown_rx).await;

        handle.graceful_shutdown(Some(DRAIN_GRACE));
        while servers.join_next().await.is_some() {}

        for monitor in monitors {
            monitor.stop().await;
        }

        tracing::info!("Balancer stopped");
        outcome
    }
}

/// Wait for a shutdown request or for every listener to end.
///
/// Listeners ending on their own is an error carrying the first failure.
async fn supervise(
    servers: &mut JoinSet<ServeResult>,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<()> {
    let mut first_failure = None;
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Shutdown requested, draining listeners");
                return Ok(());
            }
            joined = servers.join_next() => match joined {
                Some(Ok((port, Ok(())))) => {
                    tracing::warn!(port, "Listener stopped");
                    first_failure.get_or_insert_with(|| format!("listener on port {port} stopped"));
                }
                Some(Ok((port, Err(e)))) => {
                    tracing::error!(port, error = %e, "Listener failed");
                    first_failure.get_or_insert_with(|| format!("listener on port {port} failed: {e}"));
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, "Listener task panicked");
                    first_failure.get_or_insert_with(|| format!("listener task panicked: {e}"));
                }
                None => {
                    tracing::error!("All listeners stopped");
                    return Err(BalancerError::ListenersStopped(
                        first_failure.unwrap_or_else(|| "no listener running".to_string()),
                    ));
                }
            },
        }
    }
}

/// Resolve, select and forward one request.
async fn dispatch(State(state): State<PortState>, request: Request<Body>) -> Response {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let response = match route(&state, request, client_addr).await {
        Ok(response) => response,
        Err(e) => {
            match &e {
                BalancerError::UnknownHost { .. } | BalancerError::NoRouteMatch { .. } => {
                    tracing::warn!(port = state.port, error = %e, "Request not routed");
                }
                _ => tracing::error!(port = state.port, error = %e, "Request failed"),
            }
            e.into_response()
        }
    };

    metrics::record_request(state.port, response.status().as_u16());
    response
}

async fn route(
    state: &PortState,
    request: Request<Body>,
    client_addr: Option<SocketAddr>,
) -> Result<Response> {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
        .unwrap_or_default()
        .to_string();

    let binding = state.routes.resolve(state.port, &host, request.uri().path())?;
    let backend = binding.algorithm.next_server()?;
    let count = backend.increment_request_count();
    metrics::record_dispatch(&backend.address());

    tracing::debug!(
        backend = %backend.address(),
        prefix = %binding.prefix,
        request_count = count,
        "Proxying request"
    );

    state.forwarder.forward(&backend, request, client_addr).await
}
