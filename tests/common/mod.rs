//! Shared utilities for integration tests.
//!
//! Mock backends speak the `/ping` → `Pong` health contract and echo what
//! they received, so tests can see which backend served a request and how
//! the balancer rewrote it.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use vhost_balancer::config::{parse_config, ProxyConfig};
use vhost_balancer::{Balancer, Shutdown};

/// Initializes a tracing subscriber for test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[derive(Clone)]
struct BackendState {
    name: &'static str,
    healthy: Arc<AtomicBool>,
    hits: Arc<AtomicUsize>,
    ping_delay: Duration,
}

/// A running mock backend.
pub struct MockBackend {
    pub name: &'static str,
    pub addr: SocketAddr,
    pub healthy: Arc<AtomicBool>,
    pub hits: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a backend that answers `/ping` with `Pong` and echoes everything else.
pub async fn start_backend(name: &'static str) -> MockBackend {
    start_backend_with_ping_delay(name, Duration::ZERO).await
}

/// Like [`start_backend`], but `/ping` answers only after `delay`.
pub async fn start_backend_with_ping_delay(name: &'static str, delay: Duration) -> MockBackend {
    let state = BackendState {
        name,
        healthy: Arc::new(AtomicBool::new(true)),
        hits: Arc::new(AtomicUsize::new(0)),
        ping_delay: delay,
    };

    let app = Router::new()
        .route("/ping", get(ping))
        .fallback(echo)
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        name,
        addr,
        healthy: state.healthy,
        hits: state.hits,
    }
}

async fn ping(State(state): State<BackendState>) -> Response {
    tokio::time::sleep(state.ping_delay).await;
    if state.healthy.load(Ordering::SeqCst) {
        "Pong".into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "down").into_response()
    }
}

async fn echo(
    State(state): State<BackendState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let mut response = format!("{} {} {}", state.name, method, uri).into_response();
    let out = response.headers_mut();
    out.insert("x-backend", HeaderValue::from_static(state.name));
    for (seen, name) in [
        ("x-seen-host", "host"),
        ("x-seen-forwarded-for", "x-forwarded-for"),
        ("x-seen-connection", "connection"),
    ] {
        if let Some(value) = headers.get(name) {
            out.insert(seen, value.clone());
        }
    }
    response
}

/// `{ host, port, weight }` entry for a mock backend.
pub fn backend_entry(backend: &MockBackend, weight: u32) -> String {
    format!(
        "{{ host = \"127.0.0.1\", port = {}, weight = {weight} }}",
        backend.port()
    )
}

/// Parse a TOML document, panicking on any error.
pub fn config_from(raw: &str) -> ProxyConfig {
    parse_config(raw).unwrap()
}

/// A running balancer and its stop handle.
pub struct RunningBalancer {
    pub shutdown: Shutdown,
    pub task: JoinHandle<vhost_balancer::Result<()>>,
}

impl RunningBalancer {
    pub async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(15), self.task)
            .await
            .expect("balancer did not stop in time")
            .unwrap();
        assert!(result.is_ok());
    }
}

/// Start a balancer and wait until every port in `ports` accepts connections.
pub async fn start_balancer(config: &ProxyConfig, ports: &[u16]) -> RunningBalancer {
    let balancer = Balancer::from_config(config).unwrap();
    let shutdown = balancer.shutdown_handle();
    let task = tokio::spawn(balancer.start());

    for port in ports {
        wait_for_port(*port).await;
    }

    RunningBalancer { shutdown, task }
}

pub async fn wait_for_port(port: u16) {
    for _ in 0..100 {
        if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("port {port} never started accepting");
}

/// Plain HTTP client that never reuses connections between tests.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// PEM material for a CA, a server certificate and a client certificate.
pub struct TestPki {
    pub ca_pem: String,
    pub server_cert_pem: String,
    pub server_key_pem: String,
    pub client_cert_pem: String,
    pub client_key_pem: String,
}

/// Generate a throwaway CA with one server (`localhost`) and one client leaf.
pub fn generate_pki() -> TestPki {
    let ca_key = KeyPair::generate().unwrap();
    let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    ca_params
        .distinguished_name
        .push(DnType::CommonName, "vhost-balancer test ca");
    let ca_cert = ca_params.self_signed(&ca_key).unwrap();

    let server_key = KeyPair::generate().unwrap();
    let mut server_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    let server_cert = server_params
        .signed_by(&server_key, &ca_cert, &ca_key)
        .unwrap();

    let client_key = KeyPair::generate().unwrap();
    let mut client_params = CertificateParams::new(Vec::<String>::new()).unwrap();
    client_params
        .distinguished_name
        .push(DnType::CommonName, "test client");
    client_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
    let client_cert = client_params
        .signed_by(&client_key, &ca_cert, &ca_key)
        .unwrap();

    TestPki {
        ca_pem: ca_cert.pem(),
        server_cert_pem: server_cert.pem(),
        server_key_pem: server_key.serialize_pem(),
        client_cert_pem: client_cert.pem(),
        client_key_pem: client_key.serialize_pem(),
    }
}

/// Write `content` to a temp file that lives as long as the handle.
pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}
