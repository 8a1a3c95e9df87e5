//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Interface every listener binds to (e.g., "0.0.0.0").
    pub bind_address: String,

    /// Values applied where a backend entry leaves them out.
    pub defaults: DefaultsConfig,

    /// Health probe settings shared by every location.
    pub health_check: HealthCheckConfig,

    /// Timeouts for upstream connections.
    pub timeouts: TimeoutConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Virtual hosts, one entry per (port, host).
    pub proxies: Vec<ProxyEntry>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            defaults: DefaultsConfig::default(),
            health_check: HealthCheckConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            proxies: Vec::new(),
        }
    }
}

/// Fallback values for backend entries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Weight for backends that do not set one.
    pub weight: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self { weight: 1 }
    }
}

/// One virtual host served on one port.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyEntry {
    /// Listening port.
    pub port: u16,

    /// Virtual host matched against the Host header (port stripped).
    pub host: String,

    /// TLS termination for this port. Absent means plain HTTP.
    #[serde(default)]
    pub tls: Option<TlsConfig>,

    /// Path bindings, matched in order; first match wins.
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

/// TLS configuration for a listener.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,

    /// CA bundle (PEM) for client certificates. Setting it enables mTLS.
    #[serde(default)]
    pub client_ca_path: Option<String>,
}

/// A path prefix bound to one selection algorithm over a backend set.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationConfig {
    /// Literal path prefix (e.g., "/api").
    pub path: String,

    /// Algorithm name: random, round-robin, weighted-round-robin.
    pub algorithm: String,

    /// Overrides `health_check.interval_secs` for this location.
    #[serde(default)]
    pub health_check_interval_secs: Option<u64>,

    /// Backends balanced by this location.
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend host name or IP.
    pub host: String,

    /// Backend port.
    pub port: u16,

    /// Weight for weighted round-robin. Signed so that a negative value
    /// surfaces as a validation error instead of a parse error.
    #[serde(default)]
    pub weight: Option<i64>,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Path to probe on every backend.
    pub path: String,

    /// Body a live backend answers with.
    pub expected_body: String,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Health check timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: "/ping".to_string(),
            expected_body: "Pong".to_string(),
            interval_secs: 10,
            timeout_secs: 2,
        }
    }
}

/// Timeout configuration for upstream connections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect_secs: 5 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
