//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, weights, intervals)
//! - Reject unknown algorithm names
//! - Detect proxies that disagree on a shared port's TLS settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashMap;
use std::fmt;

use crate::config::schema::{ProxyConfig, TlsConfig};
use crate::load_balancer::{AlgorithmKind, MAX_WEIGHT};

/// A single semantic problem, with the config path it was found at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.proxies.is_empty() {
        errors.push(ValidationError::new("proxies", "at least one proxy is required"));
    }

    if config.defaults.weight > MAX_WEIGHT {
        errors.push(ValidationError::new(
            "defaults.weight",
            format!("weight cannot exceed {MAX_WEIGHT}"),
        ));
    }

    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::new(
            "health_check.interval_secs",
            "must be greater than zero",
        ));
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "health_check.timeout_secs",
            "must be greater than zero",
        ));
    }
    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::new("health_check.path", "must start with '/'"));
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format {other:?}, expected \"pretty\" or \"json\""),
        )),
    }

    let mut tls_by_port: HashMap<u16, Option<&TlsConfig>> = HashMap::new();

    for (i, proxy) in config.proxies.iter().enumerate() {
        let at = format!("proxies[{i}]");

        if proxy.port == 0 {
            errors.push(ValidationError::new(format!("{at}.port"), "must be non-zero"));
        }
        if proxy.host.trim().is_empty() {
            errors.push(ValidationError::new(format!("{at}.host"), "must not be empty"));
        }
        if proxy.locations.is_empty() {
            errors.push(ValidationError::new(
                format!("{at}.locations"),
                "at least one location is required",
            ));
        }

        match tls_by_port.get(&proxy.port) {
            Some(existing) if *existing != proxy.tls.as_ref() => {
                errors.push(ValidationError::new(
                    format!("{at}.tls"),
                    format!(
                        "port {} is shared with another proxy using different TLS settings",
                        proxy.port
                    ),
                ));
            }
            Some(_) => {}
            None => {
                tls_by_port.insert(proxy.port, proxy.tls.as_ref());
            }
        }

        for (j, location) in proxy.locations.iter().enumerate() {
            let at = format!("{at}.locations[{j}]");

            if !location.path.starts_with('/') {
                errors.push(ValidationError::new(format!("{at}.path"), "must start with '/'"));
            }
            if let Err(e) = location.algorithm.parse::<AlgorithmKind>() {
                errors.push(ValidationError::new(format!("{at}.algorithm"), e.to_string()));
            }
            if location.health_check_interval_secs == Some(0) {
                errors.push(ValidationError::new(
                    format!("{at}.health_check_interval_secs"),
                    "must be greater than zero",
                ));
            }
            if location.backends.is_empty() {
                errors.push(ValidationError::new(
                    format!("{at}.backends"),
                    "at least one backend is required",
                ));
            }

            for (k, backend) in location.backends.iter().enumerate() {
                let at = format!("{at}.backends[{k}]");
                if backend.host.trim().is_empty() {
                    errors.push(ValidationError::new(format!("{at}.host"), "must not be empty"));
                }
                if backend.port == 0 {
                    errors.push(ValidationError::new(format!("{at}.port"), "must be non-zero"));
                }
                if let Some(weight) = backend.weight {
                    if weight < 0 {
                        errors.push(ValidationError::new(
                            format!("{at}.weight"),
                            "weight cannot be negative",
                        ));
                    } else if weight > i64::from(MAX_WEIGHT) {
                        errors.push(ValidationError::new(
                            format!("{at}.weight"),
                            format!("weight cannot exceed {MAX_WEIGHT}"),
                        ));
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
