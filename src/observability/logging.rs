//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Pick pretty or JSON output
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - Failure to initialize is returned, never panics

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ObservabilityConfig;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(&config.log_level))?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init()?;
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()?;
    }

    Ok(())
}

fn default_directives(level: &str) -> String {
    format!("vhost_balancer={level},tower_http={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_crate_and_http_layers() {
        assert_eq!(
            default_directives("debug"),
            "vhost_balancer=debug,tower_http=debug"
        );
    }
}
