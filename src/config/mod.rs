//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → consumed once by Balancer::from_config
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BackendConfig, DefaultsConfig, HealthCheckConfig, LocationConfig, ObservabilityConfig,
    ProxyConfig, ProxyEntry, TimeoutConfig, TlsConfig,
};
