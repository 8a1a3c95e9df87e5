//! vhost-balancer entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use vhost_balancer::config::load_config;
use vhost_balancer::lifecycle::wait_for_signal;
use vhost_balancer::observability::{logging, metrics};
use vhost_balancer::Balancer;

#[derive(Parser, Debug)]
#[command(name = "vhost-balancer", version, about = "Virtual-host HTTP load balancer")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "balancer.toml")]
    config: PathBuf,

    /// Overrides `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load {}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("logging disabled: {e}");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        proxies = config.proxies.len(),
        "vhost-balancer starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let balancer = match Balancer::from_config(&config) {
        Ok(balancer) => balancer,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = balancer.shutdown_handle();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    match balancer.start().await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Balancer failed to start");
            ExitCode::FAILURE
        }
    }
}
