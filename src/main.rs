//! Observing reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │              OBSERVING PROXY                 │
//!                       │                                              │
//!   Client Request      │  ┌─────────┐    ┌──────────┐    ┌─────────┐  │
//!   ────────────────────┼─▶│  http   │───▶│ capture  │───▶│ hyper   │──┼──▶ Upstream
//!                       │  │ server  │    │middleware│    │ client  │  │
//!   Client Response     │  └─────────┘    └────┬─────┘    └─────────┘  │
//!   ◀───────────────────┼──────────────────────┘ spawn                 │
//!                       │                      ▼                       │
//!                       │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!                       │  │ classify │──▶│ operation│──▶│ reporter │──┼──▶ Collector
//!                       │  │ + schema │   │ assembler│   │ (dedup)  │  │
//!                       │  └──────────┘   └──────────┘   └──────────┘  │
//!                       └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use api_introspector::capture::Introspector;
use api_introspector::config::{load_config, validate_proxy};
use api_introspector::http::HttpServer;
use api_introspector::lifecycle::{spawn_signal_handler, Shutdown};
use api_introspector::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "introspector")]
#[command(about = "Reverse proxy that reports the shape of the traffic it forwards", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "introspector.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    logging::init(&config.observability);

    if let Err(errors) = validate_proxy(&config) {
        for error in &errors {
            tracing::error!(error = %error, "Invalid configuration");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        upstream = %config.proxy.upstream,
        environment = %config.environment,
        enabled = config.enabled,
        "introspector starting"
    );

    let shutdown = Shutdown::new();

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr, shutdown.clone()).await?;
    }

    let introspector = Introspector::new(&config)?;
    introspector.start();

    let listener = TcpListener::bind(&config.proxy.bind_address).await?;
    let server = HttpServer::new(&config.proxy, introspector.clone())?;

    spawn_signal_handler(shutdown.clone());
    server.run(listener, shutdown).await?;

    introspector.stop().await;
    if let Some(status) = introspector.status() {
        tracing::info!(
            delivered_batches = status.delivered_batches,
            failed_batches = status.failed_batches,
            pending = status.pending,
            "Shutdown complete"
        );
    }
    Ok(())
}
