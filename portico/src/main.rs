//! # Portico Entry Point
//!
//! The gateway executable. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments, sets up tracing, and
//!    loads the TOML configuration.
//! 2. **Catalog**: Loads the compiled descriptor set into the message catalog
//!    and refuses to start if it is empty.
//! 3. **Wiring**: Builds the directory, channel cache, and gateway core, then
//!    mounts the configured routes on an axum server.
//! 4. **Shutdown**: On interrupt, stops accepting requests and closes every
//!    cached backend channel.
mod config;
mod server;

use anyhow::Context;
use clap::Parser;
use config::GatewayConfig;
use portico_core::catalog::MessageCatalog;
use portico_core::channel::{ChannelCache, TonicDialer};
use portico_core::directory::{DirectoryResolver, StaticDirectory};
use portico_core::gateway::Gateway;
use portico_core::health::HealthProber;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "portico", about = "HTTP to gRPC protocol translation gateway")]
struct Cli {
    /// Path to the gateway configuration file.
    #[arg(short, long, default_value = "portico.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portico=info,portico_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Cli::parse();
    let config = GatewayConfig::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;

    let descriptor_bytes = std::fs::read(&config.descriptor_set)
        .with_context(|| format!("reading descriptor set {}", config.descriptor_set.display()))?;
    let catalog = MessageCatalog::from_descriptor_set(&descriptor_bytes)
        .context("decoding descriptor set")?;
    anyhow::ensure!(
        !catalog.is_empty(),
        "descriptor set {} contains no message types",
        config.descriptor_set.display()
    );

    let directory = Arc::new(StaticDirectory::new());
    for (service, addr) in &config.directory {
        directory.insert(service.clone(), addr.clone());
    }
    let resolver = DirectoryResolver::new(directory)
        .with_timeout(Duration::from_secs(config.lookup_timeout_secs));
    let dialer = TonicDialer::new(Duration::from_secs(config.connect_timeout_secs));
    let prober = HealthProber::new(Duration::from_secs(config.probe_timeout_secs));
    let gateway = Arc::new(Gateway::new(
        catalog,
        ChannelCache::new(dialer, resolver, prober),
    ));

    let request_timeout = Duration::from_secs(config.request_timeout_secs);
    let router = server::router(Arc::clone(&gateway), &config.endpoints, request_timeout)
        .context("mounting routes")?;

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(
        addr = %config.listen_addr,
        routes = config.endpoints.len(),
        "gateway listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await
        .context("serving HTTP")?;

    gateway.shutdown().await;
    tracing::info!("gateway stopped");
    Ok(())
}
