//! dbscrape Binary Entry Point
//!
//! Runs the exporter: one collection pass per scrape of the telemetry path.
//! Core functionality is provided by the `dbscrape` library crate.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dbscrape::{
    config::{AppConfig, parse_duration},
    orchestrator::Orchestrator,
    probe::ProbeRegistry,
    server::{AppState, create_router},
    source::MySqlSource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// dbscrape - Database Introspection Exporter
#[derive(Parser, Debug)]
#[command(name = "dbscrape", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "DBSCRAPE_CONFIG"
    )]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "DBSCRAPE_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "DBSCRAPE_SERVER_PORT")]
    server_port: Option<u16>,

    /// Database DSN (overrides config file)
    #[arg(long, env = "DBSCRAPE_DSN")]
    dsn: Option<String>,

    /// Default scrape timeout, e.g. `10s` (overrides config file)
    #[arg(long, value_parser = parse_duration)]
    scrape_timeout: Option<Duration>,

    /// Print the registered probes and exit
    #[arg(long)]
    list_probes: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dbscrape=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration from file
    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    if let Some(dsn) = cli.dsn {
        config.database.dsn = dsn;
    }
    if let Some(timeout) = cli.scrape_timeout {
        config.scrape.timeout = timeout;
    }
    config.validate()?;

    // Build probe registry
    let mut registry = ProbeRegistry::with_defaults(&config.scrape.namespace)?;
    registry.apply_toggles(&config.scrape.probes)?;

    if cli.list_probes {
        for info in registry.list() {
            println!(
                "{:<32} {:<8} min={:<6} {}",
                info.name,
                if info.enabled { "enabled" } else { "disabled" },
                info.min_version.to_string(),
                info.help
            );
        }
        return Ok(());
    }

    for probe in registry.enabled() {
        tracing::info!(probe = %probe.name(), "Probe enabled");
    }

    // Build data source
    let source = Arc::new(MySqlSource::new(
        &config.database.connection_url(),
        config.database.max_connections,
        config.database.connect_timeout,
    )?);

    let orchestrator = Orchestrator::new(
        Arc::new(registry),
        Arc::clone(&source) as Arc<dyn dbscrape::DataSource>,
        config.scrape_options(),
    )?;

    let app_state = AppState {
        orchestrator: Arc::new(orchestrator),
        scrape_timeout: config.scrape.timeout,
        timeout_offset: config.scrape.timeout_offset,
    };

    // Build Axum router
    let app = create_router(app_state, &config.server.telemetry_path);

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    tracing::info!(
        "Listening on: http://{}{}",
        addr,
        config.server.telemetry_path
    );
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Closing database pool...");
    source.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
