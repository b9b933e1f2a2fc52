//! HTTP Exporter Binary Entry Point
//!
//! Loads the configuration, starts every exporter and serves the gauges until
//! Ctrl+C or SIGTERM. Core functionality is provided by the `http_exporter`
//! library crate.

use clap::Parser;
use http_exporter::{
    collector::CollectorRegistry,
    config::AppConfig,
    logging,
    metrics::MetricRegistry,
    scheduler::{ExporterState, Scheduler},
    server::{AppState, create_router},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// HTTP Exporter - Prometheus exporter for HTTP sensors
#[derive(Parser, Debug)]
#[command(name = "http-exporter", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "HTTP_EXPORTER_CONFIG"
    )]
    config: String,

    /// Listen address (overrides config file)
    #[arg(long, env = "HTTP_EXPORTER_LISTEN_ADDR")]
    listen_addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(listen_addr) = cli.listen_addr {
        config.server.listen_addr = listen_addr;
        config.validate()?;
    }

    logging::init(&config.log)?;

    tracing::info!(
        version = VERSION,
        commit = COMMIT.unwrap_or("unknown"),
        config = %cli.config,
        "Starting HTTP Exporter"
    );

    let metrics = Arc::new(MetricRegistry::new());
    let collectors = Arc::new(CollectorRegistry::with_builtins());
    tracing::info!(types = ?collectors.types(), "Exporter types registered");
    let scheduler = Scheduler::new(collectors, Arc::clone(&metrics), config.global.clone())?;

    // Start exporters
    let cancel = CancellationToken::new();
    let exporters = config.exporters.clone();
    tracing::info!(count = exporters.len(), "Starting exporters");
    let scheduler_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { scheduler.run(exporters, cancel).await }
    });

    // Create web server state
    let app_state = AppState {
        metrics,
        version: VERSION.to_string(),
    };
    let app = create_router(app_state, &config.server.endpoint);

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr()).await?;
    let addr = listener.local_addr()?;

    tracing::info!(
        addr = %addr,
        endpoint = %config.server.endpoint,
        "Scrape server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    // The server may also stop on its own; exporters follow it down.
    cancel.cancel();
    let reports = scheduler_task.await?;
    let aborted = reports
        .iter()
        .filter(|r| r.state == ExporterState::Aborted)
        .count();

    tracing::info!(
        exporters = reports.len(),
        aborted,
        "Shutdown complete"
    );
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then signal exporters to stop.
async fn shutdown_signal(cancel: CancellationToken) {
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

    tracing::info!("Shutting down exporters...");
    cancel.cancel();
}
