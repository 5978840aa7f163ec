//! Crmwatch HTTP server
//!
//! Starts an Axum web server exposing health, metrics, and telemetry
//! ingestion endpoints, with logging and metrics middleware on every route.

use clap::Parser;
use crmwatch::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    telemetry,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        let template = generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(&path, template)?;
                println!("Wrote configuration template to {path}");
            }
            None => print!("{template}"),
        }
        return Ok(());
    }

    // Load and validate configuration before any logging is set up, so
    // config errors reach stderr directly.
    let config = Config::from_file(&cli.config)?;

    // Guards must outlive the server or buffered log lines are lost.
    let _log_guards = telemetry::init(&config.observability);

    tracing::info!(
        environment = config.observability.environment.as_str(),
        "Starting Crmwatch server on {}:{}",
        config.server.host,
        config.server.port
    );

    let state = AppState::new(Arc::new(config.clone()))?;
    let app = handlers::app_router(state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    tracing::info!("Listening on {}", addr);
    tracing::info!("Health check available at http://{}/health", addr);
    tracing::info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
