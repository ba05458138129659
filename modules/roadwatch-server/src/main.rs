use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use roadwatch_domains::faults::PgFaultStore;
use roadwatch_domains::geo::ReconciliationEngine;
use roadwatch_server::routes;

#[derive(Parser)]
#[command(name = "roadwatch-server", about = "Road fault ingestion and neighborhood reports")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, default_value = "./config/roadwatch.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting roadwatch-server");

    let cli = Cli::parse();

    let config_path = cli.config.canonicalize().with_context(|| {
        format!(
            "Config file not found: {}. Create one or specify --config <path>",
            cli.config.display()
        )
    })?;
    tracing::info!(config = %config_path.display(), "Loading config");

    let file_config = Arc::new(roadwatch_core::file_config::load_config(&config_path)?);
    let port = file_config.server.port;

    let config = roadwatch_core::AppConfig::from_env()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Migrations complete");

    let http_client = reqwest::Client::builder()
        .timeout(file_config.geocoding.timeout())
        .build()?;

    let engine = ReconciliationEngine::from_config(
        &file_config.geocoding,
        &http_client,
        config.mexico_postal_api_key.as_deref(),
    )?;

    let deps = Arc::new(roadwatch_core::ServerDeps::new(
        Arc::new(PgFaultStore::new(pool)),
        Arc::new(engine),
        file_config,
    ));

    let app = routes::build_router(deps);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
