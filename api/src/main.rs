mod auth;
mod config;
mod db;
mod errors;
mod metrics;
mod model;
mod rest;
mod store;
mod validate;

use anyhow::Context;
use axum::{routing::get, Router};
use config::{redact_url, Backend, Config};
use std::sync::Arc;
use store::{MemoryStore, PgStore, Storage};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting IoT Device API");

    if let Err(e) = run().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }

    info!("Shutting down");
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("HTTP server: {}", config.http_addr);

    metrics::init_metrics().context("Failed to register metrics")?;

    let store = build_store(&config).await?;

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(store, &config.auth_token));

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.http_addr))?;

    info!("HTTP server listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn Storage>> {
    match config.backend {
        Backend::Memory => {
            info!("Store backend: in-memory");
            Ok(Arc::new(MemoryStore::new()))
        }
        Backend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is not set")?;
            info!("Store backend: postgres ({})", redact_url(database_url));
            let pool = db::make_pool(database_url, &config.pool)
                .await
                .context("Failed to connect to database")?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
