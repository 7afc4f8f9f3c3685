use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

mod auth;
mod config;
mod error;
mod handlers;
mod hub;
mod ids;
mod models;
mod notifications;
mod permissions;
mod presence;
mod ratelimit;
mod state;
mod store;
mod voice;
mod ws;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::store::{memory::MemoryStore, sql, Store};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }

    tracing::info!("Starting Mango server v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn Store> = if config.database.url.is_empty() {
        tracing::warn!("no database.url configured — running with the in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let pool = sql::init_pool(&config.database).await?;
        tracing::info!("Database connected");
        sql::run_migrations(&pool).await?;
        tracing::info!("Migrations complete");
        Arc::new(sql::SqlStore::new(pool))
    };

    let state = AppState::new(store, config.clone());

    let presence_cleanup = state.presence.clone();
    tokio::spawn(async move { presence_cleanup.cleanup_loop().await });

    state.rate_limiters.spawn_cleanup_tasks();

    let app = handlers::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Mango server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    tracing::info!("shutdown signal received");
}
