// Statement Analytics - Web Server
// Dashboard API over the SQLite store

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use statement_analytics::server::{router, AppState};
use statement_analytics::{init_tracing, AnalyticsEngine, AppConfig, SqliteStore, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.log_level);

    info!(version = VERSION, "🌐 Statement Analytics - Web Server");

    let store = SqliteStore::open(&config.database_path)?;
    info!(path = ?config.database_path, "✓ Database opened");

    let engine = AnalyticsEngine::new(Arc::new(store), config.engine.clone());
    let app = router(AppState { engine });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(
        addr = %config.bind_addr,
        rolling_window = config.engine.rolling_window,
        period_basis = ?config.engine.period_basis,
        "🚀 Server running"
    );

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
