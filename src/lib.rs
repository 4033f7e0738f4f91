//! Inventory and settlement core for a flower shop point of sale.
//!
//! The stock ledger, composite (bouquet) resolver, transaction processor,
//! event payment ledger and spoilage sweeper live under [`commands`]; the
//! REST surface over them lives under [`api`].

pub mod api;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod models;


use api::{build_router, AppState};
use config::Config;
use db::Database;
use std::sync::Arc;

/// Open the database and serve the REST API until Ctrl-C.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let db = Database::open(&config.database_path)?;
    db.initialize()?;
    tracing::info!(path = %config.database_path.display(), "database ready");

    let state = AppState::new(Arc::new(db), config.low_stock_default);
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
