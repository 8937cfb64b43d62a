use std::net::SocketAddr;

use axum::Router;
use configs::AppConfig;
use dotenvy::dotenv;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes;
use crate::state::ServerState;

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address: {}", e)))
}

/// Load config, connect the pool and build the router.
pub async fn build_app() -> Result<(Router, SocketAddr), StartupError> {
    let cfg = AppConfig::load_or_env().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    if cfg.auth.uses_dev_secret() {
        warn!("JWT secret not configured; using the development default");
    }
    let db = models::db::connect_with_config(&models::db::DatabaseConfig::from(&cfg.database))
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;
    let addr = bind_addr(&cfg)?;
    info!(api_prefix = %cfg.api_prefix(), environment = %cfg.app.environment, "configuration loaded");
    let state = ServerState::new(db, cfg);
    Ok((routes::build_router(state), addr))
}

/// Public entry: build the app and run the HTTP server until Ctrl+C.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let (app, addr) = build_app().await?;
    info!(%addr, "starting server crate");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}
