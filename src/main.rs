//! Arsenal Server - authoritative weapon simulation server
//!
//! Entry point. It handles:
//! - WebSocket connections carrying input, control messages and replication frames
//! - HTTP endpoints for health, sessions and the weapon catalog

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arsenal_server::app::AppState;
use arsenal_server::config::Config;
use arsenal_server::http::build_router;
use arsenal_server::util::time::init_server_time;
use arsenal_server::weapons::catalog::WeaponCatalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Arsenal Server");
    info!("Server address: {}", config.server_addr);
    info!(
        simulation_tps = config.simulation_tps,
        snapshot_tps = config.snapshot_tps,
        fire_shots_locally = config.flags.fire_shots_locally,
        "Simulation settings"
    );

    let catalog = match &config.weapon_catalog {
        Some(path) => WeaponCatalog::load(path)?,
        None => {
            warn!("WEAPON_CATALOG not set, using built-in weapons");
            WeaponCatalog::builtin()
        }
    };

    // Create application state
    let state = AppState::new(config.clone(), catalog);

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
