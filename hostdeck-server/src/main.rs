/**
 * HOSTDECK SERVER - Point d'entrée du backend dashboard
 *
 * RÔLE : Bootstrap config, logging, état partagé et serveur HTTP.
 *
 * ARCHITECTURE : API REST sans état (hors compteurs de débit) + runner de
 * commandes système pour df, docker et speedtest.
 */

mod config;
mod error;
mod health;
mod http;
mod state;

use crate::config::load_config;
use crate::state::AppState;
use anyhow::{Context, Result};
use hostdeck_agent::SystemRunner;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hostdeck_server=info,hostdeck_agent=info")),
        )
        .init();

    let cfg = load_config().await;
    let app_state = AppState::new(&cfg, Arc::new(SystemRunner));
    info!(
        "Reading kernel state from {}",
        app_state.sampler.paths().proc_root.display()
    );

    let app = http::build_router(app_state);

    let listener = TcpListener::bind(cfg.listen)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.listen))?;
    info!("🚀 HostDeck API listening on http://{}", cfg.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

/// Ctrl-C ou SIGTERM (arrêt du conteneur)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
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
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
