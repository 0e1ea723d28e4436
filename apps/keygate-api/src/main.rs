//! keygate SSO broker server.
//!
//! Serves the SSO API (`/sso/*`) and a health check.

mod app;
mod config;
mod logging;

use std::net::SocketAddr;
use std::time::Duration;

use keygate_api_sso::SsoState;
use tokio::signal;
use tracing::info;

use crate::config::Config;

const LOGIN_SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    // Load configuration (fail-fast on invalid values)
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        "Starting keygate API"
    );

    let stores = match app::open_stores(&config).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to open stores: {e}");
            std::process::exit(1);
        }
    };

    let state = match SsoState::new(&app::sso_config(&config, stores)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to build SSO state: {e}");
            std::process::exit(1);
        }
    };

    let sessions = state.auth_flow.sessions().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LOGIN_SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            sessions.purge_expired().await;
        }
    });

    let app = app::build_router(state);

    let addr: SocketAddr = match config.bind_addr().parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Invalid bind address '{}': {e}", config.bind_addr());
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    info!(%addr, "Server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
