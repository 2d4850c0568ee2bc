//! PageWatch Web Server - audit trigger endpoint.
//!
//! This binary provides a small web server that:
//! - Receives scheduled (cron) triggers and deployment webhooks
//! - Verifies webhook signatures
//! - Fans out four concurrent PageSpeed Insights requests per audit
//! - Persists category scores to a remote Turso database

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pagewatch::web::router;
use pagewatch::{AppState, Config, PsiClient, ScoreStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        webhook_secret_configured = config.webhook_secret.is_some(),
        secure_key_configured = config.secure_key.is_some(),
        psi_api_key_configured = config.psi_api_key.is_some(),
        psi_api_base = %config.psi_api_base,
        "config_loaded"
    );

    // Connect to the remote database
    let turso_url = config
        .turso_url
        .clone()
        .context("TURSO_URL must be set")?;
    let turso_auth_token = config
        .turso_auth_token
        .clone()
        .context("TURSO_AUTH_TOKEN must be set")?;
    let store = ScoreStore::connect_remote(&turso_url, &turso_auth_token).await?;
    info!("database_connected");

    // Create the PageSpeed client
    if config.psi_api_key.is_none() {
        warn!("psi_api_key_not_configured");
    }
    let psi = PsiClient::new(
        config.psi_api_key.clone().unwrap_or_default(),
        config.psi_api_base.clone(),
    );

    let port = config.port;

    // Create application state
    let state = AppState::new(config, psi, store);

    // Build the router
    let app = router(state).layer(TraceLayer::new_for_http());

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
