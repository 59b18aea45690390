//! serene-emotion - Emotion Analysis Microservice
//!
//! Keeps the text-emotion model resident in a worker process, runs the
//! speech analyzer per call, and fuses both signals. Every analysis request
//! answers, degrading to keyword or neutral fallbacks when a worker is
//! unavailable.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serene_common::config::resolve_config_path;
use serene_common::EventBus;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use serene_emotion::config::{EmotionConfig, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
use serene_emotion::{AppState, EmotionService};

/// Command-line arguments for serene-emotion
#[derive(Parser, Debug)]
#[command(name = "serene-emotion")]
#[command(about = "Emotion analysis microservice for Serene")]
#[command(version)]
struct Args {
    /// Path to serene-emotion.toml
    #[arg(short, long, env = "SERENE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides bind_address from the config file
    #[arg(short, long, env = "SERENE_BIND_ADDRESS")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR, CONFIG_FILE_NAME);
    let config = EmotionConfig::load(config_path.as_deref())
        .context("Failed to load configuration")?;

    // RUST_LOG wins over [logging] level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting serene-emotion v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: built-in defaults"),
    }

    let events = EventBus::default();
    let service = Arc::new(EmotionService::from_config(&config, events));
    service.start();

    let app = serene_emotion::build_router(AppState::new(Arc::clone(&service)));

    let bind_address = args.bind.unwrap_or_else(|| config.bind_address.clone());
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    service.shutdown();
    served?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
