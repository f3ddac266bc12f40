//! Proximity chat server.
//!
//! Main entry point that wires all crates together and starts the
//! server: KV store, connection hub, pub/sub bridge, background
//! sweepers, and the HTTP/WebSocket surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use proxchat_api::{build_router, AppState};
use proxchat_core::config::AppConfig;
use proxchat_core::error::AppError;
use proxchat_core::traits::store::KvStore;
use proxchat_realtime::bridge::PubSubBridge;
use proxchat_realtime::hub::Hub;
use proxchat_service::sweeper;
use proxchat_store::StoreManager;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Load configuration from TOML files and the environment.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("PROXCHAT_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt().json().with_env_filter(filter).with_target(true).init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    // The store is the only dependency whose absence is fatal.
    let store = Arc::new(StoreManager::new(&config.store).await?);
    store.health_check().await?;

    let shutdown = CancellationToken::new();

    let (hub, hub_loop) = Hub::new(store.clone(), shutdown.clone());
    tokio::spawn(hub_loop.run());

    let bridge = PubSubBridge::new(hub.clone(), store.clone(), shutdown.clone());
    tokio::spawn(bridge.run());

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let bind = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(config, store, hub, shutdown.clone());

    tokio::spawn(sweeper::run_message_sweeper(
        state.messages.clone(),
        shutdown.clone(),
    ));
    tokio::spawn(sweeper::run_index_sweeper(
        state.locations.clone(),
        shutdown.clone(),
    ));

    let app = build_router(state);

    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| AppError::configuration(format!("invalid bind address '{bind}': {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");

    let serve = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()));

    // Bounded shutdown: when the grace window elapses, stop waiting on
    // in-flight connections.
    tokio::select! {
        result = serve => result?,
        _ = async {
            shutdown.cancelled().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!("shutdown grace elapsed, exiting with connections open");
        }
    }

    tracing::info!("server stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM, then cancel the process-wide token. The
/// token reaches every background task and connection.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
    shutdown.cancel();
}
