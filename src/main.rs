mod config;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use config::{ServerConfig, SnapshotBackend};
use services::snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt::init();
    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "loaded .env");
    }

    let config = ServerConfig::from_env().expect("invalid configuration");

    let snapshots: Arc<dyn SnapshotStore> = match &config.snapshot_backend {
        SnapshotBackend::File { dir } => {
            let store = FileSnapshotStore::open(dir).await.expect("snapshot directory init failed");
            tracing::info!(dir = %store.dir().display(), "file snapshot store ready");
            Arc::new(store)
        }
        SnapshotBackend::Memory => {
            tracing::warn!("memory snapshot store selected: snapshots are lost on restart");
            Arc::new(MemorySnapshotStore::new())
        }
    };

    let addr = (config.bind_addr, config.port);
    let state = state::AppState::new(config, snapshots);

    let app = routes::app(state.clone());
    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind");

    tracing::info!(bind_addr = %addr.0, port = addr.1, "strokeboard listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");

    state.sessions.shutdown_all().await;
    tracing::info!("strokeboard stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
