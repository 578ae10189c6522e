use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::storage::filesystem::FilesystemBlobStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use podium_server::build_router;
use podium_server::config::AppConfig;
use podium_server::database;
use podium_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = database::init_db(&config.database)
        .await
        .context("failed to connect to database")?;
    let blob_store = FilesystemBlobStore::new(
        config.storage.blob_dir.clone(),
        config.storage.max_blob_size,
    )
    .await
    .context("failed to open blob store")?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;

    let state = AppState {
        db: db.clone(),
        blob_store: Arc::new(blob_store),
        config,
    };
    let app = build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    database::close(db).await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
