//! Import the legacy JSON database and its images.

use anyhow::Context;
use common::storage::filesystem::FilesystemBlobStore;
use tracing_subscriber::EnvFilter;

use podium_server::config::AppConfig;
use podium_server::database;
use podium_server::migration::run_migration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = database::init_db(&config.database)
        .await
        .context("failed to connect to database")?;
    let blobs = FilesystemBlobStore::new(
        config.storage.blob_dir.clone(),
        config.storage.max_blob_size,
    )
    .await
    .context("failed to open blob store")?;

    let result = run_migration(&db, &blobs, &config.imaging, &config.migration).await;
    database::close(db).await;

    let report = result.context("migration failed")?;
    println!("{report}");
    Ok(())
}
