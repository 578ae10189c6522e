use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::config::DatabaseConfig;

/// Open the pool and create any missing tables.
pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.clone());

    // Set connection pool options
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("podium_server::entity::*")
        .sync(&db)
        .await?;

    info!(backend = ?db.get_database_backend(), "database ready");
    Ok(db)
}

/// Ping the database. Never mutates shared state.
pub async fn is_healthy(db: &DatabaseConnection) -> bool {
    match db.ping().await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "database ping failed");
            false
        }
    }
}

/// Release the pool.
pub async fn close(db: DatabaseConnection) {
    if let Err(err) = db.close().await {
        warn!(error = %err, "error while closing database pool");
    }
}
