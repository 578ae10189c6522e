//! Whole-store operations.

use common::storage::BlobStore;
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use serde::Serialize;
use tracing::{info, instrument};

use crate::catalog;
use crate::entity::{document, image_record, owner};
use crate::error::AppError;

/// Rows removed by [`clear_all`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct ClearSummary {
    pub owners: u64,
    pub documents: u64,
    pub images: u64,
}

/// Delete every owner, document and catalog row, then the blobs of the
/// removed records.
///
/// Rows go in one transaction. A blob that cannot be deleted afterwards is
/// logged and left behind.
#[instrument(skip_all)]
pub async fn clear_all(
    db: &DatabaseConnection,
    blobs: &dyn BlobStore,
) -> Result<ClearSummary, AppError> {
    let txn = db.begin().await?;
    let records = image_record::Entity::find().all(&txn).await?;
    let owners = owner::Entity::delete_many().exec(&txn).await?.rows_affected;
    let documents = document::Entity::delete_many().exec(&txn).await?.rows_affected;
    let images = image_record::Entity::delete_many().exec(&txn).await?.rows_affected;
    txn.commit().await?;

    for record in &records {
        catalog::discard_blob(blobs, record).await;
    }

    let summary = ClearSummary {
        owners,
        documents,
        images,
    };
    info!(owners, documents, images, "all data cleared");
    Ok(summary)
}
