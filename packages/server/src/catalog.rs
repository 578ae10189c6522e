//! Metadata catalog: the authoritative link between an image id, its blob and
//! its owner.

use chrono::Utc;
use common::imaging::IngestOutcome;
use common::storage::{BlobAttributes, BlobHandle, BlobStore, ContentHash, StorageError};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::entity::image_record;
use crate::error::AppError;

/// Who an image belongs to.
#[derive(Debug, Clone)]
pub struct ImageOwner {
    pub id: String,
    pub name: String,
}

/// A catalog row together with the bytes it points at.
#[derive(Debug)]
pub struct FetchedImage {
    pub record: image_record::Model,
    pub bytes: Vec<u8>,
}

/// Put the encoded bytes in the blob store, then record them.
///
/// If the row cannot be written the blob is deleted again, so a failure never
/// leaves an unreferenced blob behind.
#[instrument(skip(db, blobs, outcome, owner), fields(owner_id = %owner.id))]
pub async fn store_image<C: ConnectionTrait>(
    db: &C,
    blobs: &dyn BlobStore,
    outcome: &IngestOutcome,
    owner: &ImageOwner,
) -> Result<image_record::Model, AppError> {
    let attributes = BlobAttributes {
        owner_id: owner.id.clone(),
        owner_name: owner.name.clone(),
        content_type: outcome.mime.to_string(),
        original_size: outcome.original_size as u64,
        stored_size: outcome.bytes.len() as u64,
        width: outcome.width,
        height: outcome.height,
        uploaded_at: Utc::now(),
        checksum: None,
    };
    let handle = blobs.put(&outcome.bytes, attributes).await?;

    let record = image_record::ActiveModel {
        id: Set(Uuid::new_v4()),
        blob_handle: Set(handle.as_uuid()),
        owner_id: Set(owner.id.clone()),
        owner_name: Set(owner.name.clone()),
        mime_type: Set(outcome.mime.to_string()),
        original_size: Set(outcome.original_size as i64),
        stored_size: Set(outcome.bytes.len() as i64),
        width: Set(outcome.width as i32),
        height: Set(outcome.height as i32),
        content_hash: Set(ContentHash::compute(&outcome.bytes).to_hex()),
        strategy: Set(outcome.strategy.name().to_string()),
        created_at: Set(Utc::now()),
    };

    match record.insert(db).await {
        Ok(model) => {
            info!(
                image_id = %model.id,
                %handle,
                mime = %model.mime_type,
                declared = %outcome.declared_mime,
                "image stored"
            );
            Ok(model)
        }
        Err(err) => {
            if let Err(cleanup) = blobs.delete(&handle).await {
                error!(%handle, error = %cleanup, "failed to remove blob after catalog insert failed");
            }
            Err(err.into())
        }
    }
}

pub async fn lookup<C: ConnectionTrait>(
    db: &C,
    image_id: Uuid,
) -> Result<Option<image_record::Model>, AppError> {
    Ok(image_record::Entity::find_by_id(image_id).one(db).await?)
}

/// Every image recorded for an owner, oldest first.
pub async fn lookup_by_owner<C: ConnectionTrait>(
    db: &C,
    owner_id: &str,
) -> Result<Vec<image_record::Model>, AppError> {
    Ok(image_record::Entity::find()
        .filter(image_record::Column::OwnerId.eq(owner_id))
        .order_by_asc(image_record::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Load the record and its bytes. Missing row and missing blob are both
/// reported as not found.
pub async fn fetch<C: ConnectionTrait>(
    db: &C,
    blobs: &dyn BlobStore,
    image_id: Uuid,
) -> Result<FetchedImage, AppError> {
    let record = lookup(db, image_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Image {image_id} not found")))?;

    let bytes = blobs
        .get(&BlobHandle::from(record.blob_handle))
        .await
        .map_err(|err| match err {
            StorageError::NotFound(_) => AppError::NotFound(format!("Image {image_id} not found")),
            other => other.into(),
        })?;

    Ok(FetchedImage { record, bytes })
}

/// Delete the catalog row and then its blob. Returns `false` without touching
/// the blob store when the row did not exist.
#[instrument(skip(db, blobs))]
pub async fn delete_by_image_id<C: ConnectionTrait>(
    db: &C,
    blobs: &dyn BlobStore,
    image_id: Uuid,
) -> Result<bool, AppError> {
    match remove_record(db, image_id).await? {
        Some(record) => {
            discard_blob(blobs, &record).await;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Delete only the catalog row, returning it. Used inside transactions that
/// release the blob after commit.
pub(crate) async fn remove_record<C: ConnectionTrait>(
    db: &C,
    image_id: Uuid,
) -> Result<Option<image_record::Model>, AppError> {
    let Some(record) = lookup(db, image_id).await? else {
        return Ok(None);
    };
    image_record::Entity::delete_by_id(record.id).exec(db).await?;
    Ok(Some(record))
}

/// Remove the blob of a record whose row is already gone.
pub(crate) async fn discard_blob(blobs: &dyn BlobStore, record: &image_record::Model) {
    let handle = BlobHandle::from(record.blob_handle);
    match blobs.delete(&handle).await {
        Ok(()) => info!(image_id = %record.id, %handle, "image deleted"),
        Err(StorageError::NotFound(_)) => {
            warn!(image_id = %record.id, %handle, "blob already missing")
        }
        Err(err) => {
            warn!(image_id = %record.id, %handle, error = %err, "blob could not be deleted")
        }
    }
}
