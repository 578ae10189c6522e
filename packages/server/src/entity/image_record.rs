use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image_record")]
pub struct Model {
    /// Random UUIDv4, generated by the catalog.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Blob store handle. Each blob belongs to exactly one record.
    #[sea_orm(unique)]
    pub blob_handle: Uuid,

    pub owner_id: String,
    pub owner_name: String,

    /// MIME of the stored bytes (`image/png` or `image/jpeg`).
    pub mime_type: String,

    /// Decoded client payload length.
    pub original_size: i64,
    /// Re-encoded length, as stored in the blob store.
    pub stored_size: i64,

    pub width: i32,
    pub height: i32,

    /// SHA-256 of the stored bytes, served as the ETag.
    pub content_hash: String,

    /// Recovery strategy that opened the source bytes.
    pub strategy: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
