use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::StorageError;
use super::handle::BlobHandle;
use super::hash::ContentHash;

/// Descriptive attributes stored alongside a blob.
///
/// These mirror the catalog row for diagnostics only; application logic reads
/// the catalog, never this sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobAttributes {
    pub owner_id: String,
    pub owner_name: String,
    pub content_type: String,
    pub original_size: u64,
    pub stored_size: u64,
    pub width: u32,
    pub height: u32,
    pub uploaded_at: DateTime<Utc>,
    /// Filled in by the store at put-time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<ContentHash>,
}

/// Opaque blob storage addressed by store-assigned handles.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes with their attributes and return a fresh handle.
    async fn put(&self, data: &[u8], attributes: BlobAttributes)
    -> Result<BlobHandle, StorageError>;

    /// Retrieve all bytes for a blob, verifying them against the stored checksum.
    async fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>, StorageError>;

    /// Read the attributes recorded at put-time.
    async fn attributes(&self, handle: &BlobHandle) -> Result<BlobAttributes, StorageError>;

    async fn exists(&self, handle: &BlobHandle) -> Result<bool, StorageError>;

    /// Delete a blob and its attributes.
    ///
    /// Fails with [`StorageError::NotFound`] if the handle is unknown.
    async fn delete(&self, handle: &BlobHandle) -> Result<(), StorageError>;

    /// Size of the blob in bytes.
    async fn size(&self, handle: &BlobHandle) -> Result<u64, StorageError>;
}
