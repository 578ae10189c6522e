use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::error::StorageError;
use super::handle::BlobHandle;
use super::hash::ContentHash;
use super::traits::{BlobAttributes, BlobStore};

/// Filesystem-backed blob store.
///
/// Blobs are stored in a Git-style sharded directory layout:
/// `{base_path}/{first 2 hex chars}/{remaining 30 hex chars}`, with the
/// attributes sidecar next to it under the same name plus `.json`.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn blob_path(&self, handle: &BlobHandle) -> PathBuf {
        self.base_path
            .join(handle.shard_prefix())
            .join(handle.shard_suffix())
    }

    fn sidecar_path(&self, handle: &BlobHandle) -> PathBuf {
        self.base_path
            .join(handle.shard_prefix())
            .join(format!("{}.json", handle.shard_suffix()))
    }

    fn temp_path(&self, handle: &BlobHandle, suffix: &str) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(format!("{}{suffix}", handle.to_hex()))
    }

    async fn write_both(
        &self,
        handle: &BlobHandle,
        data: &[u8],
        sidecar: &[u8],
        tmp_data: &Path,
        tmp_sidecar: &Path,
    ) -> Result<(), StorageError> {
        fs::write(tmp_data, data).await?;
        fs::write(tmp_sidecar, sidecar).await?;

        let blob_path = self.blob_path(handle);
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Sidecar first: a blob file without attributes is never observable.
        fs::rename(tmp_sidecar, self.sidecar_path(handle)).await?;
        if let Err(e) = fs::rename(tmp_data, &blob_path).await {
            let _ = fs::remove_file(self.sidecar_path(handle)).await;
            return Err(e.into());
        }
        Ok(())
    }
}

fn not_found(handle: &BlobHandle, err: std::io::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(handle.to_string())
    } else {
        err.into()
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(
        &self,
        data: &[u8],
        mut attributes: BlobAttributes,
    ) -> Result<BlobHandle, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let handle = BlobHandle::generate();
        attributes.checksum = Some(ContentHash::compute(data));
        let sidecar = serde_json::to_vec(&attributes)?;

        let tmp_data = self.temp_path(&handle, "");
        let tmp_sidecar = self.temp_path(&handle, ".json");
        let result = self
            .write_both(&handle, data, &sidecar, &tmp_data, &tmp_sidecar)
            .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp_data).await;
            let _ = fs::remove_file(&tmp_sidecar).await;
        }
        result?;

        debug!(%handle, bytes = data.len(), "blob stored");
        Ok(handle)
    }

    async fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>, StorageError> {
        let data = fs::read(self.blob_path(handle))
            .await
            .map_err(|e| not_found(handle, e))?;

        let attributes = self.attributes(handle).await?;
        if let Some(checksum) = attributes.checksum
            && !checksum.matches(&data)
        {
            return Err(StorageError::Corrupted {
                handle: handle.to_string(),
                expected: checksum.to_hex(),
            });
        }

        Ok(data)
    }

    async fn attributes(&self, handle: &BlobHandle) -> Result<BlobAttributes, StorageError> {
        let raw = fs::read(self.sidecar_path(handle))
            .await
            .map_err(|e| not_found(handle, e))?;
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn exists(&self, handle: &BlobHandle) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.blob_path(handle)).await?)
    }

    async fn delete(&self, handle: &BlobHandle) -> Result<(), StorageError> {
        fs::remove_file(self.blob_path(handle))
            .await
            .map_err(|e| not_found(handle, e))?;

        match fs::remove_file(self.sidecar_path(handle)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        debug!(%handle, "blob deleted");
        Ok(())
    }

    async fn size(&self, handle: &BlobHandle) -> Result<u64, StorageError> {
        let meta = fs::metadata(self.blob_path(handle))
            .await
            .map_err(|e| not_found(handle, e))?;
        Ok(meta.len())
    }
}
