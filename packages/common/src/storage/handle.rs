use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

/// Opaque identifier the blob store assigns at put-time.
///
/// Handles are random rather than content-derived, so storing the same bytes
/// twice yields two independent blobs that can be deleted separately.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobHandle(Uuid);

impl BlobHandle {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, StorageError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| StorageError::InvalidHandle(format!("{s}: {e}")))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// 32-character hex form without hyphens.
    pub fn to_hex(&self) -> String {
        self.0.simple().to_string()
    }

    /// First 2 hex characters (shard directory).
    pub fn shard_prefix(&self) -> String {
        self.to_hex()[..2].to_string()
    }

    /// Remaining 30 hex characters (file name within the shard).
    pub fn shard_suffix(&self) -> String {
        self.to_hex()[2..].to_string()
    }
}

impl From<Uuid> for BlobHandle {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobHandle({})", self.0)
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
