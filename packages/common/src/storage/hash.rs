use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::StorageError;

/// SHA-256 checksum of a stored blob, recorded at put-time and checked on read.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Whether `data` hashes to this checksum.
    pub fn matches(&self, data: &[u8]) -> bool {
        Self::compute(data) == *self
    }

    pub fn from_hex(s: &str) -> Result<Self, StorageError> {
        let bytes = hex::decode(s)
            .map_err(|e| StorageError::InvalidHandle(format!("checksum is not hex: {e}")))?;

        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            StorageError::InvalidHandle(format!("checksum has {} bytes, expected 32", v.len()))
        })?;

        Ok(Self(arr))
    }

    /// 64-character lowercase hex form, also used as the HTTP entity tag.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
