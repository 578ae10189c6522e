/// Errors that can occur during blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The provided blob handle is malformed.
    #[error("invalid blob handle: {0}")]
    InvalidHandle(String),
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
    /// Stored bytes no longer match the checksum recorded at put-time.
    #[error("blob {handle} does not match checksum {expected}")]
    Corrupted { handle: String, expected: String },
    /// The attributes sidecar could not be encoded or decoded.
    #[error("blob attributes unreadable: {0}")]
    Metadata(#[from] serde_json::Error),
}
