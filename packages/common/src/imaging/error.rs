use thiserror::Error;

/// Terminal failure of one ingestion stage.
///
/// Variants carrying `tried` list every fallback the stage attempted, in
/// order, as `"strategy: reason"`.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed image data: {0}")]
    Format(String),

    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("decoded image is {actual} bytes, expected between {min} and {max}")]
    Size {
        actual: usize,
        min: usize,
        max: usize,
    },

    #[error("base64 payload could not be decoded (tried {})", .tried.join("; "))]
    Decode { tried: Vec<String> },

    #[error("image data is corrupted or unsupported (tried {})", .tried.join("; "))]
    Corrupted { tried: Vec<String> },

    #[error("processed image could not be encoded (tried {})", .tried.join("; "))]
    Encode { tried: Vec<String> },
}
