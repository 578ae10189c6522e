use tracing::{info, instrument};

use super::color::normalize;
use super::decode::decode;
use super::encode::encode;
use super::recover::{RecoveryStrategy, open};
use super::resize::{ResizeOutcome, resize};
use super::sanitize::sanitize;
use super::IngestError;
use crate::config::ImagingConfig;

/// Everything the storage layer needs to know about a processed upload.
#[derive(Debug)]
pub struct IngestOutcome {
    /// Re-encoded bytes, ready for the blob store.
    pub bytes: Vec<u8>,
    /// MIME of `bytes`: `image/png` or `image/jpeg`.
    pub mime: &'static str,
    /// MIME the client declared in the data URL.
    pub declared_mime: String,
    /// Length of the decoded client payload.
    pub original_size: usize,
    pub width: u32,
    pub height: u32,
    pub strategy: RecoveryStrategy,
    pub resize: ResizeOutcome,
}

/// Run a data URL through every stage, from syntax check to re-encoding.
///
/// CPU-bound; async callers should run it on a blocking thread.
#[instrument(skip_all, fields(payload_len = payload.len()))]
pub fn ingest_data_url(config: &ImagingConfig, payload: &str) -> Result<IngestOutcome, IngestError> {
    let clean = sanitize(payload, config)?;
    let raw = decode(&clean, config)?;
    let opened = open(&raw, &clean.mime)?;
    let image = normalize(opened.image, opened.source_format);
    let (image, resize) = resize(image, config);
    let encoded = encode(&image, &clean.mime, config.jpeg_quality)?;

    info!(
        declared = %clean.mime,
        mime = encoded.format.mime(),
        original = raw.len(),
        stored = encoded.bytes.len(),
        width = image.width(),
        height = image.height(),
        strategy = %opened.strategy,
        "image ingested"
    );

    Ok(IngestOutcome {
        mime: encoded.format.mime(),
        original_size: raw.len(),
        width: image.width(),
        height: image.height(),
        strategy: opened.strategy,
        bytes: encoded.bytes,
        declared_mime: clean.mime,
        resize,
    })
}
