use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use image::ImageFormat;
use tracing::{info, warn};

use super::IngestError;
use super::sanitize::CleanedPayload;
use crate::config::ImagingConfig;

/// URL-safe engine that ignores padding and non-canonical trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode a cleaned payload into raw bytes and enforce the size bounds.
///
/// The strict standard decoder runs first; if it rejects the text, one retry
/// goes through the lenient URL-safe engine.
pub fn decode(clean: &CleanedPayload, config: &ImagingConfig) -> Result<Vec<u8>, IngestError> {
    let bytes = match STANDARD.decode(&clean.base64) {
        Ok(bytes) => bytes,
        Err(strict) => {
            warn!(error = %strict, "strict base64 decoding failed, retrying URL-safe");
            let url_safe: String = clean
                .base64
                .trim_end_matches('=')
                .chars()
                .map(|c| match c {
                    '+' => '-',
                    '/' => '_',
                    other => other,
                })
                .collect();
            LENIENT.decode(url_safe).map_err(|lenient| IngestError::Decode {
                tried: vec![
                    format!("standard: {strict}"),
                    format!("url-safe lenient: {lenient}"),
                ],
            })?
        }
    };

    if bytes.len() < config.min_decoded_bytes || bytes.len() > config.max_decoded_bytes {
        return Err(IngestError::Size {
            actual: bytes.len(),
            min: config.min_decoded_bytes,
            max: config.max_decoded_bytes,
        });
    }

    info!(
        bytes = bytes.len(),
        container = container_name(sniff(&bytes)),
        "payload decoded"
    );
    Ok(bytes)
}

/// Container format recognised from the leading magic bytes.
pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

pub(crate) fn container_name(format: Option<ImageFormat>) -> &'static str {
    match format {
        Some(ImageFormat::Png) => "png",
        Some(ImageFormat::Jpeg) => "jpeg",
        Some(ImageFormat::Gif) => "gif",
        Some(ImageFormat::WebP) => "webp",
        Some(ImageFormat::Bmp) => "bmp",
        Some(ImageFormat::Tiff) => "tiff",
        Some(_) => "other",
        None => "unknown",
    }
}
