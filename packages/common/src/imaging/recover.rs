use std::fmt;
use std::io::Cursor;

use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::IngestError;
use super::decode::{container_name, sniff};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const PNG_IEND: [u8; 12] = [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Upper bound on the pixel buffer the truncation-tolerant reader allocates.
const MAX_RECOVERED_BUFFER: usize = 512 * 1024 * 1024;

/// Ways of opening raw bytes as an image, from strictest to most tolerant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    /// Sniff the container and decode every pixel up front.
    EagerDecode,
    /// Read the header alone, then decode again from a fresh reader.
    ///
    /// `image` has no separate integrity pass, so this stands in for one: it
    /// decodes with the declared format (not the sniffed one) and rejects the
    /// result if the header dimensions disagree with the decoded pixels. In
    /// practice it is `EagerDecode` driven by the declared MIME.
    VerifyThenReopen,
    /// Keep whatever rows decoded before the stream ended, as RGB.
    TolerateTruncation,
    /// Rewrite the container (checksums, terminator) and reopen the result.
    RepairContainer,
}

impl RecoveryStrategy {
    pub const ORDER: [RecoveryStrategy; 4] = [
        RecoveryStrategy::EagerDecode,
        RecoveryStrategy::VerifyThenReopen,
        RecoveryStrategy::TolerateTruncation,
        RecoveryStrategy::RepairContainer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RecoveryStrategy::EagerDecode => "eager_decode",
            RecoveryStrategy::VerifyThenReopen => "verify_then_reopen",
            RecoveryStrategy::TolerateTruncation => "tolerate_truncation",
            RecoveryStrategy::RepairContainer => "repair_container",
        }
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An image that one of the strategies managed to open.
#[derive(Debug)]
pub struct Opened {
    pub image: DynamicImage,
    pub strategy: RecoveryStrategy,
    /// Container the bytes were read as, when it could be determined.
    pub source_format: Option<ImageFormat>,
}

#[derive(Debug, thiserror::Error)]
enum OpenFailure {
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Png(#[from] png::DecodingError),
    #[error("{0}")]
    Unusable(&'static str),
}

/// Map a declared MIME type onto a decoder, accepting the common `image/jpg`
/// misspelling.
pub fn declared_format(mime: &str) -> Option<ImageFormat> {
    match mime {
        "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
        other => ImageFormat::from_mime_type(other),
    }
}

/// Open `bytes` with the first strategy that yields a non-empty image.
pub fn open(bytes: &[u8], declared_mime: &str) -> Result<Opened, IngestError> {
    let declared = declared_format(declared_mime);
    let sniffed = sniff(bytes);
    if sniffed.is_some() && declared.is_some() && sniffed != declared {
        warn!(
            declared = declared_mime,
            sniffed = container_name(sniffed),
            "declared MIME does not match the container signature"
        );
    }

    let mut tried = Vec::with_capacity(RecoveryStrategy::ORDER.len());
    for strategy in RecoveryStrategy::ORDER {
        let (format, attempt) = match strategy {
            RecoveryStrategy::EagerDecode => (sniffed, eager_decode(bytes)),
            RecoveryStrategy::VerifyThenReopen => {
                let format = declared.or(sniffed);
                (format, verify_then_reopen(bytes, format))
            }
            RecoveryStrategy::TolerateTruncation => {
                let format = sniffed.or(declared);
                (format, tolerate_truncation(bytes, format))
            }
            RecoveryStrategy::RepairContainer => {
                let format = declared.or(sniffed);
                (format, repair_container(bytes, format))
            }
        };

        match attempt.and_then(non_empty) {
            Ok(image) => {
                info!(
                    strategy = %strategy,
                    width = image.width(),
                    height = image.height(),
                    container = container_name(format),
                    "image opened"
                );
                return Ok(Opened {
                    image,
                    strategy,
                    source_format: format,
                });
            }
            Err(err) => {
                warn!(strategy = %strategy, error = %err, "image open attempt failed");
                tried.push(format!("{strategy}: {err}"));
            }
        }
    }

    error!(
        declared = declared_mime,
        bytes = bytes.len(),
        "every image open strategy failed"
    );
    Err(IngestError::Corrupted { tried })
}

fn non_empty(image: DynamicImage) -> Result<DynamicImage, OpenFailure> {
    if image.width() == 0 || image.height() == 0 {
        return Err(OpenFailure::Unusable("image has a zero dimension"));
    }
    Ok(image)
}

fn require(format: Option<ImageFormat>) -> Result<ImageFormat, OpenFailure> {
    format.ok_or(OpenFailure::Unusable("container format is unknown"))
}

fn eager_decode(bytes: &[u8]) -> Result<DynamicImage, OpenFailure> {
    Ok(ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?)
}

fn verify_then_reopen(
    bytes: &[u8],
    format: Option<ImageFormat>,
) -> Result<DynamicImage, OpenFailure> {
    let format = require(format)?;
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format).into_dimensions()?;

    let image = ImageReader::with_format(Cursor::new(bytes), format).decode()?;
    if (image.width(), image.height()) != (width, height) {
        return Err(OpenFailure::Unusable("dimensions changed between header and pixels"));
    }
    Ok(image)
}

fn tolerate_truncation(
    bytes: &[u8],
    format: Option<ImageFormat>,
) -> Result<DynamicImage, OpenFailure> {
    let image = match require(format)? {
        ImageFormat::Png => truncated_png(bytes)?,
        ImageFormat::Jpeg => {
            let mut patched = bytes.to_vec();
            if !patched.ends_with(&JPEG_EOI) {
                patched.extend_from_slice(&JPEG_EOI);
            }
            image::load_from_memory_with_format(&patched, ImageFormat::Jpeg)?
        }
        _ => return Err(OpenFailure::Unusable("no truncation-tolerant reader for this container")),
    };
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// Decode a PNG row by row, keeping the rows that arrived and zero-filling the
/// rest. Interlaced images spread each row across passes and are rejected.
fn truncated_png(bytes: &[u8]) -> Result<DynamicImage, OpenFailure> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;

    let (width, height, interlaced) = {
        let info = reader.info();
        (info.width, info.height, info.interlaced)
    };
    if interlaced {
        return Err(OpenFailure::Unusable("interlaced PNG cannot be read row by row"));
    }
    let (color, depth) = reader.output_color_type();
    if depth != png::BitDepth::Eight {
        return Err(OpenFailure::Unusable("unexpected PNG output bit depth"));
    }

    let buffer_len = reader.output_buffer_size();
    if buffer_len > MAX_RECOVERED_BUFFER {
        return Err(OpenFailure::Unusable("PNG dimensions exceed the recovery buffer"));
    }
    let row_len = reader.output_line_size(width);
    if row_len == 0 {
        return Err(OpenFailure::Unusable("PNG has empty rows"));
    }

    let mut pixels = vec![0u8; buffer_len];
    let mut rows = 0usize;
    for line in pixels.chunks_exact_mut(row_len) {
        match reader.next_row() {
            Ok(Some(row)) => {
                let data = row.data();
                let n = data.len().min(line.len());
                line[..n].copy_from_slice(&data[..n]);
                rows += 1;
            }
            Ok(None) => break,
            Err(err) if rows == 0 => return Err(err.into()),
            Err(err) => {
                warn!(rows, height, error = %err, "PNG stream ended early, padding missing rows");
                break;
            }
        }
    }
    if rows == 0 {
        return Err(OpenFailure::Unusable("no PNG rows could be decoded"));
    }

    let image = match color {
        png::ColorType::Grayscale => {
            GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        png::ColorType::GrayscaleAlpha => {
            GrayAlphaImage::from_raw(width, height, pixels).map(DynamicImage::ImageLumaA8)
        }
        png::ColorType::Rgb => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        png::ColorType::Rgba => {
            RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
        }
        png::ColorType::Indexed => None,
    };
    image.ok_or(OpenFailure::Unusable("unexpected PNG output layout"))
}

fn repair_container(
    bytes: &[u8],
    format: Option<ImageFormat>,
) -> Result<DynamicImage, OpenFailure> {
    let format = require(format)?;
    let neutral = if format == ImageFormat::Png {
        rebuild_png_chunks(bytes)?
    } else {
        let image = image::load_from_memory_with_format(bytes, format)?;
        let image = if image.color().has_alpha() {
            DynamicImage::ImageRgba8(image.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        };
        let mut out = Vec::new();
        image.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
        out
    };
    Ok(image::load_from_memory_with_format(&neutral, ImageFormat::Png)?)
}

/// Re-emit a PNG with a clean signature and recomputed chunk CRCs. A trailing
/// partial chunk is dropped and a missing `IEND` is appended.
fn rebuild_png_chunks(bytes: &[u8]) -> Result<Vec<u8>, OpenFailure> {
    let body = bytes
        .get(PNG_SIGNATURE.len()..)
        .ok_or(OpenFailure::Unusable("too short to be a PNG"))?;

    let mut out = Vec::with_capacity(bytes.len() + PNG_IEND.len());
    out.extend_from_slice(&PNG_SIGNATURE);

    let mut rest = body;
    let mut chunks = 0usize;
    let mut terminated = false;
    while rest.len() >= 12 {
        let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let Some(total) = len.checked_add(12) else {
            break;
        };
        if rest.len() < total {
            break;
        }
        let kind = &rest[4..8];
        let mut crc = crc32fast::Hasher::new();
        crc.update(&rest[4..8 + len]);

        out.extend_from_slice(&rest[..8 + len]);
        out.extend_from_slice(&crc.finalize().to_be_bytes());
        chunks += 1;
        rest = &rest[total..];

        if kind == b"IEND" {
            terminated = true;
            break;
        }
    }

    if chunks == 0 {
        return Err(OpenFailure::Unusable("no complete PNG chunk"));
    }
    if !terminated {
        out.extend_from_slice(&PNG_IEND);
    }
    Ok(out)
}
