use std::borrow::Cow;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, GrayImage, RgbImage};
use tracing::{error, info, warn};

use super::IngestError;

/// Container of the stored bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
}

#[derive(Debug, thiserror::Error)]
enum EncodeFailure {
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Jpeg(#[from] jpeg_encoder::EncodingError),
    #[error("{0}")]
    Unusable(&'static str),
}

/// PNG keeps transparency and PNG sources lossless; everything else is JPEG.
pub fn choose_format(image: &DynamicImage, declared_mime: &str) -> OutputFormat {
    if declared_mime == "image/png" || image.color().has_alpha() {
        OutputFormat::Png
    } else {
        OutputFormat::Jpeg
    }
}

/// Serialize `image` for storage.
///
/// A failed primary encoding is retried once as RGB PNG.
pub fn encode(image: &DynamicImage, declared_mime: &str, quality: u8) -> Result<Encoded, IngestError> {
    let format = choose_format(image, declared_mime);
    let primary = match format {
        OutputFormat::Png => encode_png(image),
        OutputFormat::Jpeg => encode_jpeg(&flatten_onto_white(image), quality),
    };

    let mut tried = Vec::with_capacity(2);
    match primary.and_then(non_empty) {
        Ok(bytes) => {
            info!(mime = format.mime(), bytes = bytes.len(), "image encoded");
            return Ok(Encoded { bytes, format });
        }
        Err(err) => {
            warn!(mime = format.mime(), error = %err, "encoding failed, retrying as RGB PNG");
            tried.push(format!("{}: {err}", format.mime()));
        }
    }

    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    match encode_png(&rgb).and_then(non_empty) {
        Ok(bytes) => {
            info!(mime = "image/png", bytes = bytes.len(), "image encoded by fallback");
            Ok(Encoded {
                bytes,
                format: OutputFormat::Png,
            })
        }
        Err(err) => {
            tried.push(format!("rgb png: {err}"));
            error!(tried = ?tried, "every encoder failed");
            Err(IngestError::Encode { tried })
        }
    }
}

fn non_empty(bytes: Vec<u8>) -> Result<Vec<u8>, EncodeFailure> {
    if bytes.is_empty() {
        return Err(EncodeFailure::Unusable("encoder produced no bytes"));
    }
    Ok(bytes)
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, EncodeFailure> {
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Default, FilterType::Adaptive);
    image.write_with_encoder(encoder)?;
    Ok(out)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, EncodeFailure> {
    let width = u16::try_from(image.width())
        .map_err(|_| EncodeFailure::Unusable("image too wide for JPEG"))?;
    let height = u16::try_from(image.height())
        .map_err(|_| EncodeFailure::Unusable("image too tall for JPEG"))?;

    let mut out = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut out, quality);
    encoder.set_progressive(true);
    match image {
        DynamicImage::ImageLuma8(buffer) => {
            encoder.encode(buffer.as_raw(), width, height, jpeg_encoder::ColorType::Luma)?
        }
        DynamicImage::ImageRgb8(buffer) => {
            encoder.encode(buffer.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)?
        }
        _ => return Err(EncodeFailure::Unusable("JPEG input must be L or RGB")),
    }
    Ok(out)
}

/// Composite any alpha channel over opaque white.
pub fn flatten_onto_white(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    fn over_white(value: u8, alpha: u8) -> u8 {
        let (value, alpha) = (u32::from(value), u32::from(alpha));
        ((value * alpha + 255 * (255 - alpha) + 127) / 255) as u8
    }

    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(image),
        DynamicImage::ImageLumaA8(buffer) => {
            Cow::Owned(DynamicImage::ImageLuma8(GrayImage::from_fn(
                buffer.width(),
                buffer.height(),
                |x, y| {
                    let [l, a] = buffer.get_pixel(x, y).0;
                    image::Luma([over_white(l, a)])
                },
            )))
        }
        other => {
            let rgba = other.to_rgba8();
            Cow::Owned(DynamicImage::ImageRgb8(RgbImage::from_fn(
                rgba.width(),
                rgba.height(),
                |x, y| {
                    let [r, g, b, a] = rgba.get_pixel(x, y).0;
                    image::Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
                },
            )))
        }
    }
}
