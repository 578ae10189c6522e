use image::{ColorType, DynamicImage, ImageFormat};
use tracing::info;

/// The only pixel layouts the resizer and encoder ever see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Rgba,
    Luma,
    LumaAlpha,
}

impl ColorMode {
    pub fn of(image: &DynamicImage) -> Option<ColorMode> {
        match image.color() {
            ColorType::Rgb8 => Some(ColorMode::Rgb),
            ColorType::Rgba8 => Some(ColorMode::Rgba),
            ColorType::L8 => Some(ColorMode::Luma),
            ColorType::La8 => Some(ColorMode::LumaAlpha),
            _ => None,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, ColorMode::Rgba | ColorMode::LumaAlpha)
    }
}

/// Map the decoded pixel layout onto RGB, RGBA, L or LA.
///
/// Palette images arrive from the decoders already expanded: GIF frames are
/// always RGBA, so a GIF without any transparent pixel is narrowed to RGB.
/// Deeper layouts are reduced to 8 bits, keeping alpha when present.
pub fn normalize(image: DynamicImage, source: Option<ImageFormat>) -> DynamicImage {
    let from = image.color();
    let normalized = match from {
        ColorType::Rgb8 | ColorType::L8 | ColorType::La8 => image,
        ColorType::Rgba8 if source == Some(ImageFormat::Gif) && is_opaque(&image) => {
            DynamicImage::ImageRgb8(image.to_rgb8())
        }
        ColorType::Rgba8 => image,
        ColorType::La16 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        ColorType::Rgba16 | ColorType::Rgba32F => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    };
    info!(from = ?from, to = ?normalized.color(), "color normalized");
    normalized
}

fn is_opaque(image: &DynamicImage) -> bool {
    match image {
        DynamicImage::ImageRgba8(buffer) => buffer.pixels().all(|p| p.0[3] == u8::MAX),
        _ => !image.color().has_alpha(),
    }
}
