use image::DynamicImage;
use image::imageops::FilterType;
use tracing::{info, warn};

use super::color::ColorMode;
use crate::config::ImagingConfig;

/// Resampling methods, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleFilter {
    Lanczos3,
    /// Area-averaging thumbnail; no float intermediate image.
    Thumbnail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Already within the bound.
    Unchanged,
    Resampled {
        filter: ResampleFilter,
        from: (u32, u32),
    },
    /// Every filter was rejected; the original pixels were kept.
    Skipped,
}

/// Dimensions after scaling the longer side down to `max_dimension`, rounded
/// down and never below one pixel. `None` when no scaling is needed.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let long = width.max(height);
    if long <= max_dimension || max_dimension == 0 {
        return None;
    }
    let scale = |side: u32| {
        let scaled = u64::from(side) * u64::from(max_dimension) / u64::from(long);
        u32::try_from(scaled).unwrap_or(max_dimension).max(1)
    };
    Some((scale(width), scale(height)))
}

/// Downsample so that neither side exceeds `config.max_dimension`.
///
/// Best effort: a filter that would exceed the scratch budget is skipped, and
/// if none fits the image is returned untouched.
pub fn resize(image: DynamicImage, config: &ImagingConfig) -> (DynamicImage, ResizeOutcome) {
    let from = (image.width(), image.height());
    let Some((width, height)) = target_dimensions(from.0, from.1, config.max_dimension) else {
        return (image, ResizeOutcome::Unchanged);
    };

    let image = match ColorMode::of(&image) {
        Some(ColorMode::Rgb | ColorMode::Rgba | ColorMode::Luma) => image,
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    };
    let channels = u64::from(image.color().channel_count());

    for filter in [ResampleFilter::Lanczos3, ResampleFilter::Thumbnail] {
        let scratch = match filter {
            // Vertical pass lands in an RGBA f32 buffer of old width x new height.
            ResampleFilter::Lanczos3 => u64::from(from.0) * u64::from(height) * 16,
            ResampleFilter::Thumbnail => u64::from(width) * u64::from(height) * channels,
        };
        if scratch > config.resample_budget_bytes {
            warn!(
                ?filter,
                scratch,
                budget = config.resample_budget_bytes,
                "resample skipped, scratch buffer over budget"
            );
            continue;
        }

        let resized = match filter {
            ResampleFilter::Lanczos3 => image.resize_exact(width, height, FilterType::Lanczos3),
            ResampleFilter::Thumbnail => image.thumbnail_exact(width, height),
        };
        if (resized.width(), resized.height()) != (width, height) {
            warn!(?filter, "resampler returned unexpected dimensions");
            continue;
        }
        info!(
            ?filter,
            from_width = from.0,
            from_height = from.1,
            width,
            height,
            "image resized"
        );
        return (resized, ResizeOutcome::Resampled { filter, from });
    }

    warn!(width = from.0, height = from.1, "every resample filter failed, keeping original size");
    (image, ResizeOutcome::Skipped)
}
