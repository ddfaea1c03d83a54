//! Image normalisation: background bytes → bounded [`NormalizedImage`].
//!
//! Decoding sniffs the format from the magic bytes rather than trusting a
//! file name or content type. Two decode failures are kept apart so callers
//! can tell them apart:
//!
//! * the bytes match no format this build decodes →
//!   [`BannerError::UnsupportedImageFormat`]
//! * the format is known but the data is broken → [`BannerError::MalformedImage`]
//!
//! After decoding, the image is fit-resized (aspect ratio kept, never
//! upscaled) until width, height and pixel count are all within the
//! configured ceilings. The ceilings hold on the *output*: dimensions are
//! floored and then trimmed until the pixel product fits.

use crate::config::BannerConfig;
use crate::error::BannerError;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};
use tracing::debug;

/// A decoded background whose dimensions satisfy the configured ceilings.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub image: DynamicImage,
    pub original_width: u32,
    pub original_height: u32,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether the decoded image had to be scaled down.
    pub fn resized(&self) -> bool {
        (self.width(), self.height()) != (self.original_width, self.original_height)
    }
}

/// Largest `(width, height)` with the same aspect ratio as the input that
/// satisfies all three ceilings. Returns the input untouched when it already
/// fits; never returns a side larger than the input or smaller than 1.
pub fn fit_dimensions(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
    max_pixels: u64,
) -> (u32, u32) {
    let pixels = width as u64 * height as u64;
    if width <= max_width && height <= max_height && pixels <= max_pixels {
        return (width, height);
    }

    let (w, h) = (width as f64, height as f64);
    let scale = (max_width as f64 / w)
        .min(max_height as f64 / h)
        .min((max_pixels as f64 / (w * h)).sqrt())
        .min(1.0);

    // The epsilon keeps exact ratios like 1500 * (2/3) from flooring to 999.
    let mut new_w = ((w * scale + 1e-6).floor() as u32).clamp(1, max_width.min(width).max(1));
    let mut new_h = ((h * scale + 1e-6).floor() as u32).clamp(1, max_height.min(height).max(1));

    // Float rounding can leave the product a few pixels over.
    while new_w as u64 * new_h as u64 > max_pixels && (new_w > 1 || new_h > 1) {
        if new_w >= new_h {
            new_w -= 1;
        } else {
            new_h -= 1;
        }
    }

    (new_w, new_h)
}

/// Decode `bytes` without resizing.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, BannerError> {
    if bytes.is_empty() {
        return Err(BannerError::MissingBackground);
    }

    let format = image::guess_format(bytes).map_err(|_| BannerError::UnsupportedImageFormat {
        magic: bytes.iter().take(4).copied().collect(),
    })?;

    image::load_from_memory_with_format(bytes, format).map_err(|e| match e {
        ImageError::Unsupported(_) => BannerError::UnsupportedImageFormat {
            magic: bytes.iter().take(4).copied().collect(),
        },
        other => BannerError::MalformedImage {
            format: format_name(format),
            detail: other.to_string(),
        },
    })
}

fn format_name(format: ImageFormat) -> String {
    format
        .extensions_str()
        .first()
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| format!("{format:?}").to_lowercase())
}

/// Decode and fit-resize a background.
pub fn normalize(bytes: &[u8], config: &BannerConfig) -> Result<NormalizedImage, BannerError> {
    let image = decode(bytes)?;
    let (original_width, original_height) = (image.width(), image.height());

    let (width, height) = fit_dimensions(
        original_width,
        original_height,
        config.max_image_width,
        config.max_image_height,
        config.max_image_pixels,
    );

    let image = if (width, height) == (original_width, original_height) {
        image
    } else {
        debug!(
            "Resizing background {}x{} → {}x{}",
            original_width, original_height, width, height
        );
        image.resize_exact(width, height, FilterType::Lanczos3)
    };

    Ok(NormalizedImage {
        image,
        original_width,
        original_height,
    })
}
