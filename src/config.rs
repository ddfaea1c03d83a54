//! Configuration types for banner composition.
//!
//! Two structs split the knobs by lifetime:
//!
//! * [`BannerConfig`] — process-wide: image ceilings, text limits, font
//!   source, fetch policy. Built once via [`BannerConfig::builder()`] and
//!   shared by every request.
//! * [`LayoutConfig`] — per request: font size, text colour, where the
//!   header and the item list go.
//!
//! Nothing here reads the environment. Hosts that configure through env
//! vars map them onto the builder themselves (the `banner` binary does this
//! with clap), which keeps the library deterministic under test.

use crate::error::BannerError;
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Vertical gap between consecutive checklist lines, in pixels.
pub const LINE_GAP: u32 = 5;

/// Largest accepted `font_size`. Half the largest background edge is
/// already more than one line of text can use.
pub const MAX_FONT_SIZE: u32 = 512;

/// Content types the background fetch accepts by default.
pub const DEFAULT_ALLOWED_CONTENT_TYPES: [&str; 4] =
    ["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Process-wide configuration for banner composition.
///
/// # Example
/// ```rust
/// use checklist_banner::BannerConfig;
///
/// let config = BannerConfig::builder()
///     .max_image_dimensions(1500, 500)
///     .render_concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_image_width, 1500);
/// ```
#[derive(Debug, Clone)]
pub struct BannerConfig {
    /// Widest background kept after normalisation. Default: 1000.
    pub max_image_width: u32,

    /// Tallest background kept after normalisation. Default: 1000.
    pub max_image_height: u32,

    /// Pixel-count ceiling of the normalised background. Default: 1 000 000.
    pub max_image_pixels: u64,

    /// Characters of user text kept by the sanitizer before the ellipsis.
    /// Default: 280.
    pub max_text_chars: usize,

    /// Longest item text (before sanitization) the Content Validator
    /// accepts. Default: 100.
    pub max_item_chars: usize,

    /// How many items are rendered at once. Default: 8.
    pub render_concurrency: usize,

    /// Font used for all text. Default: the built-in 8x8 bitmap font.
    pub font: FontSource,

    /// Largest background accepted by the fetch step, in bytes. Default: 2 MiB.
    pub max_background_bytes: u64,

    /// MIME types the fetch step accepts. Default: png, jpeg, gif, webp.
    pub allowed_content_types: Vec<String>,

    /// HTTP timeout for background downloads, in seconds. Default: 30.
    pub download_timeout_secs: u64,

    /// Blob store base URL. A bare key `k` resolves to
    /// `{base}/backgrounds/{k}`. Default: none.
    pub background_base_url: Option<String>,
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            max_image_width: 1000,
            max_image_height: 1000,
            max_image_pixels: 1_000_000,
            max_text_chars: 280,
            max_item_chars: 100,
            render_concurrency: 8,
            font: FontSource::default(),
            max_background_bytes: 2 * 1024 * 1024,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            download_timeout_secs: 30,
            background_base_url: None,
        }
    }
}

impl BannerConfig {
    /// Create a new builder for `BannerConfig`.
    pub fn builder() -> BannerConfigBuilder {
        BannerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether `content_type` (parameters ignored) is on the allow-list.
    pub fn allows_content_type(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&essence))
    }
}

/// Builder for [`BannerConfig`].
#[derive(Debug)]
pub struct BannerConfigBuilder {
    config: BannerConfig,
}

impl BannerConfigBuilder {
    pub fn max_image_dimensions(mut self, width: u32, height: u32) -> Self {
        self.config.max_image_width = width;
        self.config.max_image_height = height;
        self
    }

    pub fn max_image_pixels(mut self, pixels: u64) -> Self {
        self.config.max_image_pixels = pixels;
        self
    }

    pub fn max_text_chars(mut self, n: usize) -> Self {
        self.config.max_text_chars = n;
        self
    }

    pub fn max_item_chars(mut self, n: usize) -> Self {
        self.config.max_item_chars = n;
        self
    }

    pub fn render_concurrency(mut self, n: usize) -> Self {
        self.config.render_concurrency = n.max(1);
        self
    }

    pub fn font(mut self, font: FontSource) -> Self {
        self.config.font = font;
        self
    }

    pub fn max_background_bytes(mut self, bytes: u64) -> Self {
        self.config.max_background_bytes = bytes;
        self
    }

    pub fn allowed_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_content_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn background_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.background_base_url = Some(url.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BannerConfig, BannerError> {
        let c = &self.config;
        if c.max_image_width == 0 || c.max_image_height == 0 || c.max_image_pixels == 0 {
            return Err(BannerError::InvalidConfig(format!(
                "Image ceilings must be > 0, got {}x{} / {} px",
                c.max_image_width, c.max_image_height, c.max_image_pixels
            )));
        }
        if c.max_text_chars == 0 || c.max_item_chars == 0 {
            return Err(BannerError::InvalidConfig(
                "Text limits must be > 0".into(),
            ));
        }
        if c.render_concurrency == 0 {
            return Err(BannerError::InvalidConfig(
                "Render concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_background_bytes == 0 {
            return Err(BannerError::InvalidConfig(
                "Background byte ceiling must be > 0".into(),
            ));
        }
        if c.allowed_content_types.is_empty() {
            return Err(BannerError::InvalidConfig(
                "At least one background content type must be allowed".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Font source ──────────────────────────────────────────────────────────

/// Where the bitmap font comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FontSource {
    /// The built-in 8x8 font, scaled by `font_size / 8`.
    #[default]
    Builtin,
    /// An AngelCode BMFont text descriptor (`.fnt`) with PNG pages next to it.
    BmFont(PathBuf),
}

// ── Layout ───────────────────────────────────────────────────────────────

/// A pixel position on the banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Per-request placement and styling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Nominal text height in pixels; also sets the line pitch.
    pub font_size: u32,
    pub text_color: TextColor,
    pub header_position: Point,
    /// Top-left corner of the first checklist line.
    pub items_origin: Point,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_size: 18,
            text_color: TextColor::WHITE,
            header_position: Point::new(50, 20),
            items_origin: Point::new(50, 100),
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), BannerError> {
        if self.font_size == 0 {
            return Err(BannerError::InvalidConfig(
                "Font size must be > 0".into(),
            ));
        }
        if self.font_size > MAX_FONT_SIZE {
            return Err(BannerError::InvalidConfig(format!(
                "Font size {} exceeds the maximum of {}",
                self.font_size, MAX_FONT_SIZE
            )));
        }
        Ok(())
    }

    /// Distance between the tops of consecutive checklist lines.
    pub fn line_pitch(&self) -> u32 {
        self.font_size.saturating_add(LINE_GAP)
    }

    /// Top edge of checklist line `index`.
    pub fn item_y(&self, index: usize) -> i64 {
        let offset = i64::try_from(index)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.line_pitch() as i64);
        (self.items_origin.y as i64).saturating_add(offset)
    }
}

/// An RGBA text colour, written as `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TextColor(pub Rgba<u8>);

impl TextColor {
    pub const WHITE: TextColor = TextColor(Rgba([255, 255, 255, 255]));
    pub const BLACK: TextColor = TextColor(Rgba([0, 0, 0, 255]));

    pub fn rgba(self) -> Rgba<u8> {
        self.0
    }
}

impl FromStr for TextColor {
    type Err = BannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || BannerError::InvalidConfig(format!("Invalid text colour '{s}'"));
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(TextColor(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha])))
    }
}

impl TryFrom<String> for TextColor {
    type Error = BannerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TextColor> for String {
    fn from(c: TextColor) -> Self {
        c.to_string()
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0 .0;
        if a == 255 {
            write!(f, "#{r:02X}{g:02X}{b:02X}")
        } else {
            write!(f, "#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}
