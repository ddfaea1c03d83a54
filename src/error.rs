//! Error types for the checklist-banner library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BannerError`] — **Fatal**: the banner cannot be composed at all
//!   (no background, undecodable image, font missing). Returned as
//!   `Err(BannerError)` from the top-level `compose*` functions.
//!
//! * [`RenderWarning`] — **Non-fatal**: a single item's markdown could not
//!   be rendered, so its sanitized text is drawn as-is. Stored inside
//!   [`crate::pipeline::render::RenderedItem`] so callers can see which
//!   items degraded without losing the whole banner.
//!
//! [`BannerError::kind`] groups the fatal variants so a request handler can
//! map them to responses without matching every variant.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the checklist-banner library.
#[derive(Debug, Error)]
pub enum BannerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No background bytes were supplied, or the buffer is empty.
    #[error("Background image is missing or empty")]
    MissingBackground,

    /// Checklist data could not be read.
    #[error("Invalid checklist data: {reason}")]
    InvalidChecklist { reason: String },

    /// The Content Validator rejected the checklist.
    #[error("Checklist content rejected: {}", .violations.join("; "))]
    ContentRejected { violations: Vec<String> },

    // ── Image errors ──────────────────────────────────────────────────────
    /// The bytes are not in any raster format this build can decode.
    #[error("Unsupported background image type (first bytes: {magic:02x?})")]
    UnsupportedImageFormat { magic: Vec<u8> },

    /// The format was recognised but decoding failed.
    #[error("Background {format} image is malformed: {detail}")]
    MalformedImage { format: String, detail: String },

    /// PNG encoding of the finished banner failed.
    #[error("Failed to encode banner: {0}")]
    EncodeFailed(String),

    // ── Resource errors ───────────────────────────────────────────────────
    /// The configured font could not be loaded.
    #[error("Failed to load font '{path}': {detail}\nCheck the font path in the deployment configuration.")]
    FontLoadFailed { path: PathBuf, detail: String },

    // ── Fetch errors ──────────────────────────────────────────────────────
    /// No background exists at the given path, URL, or key.
    #[error("Background image not found: '{location}'")]
    BackgroundNotFound { location: String },

    /// Process does not have read permission on the background file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// HTTP download of the background failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// Background is bigger than the transfer ceiling.
    #[error("Background image is {size} bytes, maximum is {max}")]
    BackgroundTooLarge { size: u64, max: u64 },

    /// Background is not one of the allowed image types.
    #[error("Invalid background image type '{content_type}' (allowed: {})", .allowed.join(", "))]
    UnsupportedContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PNG file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or layout validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`BannerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is malformed. Never retried.
    Input,
    /// Background bytes cannot be decoded.
    ImageDecode,
    /// A fixed resource (font) failed to load. Deployment problem.
    ResourceLoad,
    /// Background fetch failed before decoding.
    Fetch,
    /// Writing or encoding the result failed.
    Output,
    Config,
    Internal,
}

impl BannerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BannerError::MissingBackground
            | BannerError::InvalidChecklist { .. }
            | BannerError::ContentRejected { .. } => ErrorKind::Input,
            BannerError::UnsupportedImageFormat { .. } | BannerError::MalformedImage { .. } => {
                ErrorKind::ImageDecode
            }
            BannerError::FontLoadFailed { .. } => ErrorKind::ResourceLoad,
            BannerError::BackgroundNotFound { .. }
            | BannerError::PermissionDenied { .. }
            | BannerError::DownloadFailed { .. }
            | BannerError::DownloadTimeout { .. }
            | BannerError::BackgroundTooLarge { .. }
            | BannerError::UnsupportedContentType { .. } => ErrorKind::Fetch,
            BannerError::EncodeFailed(_) | BannerError::OutputWriteFailed { .. } => {
                ErrorKind::Output
            }
            BannerError::InvalidConfig(_) => ErrorKind::Config,
            BannerError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A non-fatal rendering problem for a single checklist line.
///
/// The line is still drawn, using its sanitized text without markdown
/// styling.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum RenderWarning {
    /// The text parsed as block-level markdown (heading, list, quote…),
    /// which a single banner line cannot show.
    #[error("Item {index}: block-level markdown ({construct}) is not rendered")]
    BlockMarkup { index: usize, construct: String },

    /// The text contains control characters the renderer refuses.
    #[error("Item {index}: text contains control character U+{code:04X}")]
    ControlCharacter { index: usize, code: u32 },

    /// The render task for this item died (panic or cancellation).
    #[error("Item {index}: render task aborted: {detail}")]
    Aborted { index: usize, detail: String },
}

impl RenderWarning {
    /// Position of the item the warning belongs to.
    pub fn index(&self) -> usize {
        match self {
            RenderWarning::BlockMarkup { index, .. }
            | RenderWarning::ControlCharacter { index, .. }
            | RenderWarning::Aborted { index, .. } => *index,
        }
    }
}
