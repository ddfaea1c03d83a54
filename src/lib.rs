//! # checklist-banner
//!
//! Compose checklist status banners: a title and a list of ✓ / ○ items drawn
//! onto a background image, returned as PNG.
//!
//! ## Why this crate?
//!
//! Sharing progress ("3 of 5 done this week") as an image works on every
//! social platform, but every such image is built from untrusted text and an
//! arbitrary uploaded background. This crate owns that whole path: it strips
//! dangerous markup, renders a safe inline-markdown subset, bounds the
//! background's size, and draws deterministically, so the same request always
//! yields the same bytes.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ChecklistData + LayoutConfig + background bytes
//!  │
//!  ├─ 1. Input      missing background → fail before any work
//!  ├─ 2. Sanitize   strip script/style/iframe/…, cap at 280 chars
//!  ├─ 3. Render     inline markdown → styled spans (concurrent, ordered)
//!  ├─ 4. Normalize  decode, fit within 1000x1000 / 1 MP (spawn_blocking)
//!  ├─ 5. Draw       header + status glyph lines on the bitmap
//!  └─ 6. Encode     PNG bytes
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use checklist_banner::{compose, BannerConfig, ChecklistData, ChecklistItem, LayoutConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let data = ChecklistData::new(
//!         "Weekly Goals",
//!         vec![
//!             ChecklistItem::checked("Ship **v1**"),
//!             ChecklistItem::unchecked("Write *docs*"),
//!         ],
//!     );
//!     let background = std::fs::read("background.png")?;
//!     let banner = compose(
//!         &data,
//!         &LayoutConfig::default(),
//!         Some(&background),
//!         &BannerConfig::default(),
//!     )
//!     .await?;
//!     std::fs::write("banner.png", banner.as_bytes())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `banner` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! checklist-banner = { version = "0.1", default-features = false }
//! ```
//!
//! ## Publishing
//!
//! Platform adapters live in the `banner-publish` crate, re-exported here as
//! [`publish`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compose;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;

pub use banner_publish as publish;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compose::{compose, compose_checked, compose_from_source, compose_sync, compose_to_file};
pub use config::{
    BannerConfig, BannerConfigBuilder, FontSource, LayoutConfig, Point, TextColor, LINE_GAP,
    MAX_FONT_SIZE,
};
pub use error::{BannerError, ErrorKind, RenderWarning};
pub use model::{ChecklistData, ChecklistItem};
pub use output::{ComposeStats, EncodedBanner};
pub use pipeline::normalize::{normalize, NormalizedImage};
pub use pipeline::render::{render, RenderedItem, StyledLine};
pub use pipeline::sanitize::sanitize;
pub use pipeline::validate::validate;
