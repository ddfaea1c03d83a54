//! Banner composition entry points.
//!
//! [`compose`] is the core: checklist + layout + background bytes in, PNG
//! out. The other functions wrap it:
//!
//! | Function | Adds |
//! |---|---|
//! | [`compose_checked`] | content validation up front |
//! | [`compose_from_source`] | background fetch from a path, URL or blob key |
//! | [`compose_to_file`] | atomic write of the PNG |
//! | [`compose_sync`] | a private runtime for non-async callers |
//!
//! Each call owns its own decoded bitmap and its own rendered copy of the
//! checklist, so concurrent compositions share nothing and need no locks.

use crate::config::{BannerConfig, LayoutConfig};
use crate::error::BannerError;
use crate::model::ChecklistData;
use crate::output::{ComposeStats, EncodedBanner};
use crate::pipeline::font::Font;
use crate::pipeline::{draw, encode, input, normalize, render, validate};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Compose a banner.
///
/// # Arguments
/// * `data` — header and items; item text is sanitized and rendered here
/// * `layout` — font size, colour and positions for this request
/// * `background` — raw image bytes; `None` or empty fails immediately
/// * `config` — process-wide limits and font source
///
/// # Errors
/// Returns `Err(BannerError)` only for fatal problems:
/// - missing background ([`BannerError::MissingBackground`]), checked
///   before any decoding
/// - undecodable background
/// - font load failure
/// - invalid layout or PNG encoding failure
///
/// Items whose markdown cannot be rendered do *not* fail the call; see
/// [`EncodedBanner::warnings`].
pub async fn compose(
    data: &ChecklistData,
    layout: &LayoutConfig,
    background: Option<&[u8]>,
    config: &BannerConfig,
) -> Result<EncodedBanner, BannerError> {
    let total_start = Instant::now();

    // ── Step 1: Reject missing input ─────────────────────────────────────
    let bytes = match background {
        Some(b) if !b.is_empty() => b.to_vec(),
        _ => return Err(BannerError::MissingBackground),
    };
    layout.validate()?;
    info!(
        "Composing banner: {} items, {} byte background",
        data.items.len(),
        bytes.len()
    );

    // ── Step 2 + 3: Render text while the background decodes ────────────
    let render_start = Instant::now();
    let decode_config = config.clone();
    let (rendered, normalized) = tokio::join!(
        render::render_items(&data.items, config),
        tokio::task::spawn_blocking(move || normalize::normalize(&bytes, &decode_config)),
    );
    let normalized = normalized.map_err(|e| BannerError::Internal(format!("decode task: {e}")))??;
    let header = render::render_header(&data.header, config.max_text_chars);
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    debug!(
        "Rendered text and normalised {}x{} background in {}ms",
        normalized.width(),
        normalized.height(),
        render_duration_ms
    );

    let warnings: Vec<_> = rendered.iter().filter_map(|r| r.warning.clone()).collect();
    let mut stats = ComposeStats {
        items: rendered.len(),
        fallback_items: warnings.len(),
        original_width: normalized.original_width,
        original_height: normalized.original_height,
        resized: normalized.resized(),
        render_duration_ms,
        ..ComposeStats::default()
    };

    // ── Step 4–7: Load font, draw, encode ────────────────────────────────
    let draw_start = Instant::now();
    let font_source = config.font.clone();
    let layout = layout.clone();
    let (png, width, height) = tokio::task::spawn_blocking(move || {
        let font = Font::load(&font_source, layout.font_size)?;
        let mut canvas = normalized.image.into_rgba8();
        draw::draw_checklist(&mut canvas, &font, &header, &rendered, &layout);
        let (w, h) = canvas.dimensions();
        Ok::<_, BannerError>((encode::encode_png(canvas)?, w, h))
    })
    .await
    .map_err(|e| BannerError::Internal(format!("draw task: {e}")))??;

    stats.draw_duration_ms = draw_start.elapsed().as_millis() as u64;
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Banner complete: {}x{}, {} bytes, {} fallback items, {}ms",
        width,
        height,
        png.len(),
        stats.fallback_items,
        stats.total_duration_ms
    );

    Ok(EncodedBanner {
        png,
        width,
        height,
        warnings,
        stats,
    })
}

/// Validate the checklist, then compose.
///
/// Fails with [`BannerError::ContentRejected`] listing every violation when
/// the header is blank, there are no items, or an item is blank or longer
/// than `config.max_item_chars`.
pub async fn compose_checked(
    data: &ChecklistData,
    layout: &LayoutConfig,
    background: Option<&[u8]>,
    config: &BannerConfig,
) -> Result<EncodedBanner, BannerError> {
    let violations = validate::check(data, config.max_item_chars);
    if !violations.is_empty() {
        for v in &violations {
            warn!("Checklist rejected: {}", v);
        }
        return Err(BannerError::ContentRejected {
            violations: violations.iter().map(ToString::to_string).collect(),
        });
    }
    compose(data, layout, background, config).await
}

/// Fetch the background from a path, URL or blob key, then compose.
pub async fn compose_from_source(
    data: &ChecklistData,
    layout: &LayoutConfig,
    source: impl AsRef<str>,
    config: &BannerConfig,
) -> Result<EncodedBanner, BannerError> {
    let background = input::resolve_background(source.as_ref(), config).await?;
    compose(data, layout, Some(&background.bytes), config).await
}

/// Compose and write the PNG to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn compose_to_file(
    data: &ChecklistData,
    layout: &LayoutConfig,
    background: Option<&[u8]>,
    output_path: impl AsRef<Path>,
    config: &BannerConfig,
) -> Result<EncodedBanner, BannerError> {
    let banner = compose(data, layout, background, config).await?;
    let path = output_path.as_ref();
    let write_err = |e| BannerError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("png.tmp");
    tokio::fs::write(&tmp_path, &banner.png)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote banner to {}", path.display());
    Ok(banner)
}

/// Synchronous wrapper around [`compose`].
///
/// Creates a temporary tokio runtime internally; do not call from inside
/// an async context.
pub fn compose_sync(
    data: &ChecklistData,
    layout: &LayoutConfig,
    background: Option<&[u8]>,
    config: &BannerConfig,
) -> Result<EncodedBanner, BannerError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BannerError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(compose(data, layout, background, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::ChecklistItem;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn background(w: u32, h: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([20, 40, 80, 255])))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn weekly() -> ChecklistData {
        ChecklistData::new("Weekly Goals", vec![ChecklistItem::checked("Complete task")])
    }

    #[tokio::test]
    async fn missing_background_fails_before_decode() {
        let config = BannerConfig::default();
        let layout = LayoutConfig::default();
        for bg in [None, Some(&[][..])] {
            let err = compose(&weekly(), &layout, bg, &config).await.unwrap_err();
            assert!(matches!(err, BannerError::MissingBackground));
            assert_eq!(err.kind(), ErrorKind::Input);
        }
    }

    #[tokio::test]
    async fn out_of_range_font_size_is_rejected() {
        for font_size in [0, crate::config::MAX_FONT_SIZE + 1, u32::MAX] {
            let layout = LayoutConfig {
                font_size,
                ..LayoutConfig::default()
            };
            let bg = background(200, 100);
            let err = compose(&weekly(), &layout, Some(&bg), &BannerConfig::default())
                .await
                .unwrap_err();
            assert!(matches!(err, BannerError::InvalidConfig(_)), "{font_size}: {err:?}");
            assert_eq!(err.kind(), ErrorKind::Config);
        }
    }

    #[tokio::test]
    async fn stats_describe_the_run() {
        let data = ChecklistData::new(
            "Plan",
            vec![ChecklistItem::unchecked("# big"), ChecklistItem::checked("ok")],
        );
        let banner = compose(
            &data,
            &LayoutConfig::default(),
            Some(&background(300, 200)),
            &BannerConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!((banner.width, banner.height), (300, 200));
        assert_eq!(banner.stats.items, 2);
        assert_eq!(banner.stats.fallback_items, 1);
        assert_eq!(banner.warnings[0].index(), 0);
        assert!(!banner.stats.resized);
        assert!(banner.to_data_uri().starts_with("data:image/png;base64,iVBOR"));
    }

    #[tokio::test]
    async fn checked_compose_rejects_thin_content() {
        let data = ChecklistData::new(" ", vec![]);
        let err = compose_checked(
            &data,
            &LayoutConfig::default(),
            Some(&background(10, 10)),
            &BannerConfig::default(),
        )
        .await
        .unwrap_err();
        match err {
            BannerError::ContentRejected { violations } => assert_eq!(violations.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn sync_wrapper_composes() {
        let banner = compose_sync(
            &weekly(),
            &LayoutConfig::default(),
            Some(&background(200, 150)),
            &BannerConfig::default(),
        )
        .unwrap();
        assert!(!banner.is_empty());
        assert_eq!(&banner.as_bytes()[..4], b"\x89PNG");
    }
}
