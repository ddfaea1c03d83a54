//! Integration tests for banner composition.
//!
//! Everything runs offline: backgrounds are generated in memory with the
//! `image` crate and publishing uses the simulated uploader.
//!
//! Run with:
//!   cargo test --test compose -- --nocapture

use checklist_banner::publish::{
    Credentials, Platform, PlatformPublisher, Publisher, SimulatedUploader,
};
use checklist_banner::{
    compose, compose_checked, compose_from_source, compose_to_file, BannerConfig, BannerError,
    ChecklistData, ChecklistItem, ErrorKind, FontSource, LayoutConfig, Point, TextColor,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

// ── Test helpers ─────────────────────────────────────────────────────────────

const BG: Rgba<u8> = Rgba([30, 60, 90, 255]);

fn png_background(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, BG))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn jpeg_background(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image::RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10])))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

fn decode(png: &[u8]) -> RgbaImage {
    image::load_from_memory_with_format(png, ImageFormat::Png)
        .expect("output must be a PNG")
        .to_rgba8()
}

/// Whether any pixel in the rectangle differs from the plain background.
fn region_drawn(img: &RgbaImage, x: std::ops::Range<u32>, y: std::ops::Range<u32>) -> bool {
    y.clone()
        .flat_map(|py| x.clone().map(move |px| (px, py)))
        .filter(|&(px, py)| px < img.width() && py < img.height())
        .any(|(px, py)| *img.get_pixel(px, py) != BG)
}

fn weekly_goals() -> ChecklistData {
    ChecklistData::new("Weekly Goals", vec![ChecklistItem::checked("Complete task")])
}

// ── Core scenarios ───────────────────────────────────────────────────────────

#[tokio::test]
async fn weekly_goals_banner_draws_header() {
    let bg = png_background(400, 200);
    let banner = compose(
        &weekly_goals(),
        &LayoutConfig::default(),
        Some(&bg),
        &BannerConfig::default(),
    )
    .await
    .expect("composition should succeed");

    assert!(!banner.is_empty());
    let img = decode(banner.as_bytes());
    assert_eq!(img.dimensions(), (400, 200));
    // Header at (50, 20); the built-in font at 18 px is 16 px tall.
    assert!(region_drawn(&img, 50..250, 20..36), "header not drawn");
    // First item at (50, 100).
    assert!(region_drawn(&img, 50..300, 100..123), "item not drawn");
    // Nothing above the header or left of the text column.
    assert!(!region_drawn(&img, 0..400, 0..20));
    assert!(!region_drawn(&img, 0..50, 0..200));
}

#[tokio::test]
async fn composition_is_idempotent() {
    let bg = png_background(320, 180);
    let data = ChecklistData::new(
        "Sprint",
        vec![
            ChecklistItem::checked("**Ship** it"),
            ChecklistItem::unchecked("*Write* ~~nothing~~ docs"),
            ChecklistItem::unchecked("# heading falls back"),
        ],
    );
    let layout = LayoutConfig::default();
    let config = BannerConfig::default();

    let a = compose(&data, &layout, Some(&bg), &config).await.unwrap();
    let b = compose(&data, &layout, Some(&bg), &config).await.unwrap();
    assert_eq!(a.png, b.png);
}

#[tokio::test]
async fn missing_background_is_an_input_error() {
    let config = BannerConfig::default();
    let layout = LayoutConfig::default();

    let err = compose(&weekly_goals(), &layout, None, &config).await.unwrap_err();
    assert!(matches!(err, BannerError::MissingBackground));
    assert_eq!(err.kind(), ErrorKind::Input);

    let err = compose(&weekly_goals(), &layout, Some(&[][..]), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, BannerError::MissingBackground));
}

#[tokio::test]
async fn undecodable_backgrounds_are_image_decode_errors() {
    let config = BannerConfig::default();
    let layout = LayoutConfig::default();

    let err = compose(&weekly_goals(), &layout, Some(&b"plain text, not an image"[..]), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, BannerError::UnsupportedImageFormat { .. }));
    assert_eq!(err.kind(), ErrorKind::ImageDecode);

    let mut truncated = png_background(64, 64);
    truncated.truncate(50);
    let err = compose(&weekly_goals(), &layout, Some(&truncated), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, BannerError::MalformedImage { .. }));
    assert_eq!(err.kind(), ErrorKind::ImageDecode);
}

#[tokio::test]
async fn empty_checklist_still_composes() {
    let bg = png_background(120, 80);
    let data = ChecklistData::new("", vec![]);
    let banner = compose(&data, &LayoutConfig::default(), Some(&bg), &BannerConfig::default())
        .await
        .unwrap();
    let img = decode(banner.as_bytes());
    assert!(!region_drawn(&img, 0..120, 0..80));
}

#[tokio::test]
async fn jpeg_background_is_accepted() {
    let bg = jpeg_background(200, 120);
    let banner = compose(
        &weekly_goals(),
        &LayoutConfig::default(),
        Some(&bg),
        &BannerConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!((banner.width, banner.height), (200, 120));
}

// ── Normalisation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn oversized_background_is_fit_resized() {
    let bg = png_background(1200, 300);
    let banner = compose(
        &weekly_goals(),
        &LayoutConfig::default(),
        Some(&bg),
        &BannerConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!((banner.width, banner.height), (1000, 250));
    assert!(banner.stats.resized);
    assert_eq!(
        (banner.stats.original_width, banner.stats.original_height),
        (1200, 300)
    );
}

#[tokio::test]
async fn pixel_ceiling_holds_on_output() {
    let config = BannerConfig::builder()
        .max_image_dimensions(200, 200)
        .max_image_pixels(10_000)
        .build()
        .unwrap();
    let banner = compose(
        &weekly_goals(),
        &LayoutConfig::default(),
        Some(&png_background(300, 150)),
        &config,
    )
    .await
    .unwrap();
    assert!(banner.width <= 200 && banner.height <= 200);
    assert!(banner.width as u64 * banner.height as u64 <= 10_000);
    assert!(banner.width > banner.height);
}

// ── Text handling ────────────────────────────────────────────────────────────

#[tokio::test]
async fn blocked_markup_is_never_drawn() {
    let bg = png_background(300, 160);
    let layout = LayoutConfig::default();
    let config = BannerConfig::default();

    let dirty = ChecklistData::new(
        "Plan<style>body{}</style>",
        vec![ChecklistItem::checked("<script>alert('x')</script>Done")],
    );
    let clean = ChecklistData::new("Plan", vec![ChecklistItem::checked("Done")]);

    let a = compose(&dirty, &layout, Some(&bg), &config).await.unwrap();
    let b = compose(&clean, &layout, Some(&bg), &config).await.unwrap();
    assert_eq!(a.png, b.png);
}

#[tokio::test]
async fn emphasis_changes_the_drawing() {
    let bg = png_background(300, 160);
    let layout = LayoutConfig::default();
    let config = BannerConfig::default();

    let plain = ChecklistData::new("T", vec![ChecklistItem::unchecked("Bold")]);
    let bold = ChecklistData::new("T", vec![ChecklistItem::unchecked("**Bold**")]);

    let a = compose(&plain, &layout, Some(&bg), &config).await.unwrap();
    let b = compose(&bold, &layout, Some(&bg), &config).await.unwrap();
    assert_ne!(a.png, b.png);
    assert!(a.warnings.is_empty() && b.warnings.is_empty());
}

#[tokio::test]
async fn status_glyph_reflects_checked_state() {
    let bg = png_background(300, 160);
    let layout = LayoutConfig::default();
    let config = BannerConfig::default();

    let done = ChecklistData::new("T", vec![ChecklistItem::checked("x")]);
    let open = ChecklistData::new("T", vec![ChecklistItem::unchecked("x")]);

    let a = decode(&compose(&done, &layout, Some(&bg), &config).await.unwrap().png);
    let b = decode(&compose(&open, &layout, Some(&bg), &config).await.unwrap().png);

    // Glyph cell is the first 16 px of the item line; the text after it matches.
    let glyph_cell = |img: &RgbaImage| -> Vec<Rgba<u8>> {
        (100..116)
            .flat_map(|y| (50..66).map(move |x| (x, y)))
            .map(|(x, y)| *img.get_pixel(x, y))
            .collect()
    };
    assert_ne!(glyph_cell(&a), glyph_cell(&b));
}

#[tokio::test]
async fn block_markdown_degrades_per_item() {
    let bg = png_background(300, 200);
    let data = ChecklistData::new(
        "Mixed",
        vec![
            ChecklistItem::checked("fine"),
            ChecklistItem::unchecked("- a list"),
            ChecklistItem::unchecked("also fine"),
        ],
    );
    let banner = compose(&data, &LayoutConfig::default(), Some(&bg), &BannerConfig::default())
        .await
        .unwrap();
    assert_eq!(banner.warnings.len(), 1);
    assert_eq!(banner.warnings[0].index(), 1);

    // The degraded item is still drawn, in its own band.
    let img = decode(banner.as_bytes());
    let layout = LayoutConfig::default();
    for i in 0..3 {
        let top = layout.item_y(i) as u32;
        assert!(region_drawn(&img, 50..300, top..top + layout.line_pitch()), "item {i}");
    }
}

#[tokio::test]
async fn items_stack_without_overlap() {
    let layout = LayoutConfig {
        font_size: 10,
        text_color: TextColor::BLACK,
        header_position: Point::new(5, 2),
        items_origin: Point::new(5, 20),
    };
    let items: Vec<ChecklistItem> = (0..6)
        .map(|i| ChecklistItem::new(format!("Item {i}"), i % 2 == 0))
        .collect();
    let data = ChecklistData::new("List", items);
    let bg = png_background(200, 120);
    let banner = compose(&data, &layout, Some(&bg), &BannerConfig::default())
        .await
        .unwrap();
    let img = decode(banner.as_bytes());

    for i in 0..6 {
        let top = layout.item_y(i) as u32;
        // Builtin font at 10 px is 8 px tall: the last LINE_GAP + 2 rows of
        // each band stay empty.
        assert!(region_drawn(&img, 0..200, top..top + 8), "item {i} missing");
        assert!(
            !region_drawn(&img, 0..200, top + 8..top + layout.line_pitch()),
            "item {i} bleeds"
        );
    }
}

#[tokio::test]
async fn many_items_past_the_bottom_edge_are_clipped() {
    let items: Vec<ChecklistItem> = (0..200)
        .map(|i| ChecklistItem::unchecked(format!("{i}")))
        .collect();
    let data = ChecklistData::new("Long", items);
    let bg = png_background(100, 100);
    let banner = compose(&data, &LayoutConfig::default(), Some(&bg), &BannerConfig::default())
        .await
        .unwrap();
    assert_eq!((banner.width, banner.height), (100, 100));
    assert_eq!(banner.stats.items, 200);
}

// ── Entry points ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn compose_checked_rejects_invalid_content() {
    let bg = png_background(100, 100);
    let layout = LayoutConfig::default();
    let config = BannerConfig::default();

    let long = ChecklistData::new("Test", vec![ChecklistItem::unchecked("a".repeat(101))]);
    let err = compose_checked(&long, &layout, Some(&bg), &config)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(err.to_string().contains("101 characters"));

    let ok = ChecklistData::new("Test", vec![ChecklistItem::checked("ok")]);
    assert!(compose_checked(&ok, &layout, Some(&bg), &config).await.is_ok());
}

#[tokio::test]
async fn compose_to_file_writes_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("banner.png");

    let banner = compose_to_file(
        &weekly_goals(),
        &LayoutConfig::default(),
        Some(&png_background(150, 150)),
        &path,
        &BannerConfig::default(),
    )
    .await
    .unwrap();

    let written = std::fs::read(&path).unwrap();
    assert_eq!(written, banner.png);
    assert!(!path.with_extension("png.tmp").exists());
}

#[tokio::test]
async fn compose_from_local_source() {
    let dir = tempfile::tempdir().unwrap();
    let bg_path = dir.path().join("bg.png");
    std::fs::write(&bg_path, png_background(160, 120)).unwrap();

    let banner = compose_from_source(
        &weekly_goals(),
        &LayoutConfig::default(),
        bg_path.to_str().unwrap(),
        &BannerConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!((banner.width, banner.height), (160, 120));

    let err = compose_from_source(
        &weekly_goals(),
        &LayoutConfig::default(),
        dir.path().join("missing.png").to_str().unwrap(),
        &BannerConfig::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fetch);
}

#[tokio::test]
async fn missing_font_is_a_resource_error() {
    let config = BannerConfig::builder()
        .font(FontSource::BmFont("./fonts/Roboto-Regular-16.fnt".into()))
        .build()
        .unwrap();
    let err = compose(
        &weekly_goals(),
        &LayoutConfig::default(),
        Some(&png_background(100, 100)),
        &config,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BannerError::FontLoadFailed { .. }));
    assert_eq!(err.kind(), ErrorKind::ResourceLoad);
}

#[tokio::test]
async fn concurrent_compositions_are_independent() {
    let bg = png_background(200, 140);
    let layout = LayoutConfig::default();
    let config = BannerConfig::default();
    let requests: Vec<ChecklistData> = (0..6)
        .map(|i| {
            ChecklistData::new(
                format!("Banner {i}"),
                vec![ChecklistItem::new(format!("task {i}"), i % 2 == 1)],
            )
        })
        .collect();

    let parallel = futures::future::join_all(
        requests.iter().map(|d| compose(d, &layout, Some(&bg), &config)),
    )
    .await;

    for (data, result) in requests.iter().zip(parallel) {
        let sequential = compose(data, &layout, Some(&bg), &config).await.unwrap();
        assert_eq!(result.unwrap().png, sequential.png);
    }
}

// ── Publishing ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn composed_banner_publishes() {
    let banner = compose(
        &weekly_goals(),
        &LayoutConfig::default(),
        Some(&png_background(200, 100)),
        &BannerConfig::default(),
    )
    .await
    .unwrap();

    let publisher = PlatformPublisher::new(Platform::Bluesky, SimulatedUploader::always_succeed());
    let creds = Credentials::new("me.bsky.social", "abcd-efgh");
    assert!(publisher.publish(banner.as_bytes(), &creds).await);

    let empty = Credentials::new("", "");
    assert!(!publisher.publish(banner.as_bytes(), &empty).await);
}
