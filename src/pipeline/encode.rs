//! Image encoding: finished canvas → PNG bytes.
//!
//! PNG because it is lossless: banner text is thin, high-contrast and
//! single-coloured, exactly what JPEG artefacts ruin. The encoder writes no
//! timestamps or other ancillary chunks, so equal canvases encode to equal
//! bytes.

use crate::error::BannerError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

pub const PNG_MIME: &str = "image/png";

/// Encode a drawn canvas as PNG.
pub fn encode_png(canvas: RgbaImage) -> Result<Vec<u8>, BannerError> {
    let (w, h) = canvas.dimensions();
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| BannerError::EncodeFailed(e.to_string()))?;
    debug!("Encoded {}x{} banner → {} bytes PNG", w, h, buf.len());
    Ok(buf)
}

/// `data:image/png;base64,…` for inline previews.
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:{};base64,{}", PNG_MIME, STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn canvas() -> RgbaImage {
        RgbaImage::from_fn(10, 10, |x, y| Rgba([x as u8 * 20, y as u8 * 20, 0, 255]))
    }

    #[test]
    fn encodes_png_signature() {
        let png = encode_png(canvas()).expect("encode should succeed");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded, canvas());
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(encode_png(canvas()).unwrap(), encode_png(canvas()).unwrap());
    }

    #[test]
    fn data_uri_wraps_base64() {
        let uri = png_data_uri(b"\x89PNG");
        assert_eq!(uri, "data:image/png;base64,iVBORw==");
        let payload = uri.trim_start_matches("data:image/png;base64,");
        assert_eq!(STANDARD.decode(payload).unwrap(), b"\x89PNG");
    }
}
