//! Composition results.

use crate::error::RenderWarning;
use crate::pipeline::encode;
use serde::{Deserialize, Serialize};

/// A finished banner: PNG bytes plus what happened while making it.
///
/// Only `png` is the banner itself. The other fields describe the run and
/// are not embedded in the image, so identical requests produce identical
/// `png` bytes.
#[derive(Debug, Clone)]
pub struct EncodedBanner {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Items drawn as plain sanitized text, in item order.
    pub warnings: Vec<RenderWarning>,
    pub stats: ComposeStats,
}

impl EncodedBanner {
    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.png
    }

    pub fn len(&self) -> usize {
        self.png.len()
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }

    /// `data:image/png;base64,…`, ready for an `<img src>`.
    pub fn to_data_uri(&self) -> String {
        encode::png_data_uri(&self.png)
    }
}

/// Counters and timings for one composition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeStats {
    pub items: usize,
    /// Items that fell back to unstyled text.
    pub fallback_items: usize,
    pub original_width: u32,
    pub original_height: u32,
    /// Whether the background was scaled down.
    pub resized: bool,
    pub render_duration_ms: u64,
    pub draw_duration_ms: u64,
    pub total_duration_ms: u64,
}
