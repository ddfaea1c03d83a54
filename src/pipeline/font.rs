//! Bitmap font resource.
//!
//! Two sources, selected by [`FontSource`]:
//!
//! * **Builtin**: the public-domain 8x8 glyphs from `font8x8`, scaled by an
//!   integer factor `max(1, font_size / 8)`. Always available, no I/O.
//! * **BmFont**: an AngelCode BMFont text descriptor (`.fnt`) plus its PNG
//!   pages, resolved relative to the descriptor. BMFont glyphs are drawn at
//!   their native size; `font_size` then only sets the line pitch.
//!
//! The status glyphs `✓` and `○` are not in most bitmap fonts, so both
//! sources fall back to built-in bitmaps for them.

use crate::config::{FontSource, MAX_FONT_SIZE};
use crate::error::BannerError;
use font8x8::{UnicodeFonts, BASIC_FONTS, BLOCK_FONTS, BOX_FONTS, GREEK_FONTS, LATIN_FONTS};
use image::{DynamicImage, GenericImageView};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Glyph for a completed item.
pub const CHECKED_GLYPH: char = '✓';
/// Glyph for an open item.
pub const UNCHECKED_GLYPH: char = '○';

// Rows top to bottom, bit 0 is the leftmost column (font8x8 layout).
const CHECK_BITMAP: [u8; 8] = [0x00, 0x80, 0x40, 0x20, 0x11, 0x0A, 0x04, 0x00];
const CIRCLE_BITMAP: [u8; 8] = [0x00, 0x3C, 0x42, 0x42, 0x42, 0x42, 0x3C, 0x00];

/// Largest integer scale applied to an 8x8 bitmap.
const MAX_SCALE: u32 = MAX_FONT_SIZE / 8;

/// One rasterised character: an alpha coverage mask plus placement metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub width: u32,
    pub height: u32,
    /// Offset of the mask from the pen position.
    pub x_offset: i32,
    pub y_offset: i32,
    /// How far the pen moves after this glyph.
    pub advance: i32,
    /// Row-major coverage, 0 (transparent) to 255 (solid).
    pub coverage: Vec<u8>,
}

impl Glyph {
    pub fn coverage_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.coverage[y as usize * self.width as usize + x as usize]
    }

    fn from_rows(rows: [u8; 8], scale: u32) -> Self {
        let scale = scale.clamp(1, MAX_SCALE);
        let size = 8 * scale;
        let stride = size as usize;
        let mut coverage = vec![0u8; stride * stride];
        for (row_idx, row) in rows.iter().enumerate() {
            for col_idx in 0..8usize {
                if (row >> col_idx) & 1 == 0 {
                    continue;
                }
                let x0 = col_idx * scale as usize;
                for sy in 0..scale as usize {
                    let start = (row_idx * scale as usize + sy) * stride + x0;
                    coverage[start..start + scale as usize].fill(255);
                }
            }
        }
        Glyph {
            width: size,
            height: size,
            x_offset: 0,
            y_offset: 0,
            advance: size as i32,
            coverage,
        }
    }
}

fn builtin_rows(ch: char) -> Option<[u8; 8]> {
    match ch {
        CHECKED_GLYPH => Some(CHECK_BITMAP),
        UNCHECKED_GLYPH => Some(CIRCLE_BITMAP),
        _ => BASIC_FONTS
            .get(ch)
            .or_else(|| LATIN_FONTS.get(ch))
            .or_else(|| BOX_FONTS.get(ch))
            .or_else(|| BLOCK_FONTS.get(ch))
            .or_else(|| GREEK_FONTS.get(ch)),
    }
}

fn is_status_glyph(ch: char) -> bool {
    ch == CHECKED_GLYPH || ch == UNCHECKED_GLYPH
}

// ── Font ─────────────────────────────────────────────────────────────────

/// A loaded font, ready for drawing.
#[derive(Debug, Clone)]
pub struct Font {
    kind: FontKind,
}

#[derive(Debug, Clone)]
enum FontKind {
    Builtin { scale: u32 },
    BmFont(BmFont),
}

impl Font {
    /// The built-in font sized for `font_size`.
    pub fn builtin(font_size: u32) -> Self {
        Font {
            kind: FontKind::Builtin {
                scale: (font_size / 8).clamp(1, MAX_SCALE),
            },
        }
    }

    /// Load the font named by `source`. Only BMFont sources touch the disk.
    pub fn load(source: &FontSource, font_size: u32) -> Result<Self, BannerError> {
        match source {
            FontSource::Builtin => Ok(Self::builtin(font_size)),
            FontSource::BmFont(path) => Ok(Font {
                kind: FontKind::BmFont(BmFont::load(path)?),
            }),
        }
    }

    /// Height of one line of text in pixels.
    pub fn line_height(&self) -> u32 {
        match &self.kind {
            FontKind::Builtin { scale } => 8 * scale,
            FontKind::BmFont(bm) => bm.line_height,
        }
    }

    /// Scale used for built-in bitmaps drawn with this font.
    fn bitmap_scale(&self) -> u32 {
        match &self.kind {
            FontKind::Builtin { scale } => *scale,
            FontKind::BmFont(bm) => (bm.line_height / 8).clamp(1, MAX_SCALE),
        }
    }

    /// Glyph for `ch`, falling back to `?`. `None` only when neither exists.
    pub fn glyph(&self, ch: char) -> Option<Cow<'_, Glyph>> {
        match &self.kind {
            FontKind::Builtin { scale } => builtin_rows(ch)
                .or_else(|| builtin_rows('?'))
                .map(|rows| Cow::Owned(Glyph::from_rows(rows, *scale))),
            FontKind::BmFont(bm) => {
                if let Some(g) = bm.glyphs.get(&ch) {
                    return Some(Cow::Borrowed(g));
                }
                if is_status_glyph(ch) {
                    return builtin_rows(ch)
                        .map(|rows| Cow::Owned(Glyph::from_rows(rows, self.bitmap_scale())));
                }
                bm.glyphs.get(&'?').map(Cow::Borrowed)
            }
        }
    }

    /// Pen adjustment between `left` and `right`.
    pub fn kerning(&self, left: char, right: char) -> i32 {
        match &self.kind {
            FontKind::Builtin { .. } => 0,
            FontKind::BmFont(bm) => bm.kerning.get(&(left, right)).copied().unwrap_or(0),
        }
    }
}

// ── BMFont ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct BmFont {
    line_height: u32,
    glyphs: HashMap<char, Glyph>,
    kerning: HashMap<(char, char), i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CharDef {
    id: char,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    x_offset: i32,
    y_offset: i32,
    advance: i32,
    page: u32,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Descriptor {
    line_height: u32,
    pages: HashMap<u32, String>,
    chars: Vec<CharDef>,
    kerning: Vec<(char, char, i32)>,
}

static RE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(\w+)=("[^"]*"|\S+)"#).unwrap());

fn parse_descriptor(text: &str) -> Result<Descriptor, String> {
    let mut desc = Descriptor::default();
    let mut saw_common = false;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        let Some(tag) = line.split_whitespace().next() else {
            continue;
        };
        let attrs: HashMap<&str, &str> = RE_ATTR
            .captures_iter(line)
            .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str().trim_matches('"'))))
            .collect();
        let int = |key: &str| -> Result<i64, String> {
            attrs
                .get(key)
                .ok_or_else(|| format!("line {}: '{tag}' has no '{key}'", line_no + 1))?
                .parse::<i64>()
                .map_err(|e| format!("line {}: bad '{key}': {e}", line_no + 1))
        };
        let unsigned = |key: &str| -> Result<u32, String> {
            u32::try_from(int(key)?).map_err(|_| format!("line {}: negative '{key}'", line_no + 1))
        };

        match tag {
            "common" => {
                desc.line_height = unsigned("lineHeight")?;
                saw_common = true;
            }
            "page" => {
                let file = attrs
                    .get("file")
                    .ok_or_else(|| format!("line {}: page has no file", line_no + 1))?;
                desc.pages.insert(unsigned("id")?, file.to_string());
            }
            "char" => {
                let Some(id) = char::from_u32(unsigned("id")?) else {
                    continue;
                };
                desc.chars.push(CharDef {
                    id,
                    x: unsigned("x")?,
                    y: unsigned("y")?,
                    width: unsigned("width")?,
                    height: unsigned("height")?,
                    x_offset: int("xoffset")? as i32,
                    y_offset: int("yoffset")? as i32,
                    advance: int("xadvance")? as i32,
                    page: unsigned("page").unwrap_or(0),
                });
            }
            "kerning" => {
                if let (Some(a), Some(b)) = (
                    char::from_u32(unsigned("first")?),
                    char::from_u32(unsigned("second")?),
                ) {
                    desc.kerning.push((a, b, int("amount")? as i32));
                }
            }
            _ => {}
        }
    }

    if !saw_common || desc.line_height == 0 {
        return Err("missing 'common lineHeight=…' line".into());
    }
    if desc.chars.is_empty() {
        return Err("descriptor defines no characters".into());
    }
    Ok(desc)
}

/// Coverage of a page: its alpha channel, or luminance for opaque pages.
fn page_coverage(page: &DynamicImage) -> (u32, u32, Vec<u8>) {
    let (w, h) = page.dimensions();
    if page.color().has_alpha() {
        let la = page.to_luma_alpha8();
        (w, h, la.pixels().map(|p| p.0[1]).collect())
    } else {
        (w, h, page.to_luma8().into_raw())
    }
}

impl BmFont {
    fn load(path: &Path) -> Result<Self, BannerError> {
        let fail = |detail: String| BannerError::FontLoadFailed {
            path: path.to_path_buf(),
            detail,
        };

        let text = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        let desc = parse_descriptor(&text).map_err(fail)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut pages: HashMap<u32, (u32, u32, Vec<u8>)> = HashMap::new();
        for (id, file) in &desc.pages {
            let page_path: PathBuf = base_dir.join(file);
            let page = image::open(&page_path)
                .map_err(|e| fail(format!("page {id} ('{}'): {e}", page_path.display())))?;
            pages.insert(*id, page_coverage(&page));
        }

        let mut glyphs = HashMap::with_capacity(desc.chars.len());
        for c in &desc.chars {
            let (page_w, page_h, cov) = pages
                .get(&c.page)
                .ok_or_else(|| fail(format!("char {:?} refers to missing page {}", c.id, c.page)))?;
            let outside = || {
                fail(format!(
                    "char {:?} lies outside page {} ({}x{})",
                    c.id, c.page, page_w, page_h
                ))
            };
            let right = c.x.checked_add(c.width).ok_or_else(outside)?;
            let bottom = c.y.checked_add(c.height).ok_or_else(outside)?;
            if right > *page_w || bottom > *page_h {
                return Err(outside());
            }
            // In bounds of a decoded page, so these products fit in usize.
            let (x, width, page_w) = (c.x as usize, c.width as usize, *page_w as usize);
            let mut coverage = Vec::with_capacity(width * c.height as usize);
            for y in c.y as usize..bottom as usize {
                let row = y * page_w + x;
                coverage.extend_from_slice(&cov[row..row + width]);
            }
            glyphs.insert(
                c.id,
                Glyph {
                    width: c.width,
                    height: c.height,
                    x_offset: c.x_offset,
                    y_offset: c.y_offset,
                    advance: c.advance,
                    coverage,
                },
            );
        }

        debug!(
            "Loaded BMFont {} ({} glyphs, line height {})",
            path.display(),
            glyphs.len(),
            desc.line_height
        );

        Ok(BmFont {
            line_height: desc.line_height,
            glyphs,
            kerning: desc
                .kerning
                .into_iter()
                .map(|(a, b, amount)| ((a, b), amount))
                .collect(),
        })
    }
}
