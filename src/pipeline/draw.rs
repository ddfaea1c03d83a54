//! Drawing styled text onto the banner canvas.
//!
//! Glyph coverage is alpha-blended over the background in the layout's text
//! colour. Styles are synthesised from the one font face:
//!
//! * bold: each glyph is struck twice, one pixel apart
//! * italic: glyph rows are sheared right, one pixel per four rows
//! * strikethrough: a rule through the middle of the span
//! * code: a translucent box behind the span
//!
//! Every drawing call is clipped to the canvas, and item lines are also
//! clipped to their own vertical band so a tall glyph cannot bleed into the
//! next line.

use crate::config::LayoutConfig;
use crate::pipeline::font::{Font, Glyph, CHECKED_GLYPH, UNCHECKED_GLYPH};
use crate::pipeline::render::{RenderedItem, SpanStyle, StyledLine};
use image::{Rgba, RgbaImage};
use std::ops::Range;

/// Alpha of the box drawn behind code spans.
const CODE_BACKDROP_ALPHA: u8 = 48;

/// Blend `color` over `dst` at `coverage` (0–255).
pub fn blend(dst: Rgba<u8>, color: Rgba<u8>, coverage: u8) -> Rgba<u8> {
    let a = color.0[3] as u32 * coverage as u32 / 255;
    if a == 0 {
        return dst;
    }
    let inv = 255 - a;
    let mix = |c: u8, d: u8| ((c as u32 * a + d as u32 * inv + 127) / 255) as u8;
    let out_a = a + dst.0[3] as u32 * inv / 255;
    Rgba([
        mix(color.0[0], dst.0[0]),
        mix(color.0[1], dst.0[1]),
        mix(color.0[2], dst.0[2]),
        out_a.min(255) as u8,
    ])
}

/// Status marker for an item.
pub fn status_glyph(is_checked: bool) -> char {
    if is_checked {
        CHECKED_GLYPH
    } else {
        UNCHECKED_GLYPH
    }
}

/// The drawable line for an item: status glyph, a space, then its text.
pub fn item_line(item: &RenderedItem) -> StyledLine {
    let prefix = format!("{} ", status_glyph(item.is_checked));
    item.line.clone().prefixed(&prefix)
}

/// Draws onto a canvas in one colour, optionally confined to a row band.
pub struct Pen<'a> {
    canvas: &'a mut RgbaImage,
    color: Rgba<u8>,
    rows: Range<i64>,
}

impl<'a> Pen<'a> {
    pub fn new(canvas: &'a mut RgbaImage, color: Rgba<u8>) -> Self {
        let rows = 0..canvas.height() as i64;
        Self { canvas, color, rows }
    }

    /// Restrict drawing to rows in `band` (intersected with the canvas).
    pub fn clipped(mut self, band: Range<i64>) -> Self {
        let height = self.canvas.height() as i64;
        self.rows = band.start.max(0)..band.end.min(height);
        self
    }

    fn plot(&mut self, x: i64, y: i64, coverage: u8, color: Rgba<u8>) {
        if coverage == 0 || !self.rows.contains(&y) || x < 0 || x >= self.canvas.width() as i64 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let dst = *self.canvas.get_pixel(x, y);
        self.canvas.put_pixel(x, y, blend(dst, color, coverage));
    }

    fn fill_rect(&mut self, x: i64, y: i64, width: i64, height: i64, color: Rgba<u8>) {
        let xs = x.max(0)..x.saturating_add(width).min(self.canvas.width() as i64);
        let ys = y.max(self.rows.start)..y.saturating_add(height).min(self.rows.end);
        for py in ys {
            for px in xs.clone() {
                self.plot(px, py, 255, color);
            }
        }
    }

    fn glyph(&mut self, pen_x: i64, top: i64, glyph: &Glyph, style: SpanStyle) {
        let color = self.color;
        let (width, height) = (glyph.width as i64, glyph.height as i64);
        let canvas_width = self.canvas.width() as i64;
        let y0 = top + glyph.y_offset as i64;
        let rows = (self.rows.start - y0).clamp(0, height)..(self.rows.end - y0).clamp(0, height);

        for gy in rows {
            let shear = if style.italic { (height - 1 - gy) / 4 } else { 0 };
            let x0 = pen_x + glyph.x_offset as i64 + shear;
            // Bold also strikes x + 1, so the column just left of the canvas counts.
            let cols = (-1 - x0).clamp(0, width)..(canvas_width - x0).clamp(0, width);
            for gx in cols {
                let coverage = glyph.coverage_at(gx as u32, gy as u32);
                if coverage == 0 {
                    continue;
                }
                let x = x0 + gx;
                self.plot(x, y0 + gy, coverage, color);
                if style.bold {
                    self.plot(x + 1, y0 + gy, coverage, color);
                }
            }
        }
    }

    /// Draw `line` with its top-left at `(x, top)`. Returns the pen position
    /// after the last glyph laid out. Layout stops once the pen is a full
    /// line height past the right edge of the canvas.
    pub fn line(&mut self, font: &Font, line: &StyledLine, x: i64, top: i64) -> i64 {
        let line_height = font.line_height() as i64;
        let right_limit = (self.canvas.width() as i64).saturating_add(line_height);
        let mut pen_x = x;
        let mut prev: Option<char> = None;
        let mut past_edge = false;

        for span in &line.spans {
            let start_x = pen_x;
            let style = span.style;
            let mut glyphs = Vec::new();

            for ch in span.text.chars() {
                if pen_x > right_limit {
                    past_edge = true;
                    break;
                }
                if let Some(p) = prev {
                    pen_x += font.kerning(p, ch) as i64;
                }
                match font.glyph(ch) {
                    Some(glyph) => {
                        let advance = glyph.advance as i64 + style.bold as i64;
                        glyphs.push((pen_x, glyph));
                        pen_x += advance;
                    }
                    None => pen_x += line_height / 2,
                }
                prev = Some(ch);
            }

            if style.code {
                let backdrop = Rgba([
                    self.color.0[0],
                    self.color.0[1],
                    self.color.0[2],
                    CODE_BACKDROP_ALPHA,
                ]);
                self.fill_rect(start_x, top, pen_x - start_x, line_height, backdrop);
            }
            for (gx, glyph) in &glyphs {
                self.glyph(*gx, top, glyph, style);
            }
            if style.strikethrough {
                let thickness = (line_height / 12).max(1);
                let color = self.color;
                self.fill_rect(start_x, top + line_height / 2, pen_x - start_x, thickness, color);
            }
            if past_edge {
                break;
            }
        }

        pen_x
    }
}

/// Draw the header and every item line onto `canvas`.
///
/// Item `i` is drawn at `layout.item_y(i)` and clipped to
/// `[item_y(i), item_y(i) + line_pitch)`.
pub fn draw_checklist(
    canvas: &mut RgbaImage,
    font: &Font,
    header: &StyledLine,
    items: &[RenderedItem],
    layout: &LayoutConfig,
) {
    let color = layout.text_color.rgba();
    let origin = layout.items_origin;

    Pen::new(canvas, color).line(
        font,
        header,
        layout.header_position.x as i64,
        layout.header_position.y as i64,
    );

    let pitch = layout.line_pitch() as i64;
    for (i, item) in items.iter().enumerate() {
        let top = layout.item_y(i);
        if top >= canvas.height() as i64 {
            break;
        }
        Pen::new(canvas, color)
            .clipped(top..top + pitch)
            .line(font, &item_line(item), origin.x as i64, top);
    }
}
