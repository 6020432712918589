//! Font metrics for card text.
//!
//! `TextMeasure` is the only thing the fitting engine needs: a rendered width
//! and a line height at a given pixel size. Two fonts implement it:
//!
//! - `CardFont::Glyph` — an outline font loaded from disk or the system font
//!   database, measured with `ab_glyph` (advances plus kerning).
//! - `CardFont::Builtin` — the 8×8 bitmap font from `font8x8`, scaled by whole
//!   cells. Always available, so cards render even on a host with no fonts.
//!   Every glyph advances by exactly one font size, which also makes it the
//!   font used by the layout tests.

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

/// Pixel measurements of a font. Implementations must be deterministic.
pub trait TextMeasure {
    /// Rendered width of `text` on a single line at `size` px.
    fn text_width(&self, text: &str, size: u32) -> f32;

    /// Height of one line at `size` px, excluding inter-line spacing.
    fn line_height(&self, size: u32) -> f32;
}

/// A font the card compositor can both measure and draw with.
#[derive(Clone)]
pub enum CardFont {
    Glyph(FontArc),
    Builtin,
}

impl std::fmt::Debug for CardFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardFont::Glyph(_) => f.write_str("CardFont::Glyph"),
            CardFont::Builtin => f.write_str("CardFont::Builtin"),
        }
    }
}

impl TextMeasure for CardFont {
    fn text_width(&self, text: &str, size: u32) -> f32 {
        match self {
            CardFont::Glyph(font) => glyph_width(font, text, size),
            CardFont::Builtin => text.chars().count() as f32 * size as f32,
        }
    }

    fn line_height(&self, size: u32) -> f32 {
        match self {
            CardFont::Glyph(font) => font.as_scaled(PxScale::from(size as f32)).height(),
            CardFont::Builtin => size as f32,
        }
    }
}

impl CardFont {
    /// Draws one line with its top-left corner at `(x, y)`.
    pub fn draw_line(&self, canvas: &mut RgbImage, text: &str, x: i32, y: i32, size: u32, color: Rgb<u8>) {
        match self {
            CardFont::Glyph(font) => {
                draw_text_mut(canvas, color, x, y, PxScale::from(size as f32), font, text)
            }
            CardFont::Builtin => draw_builtin_text(canvas, text, x, y, size, color),
        }
    }
}

fn glyph_width(font: &FontArc, text: &str, size: u32) -> f32 {
    let scaled = font.as_scaled(PxScale::from(size as f32));
    let mut width = 0.0_f32;
    let mut previous: Option<GlyphId> = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in bitmap font
// ────────────────────────────────────────────────────────────────────────────

/// Row bitmaps for `c`. Bit `n` of each row is pixel column `n` from the left.
/// Covers Basic Latin and Latin-1 (ä, ö, å); anything else renders as `?`.
fn builtin_glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Draws `text` with the bitmap font, one `size`-wide cell per character.
pub fn draw_builtin_text(canvas: &mut RgbImage, text: &str, x: i32, y: i32, size: u32, color: Rgb<u8>) {
    let cell = (size / 8).max(1);
    for (i, c) in text.chars().enumerate() {
        let origin_x = x + (i as u32 * size) as i32;
        for (row, bits) in builtin_glyph(c).iter().enumerate() {
            for col in 0..8u32 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = origin_x + (col * cell) as i32;
                let py = y + (row as u32 * cell) as i32;
                draw_filled_rect_mut(canvas, Rect::at(px, py).of_size(cell, cell), color);
            }
        }
    }
}
