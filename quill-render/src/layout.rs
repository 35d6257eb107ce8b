//! Glyph placement: advance/kerning accumulation and alignment.
//!
//! Layout here is deliberately simple. A line is a sequence of Unicode
//! codepoints; each codepoint that resolves to a glyph is placed at the
//! running pen position after adding the kerning adjustment against the
//! previous resolved codepoint, then the pen advances by the glyph's
//! advance. Codepoints with no glyph are skipped entirely — no advance,
//! no kerning link. Multi-line text splits on `'\n'` and stacks lines
//! by the variant's line height. No bidi, no complex-script shaping,
//! no automatic line breaking.
//!
//! All font-space quantities (advance, kerning, metrics) are in em
//! units and scale linearly by the font size in pixels. Screen space is
//! Y-down: the pen sits on the glyph baseline, and vertical alignment
//! offsets move the baseline *down* for `Top` (below the anchor by one
//! ascender) and *up* for `Bottom`.
//!
//! ```text
//!   anchor ┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄┐          Top:      baseline = y + asc·s
//!          ascender · size │          Middle:   baseline = y + (asc+desc)/2·s
//!   baseline ──A──B──C─────┘          Baseline: baseline = y
//!          descender · size           Bottom:   baseline = y + desc·s
//! ```

use quill_atlas::{FontVariant, Glyph, GlyphBounds};

// ───────────────────────────────────────────────────────────────────
// Alignment
// ───────────────────────────────────────────────────────────────────

/// Horizontal anchor of a line (and of every line in a multi-line
/// block) relative to the draw position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextHAlign {
    /// The draw position is the pen origin; text extends rightward.
    Left,
    /// The line is centered on the draw position.
    Center,
    /// The line ends at the draw position; text extends leftward.
    Right,
}

impl Default for TextHAlign {
    fn default() -> Self {
        TextHAlign::Left
    }
}

/// Vertical anchor of a line (or multi-line block) relative to the
/// draw position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextVAlign {
    /// The draw position is the top of the text.
    Top,
    /// The draw position is the vertical center.
    Middle,
    /// The draw position is the (first line's) baseline.
    Baseline,
    /// The draw position is the bottom of the text.
    Bottom,
}

impl Default for TextVAlign {
    fn default() -> Self {
        TextVAlign::Baseline
    }
}

/// X offset from the anchor position to the line's pen origin, given
/// the line's measured width in pixels.
pub fn h_align_offset(align: TextHAlign, line_width: f32) -> f32 {
    match align {
        TextHAlign::Left => 0.0,
        TextHAlign::Center => -line_width / 2.0,
        TextHAlign::Right => -line_width,
    }
}

/// Y offset from the anchor position to the baseline, for a single
/// line of `size`-pixel text.
pub fn v_align_offset(align: TextVAlign, variant: &FontVariant, size: f32) -> f32 {
    match align {
        TextVAlign::Top => variant.ascender * size,
        TextVAlign::Middle => (variant.ascender + variant.descender) / 2.0 * size,
        TextVAlign::Baseline => 0.0,
        TextVAlign::Bottom => variant.descender * size,
    }
}

/// Y offset from the anchor position to the *top* of a multi-line
/// block of `block_height` pixels.
///
/// The first line's baseline then sits at
/// `top + ascender × size`, and line *i* at a further
/// `i × line_height × size` below it.
pub fn block_top_offset(
    align: TextVAlign,
    variant: &FontVariant,
    size: f32,
    block_height: f32,
) -> f32 {
    match align {
        TextVAlign::Top => 0.0,
        TextVAlign::Middle => -block_height / 2.0,
        TextVAlign::Baseline => -variant.ascender * size,
        TextVAlign::Bottom => -block_height,
    }
}

// ───────────────────────────────────────────────────────────────────
// Glyph walk
// ───────────────────────────────────────────────────────────────────

/// A glyph resolved against a variant, placed `x` pixels right of the
/// line's pen origin.
#[derive(Clone, Copy, Debug)]
pub struct PlacedGlyph<'a> {
    pub glyph: &'a Glyph,
    pub x: f32,
}

/// Iterator over one line of text yielding each resolved glyph with
/// its pen position in pixels.
///
/// This is the single source of truth for horizontal placement — the
/// batch consumes it directly, and [`FontVariant::line_advance`]
/// computes the same sum without the per-glyph positions.
pub struct GlyphWalk<'a> {
    variant: &'a FontVariant,
    chars: std::str::Chars<'a>,
    size: f32,
    pen_x: f32,
    prev: Option<char>,
}

impl<'a> GlyphWalk<'a> {
    /// Walk `line` (which must not contain `'\n'`; split first) at
    /// `size` pixels per em.
    pub fn new(variant: &'a FontVariant, line: &'a str, size: f32) -> Self {
        Self {
            variant,
            chars: line.chars(),
            size,
            pen_x: 0.0,
            prev: None,
        }
    }
}

impl<'a> Iterator for GlyphWalk<'a> {
    type Item = PlacedGlyph<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let ch = self.chars.next()?;
            let Some(glyph) = self.variant.glyph(ch) else {
                // Unmapped: skip without touching pen or kerning state.
                continue;
            };
            if let Some(prev) = self.prev {
                if let Some(kern) = self.variant.kerning(prev, ch) {
                    self.pen_x += kern * self.size;
                }
            }
            let x = self.pen_x;
            self.pen_x += glyph.advance * self.size;
            self.prev = Some(ch);
            return Some(PlacedGlyph { glyph, x });
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Texture coordinates
// ───────────────────────────────────────────────────────────────────

/// Normalize a glyph's pixel atlas bounds to UV space.
///
/// Atlas descriptions measure from the image's *bottom-left* corner;
/// texture sampling uses a *top-left* origin, so V is flipped
/// (`v = 1 − y / height`). The returned `[u0, v0, u1, v1]` pairs
/// `v0` with the glyph's plane-bounds bottom edge.
pub fn glyph_uv(bounds: &GlyphBounds, atlas_width: f32, atlas_height: f32) -> [f32; 4] {
    [
        bounds.left / atlas_width,
        1.0 - bounds.bottom / atlas_height,
        bounds.right / atlas_width,
        1.0 - bounds.top / atlas_height,
    ]
}

// ===================================================================
// Tests
// ===================================================================
