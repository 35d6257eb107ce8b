//! Wire schema for the structured atlas description.
//!
//! Matches the JSON emitted by msdf-atlas-gen style bakers, extended
//! with a `variants` array so one atlas image can pack several styles
//! (regular/bold/italic) of the same family:
//!
//! ```text
//! {
//!   "atlas":    { "distanceRange": 2.0, "size": 32.0,
//!                 "width": 512, "height": 512 },
//!   "variants": [ { "metrics":  { "lineHeight": …, "ascender": …,
//!                                 "descender": … },
//!                   "glyphs":   [ { "unicode": 65, "advance": 0.6,
//!                                   "planeBounds": {…},
//!                                   "atlasBounds": {…} }, … ],
//!                   "kerning":  [ { "unicode1": 65, "unicode2": 66,
//!                                   "advance": -0.05 }, … ] }, … ]
//! }
//! ```
//!
//! Field names are camelCase on the wire. `planeBounds`/`atlasBounds`
//! are absent for glyphs with no visible shape (space); they parse as
//! zeroed bounds. `kerning` is optional per variant.

use serde::Deserialize;

// ── Document root ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct AtlasDoc {
    pub atlas: AtlasInfoDoc,
    pub variants: Vec<VariantDoc>,
}

/// Global atlas scalars shared by every variant.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AtlasInfoDoc {
    /// Distance-field range in atlas pixels (anti-aliasing width input).
    pub distance_range: f32,
    /// Nominal em size in atlas pixels the glyphs were baked at.
    pub size: f32,
    pub width: u32,
    pub height: u32,
}

// ── Per-variant tables ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct VariantDoc {
    pub metrics: MetricsDoc,
    pub glyphs: Vec<GlyphDoc>,
    #[serde(default)]
    pub kerning: Vec<KerningDoc>,
}

/// Vertical metrics in em units. `descender` is typically negative.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetricsDoc {
    pub line_height: f32,
    pub ascender: f32,
    pub descender: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GlyphDoc {
    pub unicode: u32,
    pub advance: f32,
    #[serde(default)]
    pub plane_bounds: Option<BoundsDoc>,
    #[serde(default)]
    pub atlas_bounds: Option<BoundsDoc>,
}

/// A left/bottom/right/top quad, Y-up.
#[derive(Clone, Copy, Debug, Deserialize)]
pub(crate) struct BoundsDoc {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KerningDoc {
    pub unicode1: u32,
    pub unicode2: u32,
    pub advance: f32,
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "atlas": { "distanceRange": 2.0, "size": 32.0, "width": 64, "height": 64 },
        "variants": [
            {
                "metrics": { "lineHeight": 1.2, "ascender": 0.9, "descender": -0.25 },
                "glyphs": [
                    {
                        "unicode": 65,
                        "advance": 0.6,
                        "planeBounds": { "left": 0.01, "bottom": -0.02, "right": 0.55, "top": 0.72 },
                        "atlasBounds": { "left": 1.5, "bottom": 2.5, "right": 19.5, "top": 25.5 }
                    },
                    { "unicode": 32, "advance": 0.25 }
                ],
                "kerning": [
                    { "unicode1": 65, "unicode2": 66, "advance": -0.05 }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_minimal_doc() {
        let doc: AtlasDoc = serde_json::from_str(MINIMAL).unwrap();
        assert_eq!(doc.atlas.distance_range, 2.0);
        assert_eq!(doc.atlas.size, 32.0);
        assert_eq!(doc.atlas.width, 64);
        assert_eq!(doc.atlas.height, 64);
        assert_eq!(doc.variants.len(), 1);

        let variant = &doc.variants[0];
        assert_eq!(variant.metrics.line_height, 1.2);
        assert_eq!(variant.metrics.ascender, 0.9);
        assert_eq!(variant.metrics.descender, -0.25);
        assert_eq!(variant.glyphs.len(), 2);
        assert_eq!(variant.kerning.len(), 1);
    }

    #[test]
    fn test_bounds_parse_as_declared() {
        let doc: AtlasDoc = serde_json::from_str(MINIMAL).unwrap();
        let glyph = &doc.variants[0].glyphs[0];
        assert_eq!(glyph.unicode, 65);
        assert_eq!(glyph.advance, 0.6);

        let plane = glyph.plane_bounds.unwrap();
        assert_eq!(plane.left, 0.01);
        assert_eq!(plane.bottom, -0.02);
        assert_eq!(plane.right, 0.55);
        assert_eq!(plane.top, 0.72);

        let atlas = glyph.atlas_bounds.unwrap();
        assert_eq!(atlas.left, 1.5);
        assert_eq!(atlas.top, 25.5);
    }

    #[test]
    fn test_boundless_glyph_parses() {
        // Space carries an advance but no rectangles.
        let doc: AtlasDoc = serde_json::from_str(MINIMAL).unwrap();
        let space = &doc.variants[0].glyphs[1];
        assert_eq!(space.unicode, 32);
        assert!(space.plane_bounds.is_none());
        assert!(space.atlas_bounds.is_none());
    }

    #[test]
    fn test_kerning_is_optional() {
        let doc: AtlasDoc = serde_json::from_str(
            r#"{
                "atlas": { "distanceRange": 2.0, "size": 32.0, "width": 8, "height": 8 },
                "variants": [
                    { "metrics": { "lineHeight": 1.0, "ascender": 0.8, "descender": -0.2 },
                      "glyphs": [] }
                ]
            }"#,
        )
        .unwrap();
        assert!(doc.variants[0].kerning.is_empty());
    }

    #[test]
    fn test_missing_required_field_fails() {
        // No "size" in atlas.
        let result: Result<AtlasDoc, _> = serde_json::from_str(
            r#"{
                "atlas": { "distanceRange": 2.0, "width": 8, "height": 8 },
                "variants": []
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_metrics_field_fails() {
        let result: Result<AtlasDoc, _> = serde_json::from_str(
            r#"{
                "atlas": { "distanceRange": 2.0, "size": 32.0, "width": 8, "height": 8 },
                "variants": [
                    { "metrics": { "lineHeight": 1.0, "ascender": 0.8 }, "glyphs": [] }
                ]
            }"#,
        );
        assert!(result.is_err());
    }
}
