//! Font atlas data model — parsed glyph tables plus the GPU-resident
//! atlas texture.
//!
//! One [`FontAtlas`] corresponds to one baked MSDF atlas image shared
//! by one or more [`FontVariant`]s (regular/bold/italic of a family).
//! Loading happens once at startup; after that the atlas is immutable
//! and shared read-only.
//!
//! ## Architecture
//!
//! ```text
//! FontAtlas
//!   ├── variants: Vec<Arc<FontVariant>>       (glyph + kerning tables)
//!   ├── distance_range / em_size / width / height
//!   └── texture + view                        (Rgba8Unorm, upload once)
//!
//! FontVariant
//!   ├── glyphs:  HashMap<char, Glyph>          (O(1) lookup)
//!   ├── kerning: HashMap<(char, char), f32>    (O(1) ordered-pair lookup)
//!   └── line_height / ascender / descender     (em units)
//! ```
//!
//! Load pipeline: read description → parse (serde_json) → read image →
//! validate declared dimensions against device limits → decode (image
//! crate) → create texture → upload pixels. Every intermediate value is
//! dropped on the error path, so a failed load leaks nothing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;
use wgpu::{
    Device, Extent3d, Queue, TextureDescriptor, TextureDimension,
    TextureFormat, TextureUsages,
};

use crate::schema::{AtlasDoc, AtlasInfoDoc, BoundsDoc, VariantDoc};

// ── Errors ──────────────────────────────────────────────────────────

/// Startup-fatal load failures. Never retried; the caller aborts
/// initialization.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not read {path:?}: {source}")]
    NotFound {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed atlas description: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("atlas image rejected: {0}")]
    Decode(String),
    #[error("GPU device rejected atlas: {0}")]
    Device(String),
}

// ── Glyph data ──────────────────────────────────────────────────────

/// A left/bottom/right/top rectangle, Y-up.
///
/// For plane bounds the units are em-relative local space; for atlas
/// bounds they are pixels in the atlas image.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlyphBounds {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl From<BoundsDoc> for GlyphBounds {
    fn from(doc: BoundsDoc) -> Self {
        Self {
            left: doc.left,
            bottom: doc.bottom,
            right: doc.right,
            top: doc.top,
        }
    }
}

/// One codepoint's metrics and atlas placement. Immutable once loaded.
///
/// Glyphs with no visible shape (space) carry zeroed bounds: they
/// advance the cursor but expand to a degenerate quad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glyph {
    pub codepoint: char,
    /// Horizontal advance in em units (scaled by draw size at layout).
    pub advance: f32,
    pub plane_bounds: GlyphBounds,
    pub atlas_bounds: GlyphBounds,
}

// ── Font variant ────────────────────────────────────────────────────

/// Glyph and kerning tables for one style within an atlas.
#[derive(Debug)]
pub struct FontVariant {
    glyphs: HashMap<char, Glyph>,
    kerning: HashMap<(char, char), f32>,
    /// Baseline-to-baseline distance in em units.
    pub line_height: f32,
    /// Baseline to top of the tallest glyph, em units (positive).
    pub ascender: f32,
    /// Baseline to bottom of the deepest glyph, em units (negative).
    pub descender: f32,
}

impl FontVariant {
    /// Build a variant from loose parts. The loaders use this; tests
    /// and runtime atlas bakers can too.
    pub fn new(
        glyphs: impl IntoIterator<Item = Glyph>,
        kerning: impl IntoIterator<Item = ((char, char), f32)>,
        line_height: f32,
        ascender: f32,
        descender: f32,
    ) -> Self {
        Self {
            glyphs: glyphs.into_iter().map(|g| (g.codepoint, g)).collect(),
            kerning: kerning.into_iter().collect(),
            line_height,
            ascender,
            descender,
        }
    }

    fn from_doc(doc: VariantDoc) -> Self {
        let mut glyphs = HashMap::with_capacity(doc.glyphs.len());
        for glyph_doc in doc.glyphs {
            let Some(codepoint) = char::from_u32(glyph_doc.unicode) else {
                log::warn!(
                    "FontVariant: skipping invalid codepoint U+{:X}",
                    glyph_doc.unicode
                );
                continue;
            };
            glyphs.insert(
                codepoint,
                Glyph {
                    codepoint,
                    advance: glyph_doc.advance,
                    plane_bounds: glyph_doc
                        .plane_bounds
                        .map(GlyphBounds::from)
                        .unwrap_or_default(),
                    atlas_bounds: glyph_doc
                        .atlas_bounds
                        .map(GlyphBounds::from)
                        .unwrap_or_default(),
                },
            );
        }

        let mut kerning = HashMap::with_capacity(doc.kerning.len());
        for pair in doc.kerning {
            let (Some(first), Some(second)) =
                (char::from_u32(pair.unicode1), char::from_u32(pair.unicode2))
            else {
                log::warn!(
                    "FontVariant: skipping kerning pair with invalid codepoint ({}, {})",
                    pair.unicode1,
                    pair.unicode2
                );
                continue;
            };
            kerning.insert((first, second), pair.advance);
        }

        Self {
            glyphs,
            kerning,
            line_height: doc.metrics.line_height,
            ascender: doc.metrics.ascender,
            descender: doc.metrics.descender,
        }
    }

    /// O(1) glyph lookup. `None` for unmapped codepoints — callers
    /// skip them silently, no fallback symbol is substituted.
    pub fn glyph(&self, codepoint: char) -> Option<&Glyph> {
        self.glyphs.get(&codepoint)
    }

    /// O(1) kerning lookup for the ordered pair `(first, second)`.
    /// `None` means zero adjustment.
    pub fn kerning(&self, first: char, second: char) -> Option<f32> {
        self.kerning.get(&(first, second)).copied()
    }

    /// Number of mapped codepoints.
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Advance + kerning sum of a single line, in em units (unscaled).
    ///
    /// Unmapped codepoints contribute nothing — no advance, and no
    /// kerning link: the previous *resolved* codepoint stays live.
    pub fn line_advance(&self, line: &str) -> f32 {
        let mut width = 0.0f32;
        let mut prev: Option<char> = None;
        for ch in line.chars() {
            let Some(glyph) = self.glyph(ch) else {
                continue;
            };
            if let Some(prev) = prev {
                width += self.kerning(prev, ch).unwrap_or(0.0);
            }
            width += glyph.advance;
            prev = Some(ch);
        }
        width
    }

    /// Bounding box of a (possibly multi-line) string at `size`.
    ///
    /// Width is the widest line's advance sum × size; height is
    /// `line count × line_height × size`. Pure — no side effects, same
    /// inputs give the same result.
    pub fn measure(&self, text: &str, size: f32) -> (f32, f32) {
        let mut width = 0.0f32;
        let mut lines = 0u32;
        for line in text.split('\n') {
            lines += 1;
            width = width.max(self.line_advance(line) * size);
        }
        (width, lines as f32 * self.line_height * size)
    }
}

// ── Text font handle ────────────────────────────────────────────────

/// A resolved (atlas, variant) binding — everything a text batch needs
/// to lay out and render glyphs from one variant, without holding the
/// atlas itself.
///
/// Obtained from [`FontAtlas::font`] once at startup and cloned freely
/// (clones share the variant tables via `Arc`).
#[derive(Clone, Debug)]
pub struct TextFont {
    pub variant: Arc<FontVariant>,
    pub atlas_id: Uuid,
    pub variant_index: usize,
    /// Atlas dimensions in pixels, as floats for UV math.
    pub atlas_width: f32,
    pub atlas_height: f32,
    /// Nominal em size the glyphs were baked at, in atlas pixels.
    pub em_size: f32,
    /// Distance-field range in atlas pixels.
    pub distance_range: f32,
}

impl TextFont {
    /// Assemble a handle from loose parts. [`FontAtlas::font`] is the
    /// usual path; this exists for tests and runtime-baked variants.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        variant: Arc<FontVariant>,
        atlas_id: Uuid,
        variant_index: usize,
        atlas_width: f32,
        atlas_height: f32,
        em_size: f32,
        distance_range: f32,
    ) -> Self {
        Self {
            variant,
            atlas_id,
            variant_index,
            atlas_width,
            atlas_height,
            em_size,
            distance_range,
        }
    }
}

// ── Font atlas ──────────────────────────────────────────────────────

/// Parsed glyph tables for every variant plus the atlas texture.
///
/// Created by [`FontAtlas::load`] / [`FontAtlas::from_memory`] and
/// immutable afterwards. The texture is owned exclusively and released
/// exactly once on drop; at shutdown, drop only after the device has
/// gone idle (all GPU work referencing the texture has completed).
pub struct FontAtlas {
    id: Uuid,
    variants: Vec<Arc<FontVariant>>,
    distance_range: f32,
    em_size: f32,
    width: u32,
    height: u32,
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl FontAtlas {
    /// Load an atlas from a structured description file and its raster
    /// image, creating and filling the GPU texture.
    pub fn load(
        description_path: impl AsRef<Path>,
        image_path: impl AsRef<Path>,
        device: &Device,
        queue: &Queue,
    ) -> Result<Self, LoadError> {
        let description = read_input(description_path.as_ref())?;
        let image = read_input(image_path.as_ref())?;
        Self::from_memory(&description, &image, device, queue)
    }

    /// Load an atlas from in-memory description and image bytes.
    pub fn from_memory(
        description: &[u8],
        image: &[u8],
        device: &Device,
        queue: &Queue,
    ) -> Result<Self, LoadError> {
        let (info, variants) = parse_description(description)?;

        // Reject sizes the device cannot allocate before decoding.
        let max_dim = device.limits().max_texture_dimension_2d;
        if info.width == 0 || info.height == 0 || info.width > max_dim || info.height > max_dim {
            return Err(LoadError::Device(format!(
                "atlas dimensions {}x{} outside device limit (max {})",
                info.width, info.height, max_dim
            )));
        }

        let pixels = decode_image(image, info.width, info.height)?;

        let texture = device.create_texture(&TextureDescriptor {
            label: Some("quill_font_atlas"),
            size: Extent3d {
                width: info.width,
                height: info.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            // Distance fields are data, not color: no sRGB.
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(info.width * 4), // RGBA = 4 bytes per pixel
                rows_per_image: Some(info.height),
            },
            Extent3d {
                width: info.width,
                height: info.height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let glyph_total: usize = variants.iter().map(|v| v.glyph_count()).sum();
        log::info!(
            "FontAtlas: loaded {} variant(s), {} glyphs ({}x{} px, em {} px)",
            variants.len(),
            glyph_total,
            info.width,
            info.height,
            info.size,
        );

        Ok(Self {
            id: Uuid::new_v4(),
            variants,
            distance_range: info.distance_range,
            em_size: info.size,
            width: info.width,
            height: info.height,
            texture,
            view,
        })
    }

    /// Process-unique id, used to key per-atlas GPU bindings.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    pub fn variant(&self, index: usize) -> Option<&Arc<FontVariant>> {
        self.variants.get(index)
    }

    /// O(1) glyph lookup; `None` for unmapped codepoints or an
    /// out-of-range variant.
    pub fn glyph(&self, variant_index: usize, codepoint: char) -> Option<&Glyph> {
        self.variants.get(variant_index)?.glyph(codepoint)
    }

    /// O(1) kerning lookup; `None` is a zero adjustment.
    pub fn kerning(&self, variant_index: usize, first: char, second: char) -> Option<f32> {
        self.variants.get(variant_index)?.kerning(first, second)
    }

    /// Bounding box of `text` at `size` for one variant. Returns
    /// `(0.0, 0.0)` for an out-of-range variant.
    pub fn measure(&self, variant_index: usize, text: &str, size: f32) -> (f32, f32) {
        debug_assert!(
            variant_index < self.variants.len(),
            "font variant index out of range"
        );
        self.variants
            .get(variant_index)
            .map(|variant| variant.measure(text, size))
            .unwrap_or((0.0, 0.0))
    }

    /// Resolve a variant into a [`TextFont`] handle for batching.
    pub fn font(&self, variant_index: usize) -> Option<TextFont> {
        let variant = self.variants.get(variant_index)?;
        Some(TextFont {
            variant: Arc::clone(variant),
            atlas_id: self.id,
            variant_index,
            atlas_width: self.width as f32,
            atlas_height: self.height as f32,
            em_size: self.em_size,
            distance_range: self.distance_range,
        })
    }

    pub fn distance_range(&self) -> f32 {
        self.distance_range
    }

    /// Nominal em size in atlas pixels.
    pub fn em_size(&self) -> f32 {
        self.em_size
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// View of the atlas texture, for building texture bind groups.
    pub fn texture_view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

// ── Load helpers ────────────────────────────────────────────────────

fn read_input(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::NotFound {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_description(bytes: &[u8]) -> Result<(AtlasInfoDoc, Vec<Arc<FontVariant>>), LoadError> {
    let doc: AtlasDoc = serde_json::from_slice(bytes)?;
    let variants = doc
        .variants
        .into_iter()
        .map(|variant_doc| Arc::new(FontVariant::from_doc(variant_doc)))
        .collect();
    Ok((doc.atlas, variants))
}

/// Decode to tightly packed RGBA8, enforcing the declared dimensions.
fn decode_image(bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>, LoadError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| LoadError::Decode(e.to_string()))?
        .to_rgba8();
    if decoded.width() != width || decoded.height() != height {
        return Err(LoadError::Decode(format!(
            "image is {}x{} but description declares {}x{}",
            decoded.width(),
            decoded.height(),
            width,
            height
        )));
    }
    Ok(decoded.into_raw())
}

/// Acquire a headless device for GPU-dependent tests. `None` when the
/// environment has no usable adapter — callers skip gracefully.
#[cfg(test)]
pub(crate) fn request_test_device() -> Option<(Device, Queue)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await?;
        adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .ok()
    })
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Two-variant description used across the tests: 'A' (advance
    /// 0.6), 'B' (advance 0.5), space (advance 0.25, no bounds), with
    /// kerning (A, B) = -0.05 on the first variant.
    const TEST_DESCRIPTION: &str = r#"{
        "atlas": { "distanceRange": 2.0, "size": 32.0, "width": 8, "height": 8 },
        "variants": [
            {
                "metrics": { "lineHeight": 1.2, "ascender": 0.9, "descender": -0.25 },
                "glyphs": [
                    {
                        "unicode": 65,
                        "advance": 0.6,
                        "planeBounds": { "left": 0.02, "bottom": -0.01, "right": 0.58, "top": 0.71 },
                        "atlasBounds": { "left": 0.5, "bottom": 0.5, "right": 3.5, "top": 6.5 }
                    },
                    {
                        "unicode": 66,
                        "advance": 0.5,
                        "planeBounds": { "left": 0.03, "bottom": 0.0, "right": 0.5, "top": 0.7 },
                        "atlasBounds": { "left": 4.0, "bottom": 0.5, "right": 7.0, "top": 6.5 }
                    },
                    { "unicode": 32, "advance": 0.25 }
                ],
                "kerning": [
                    { "unicode1": 65, "unicode2": 66, "advance": -0.05 }
                ]
            },
            {
                "metrics": { "lineHeight": 1.0, "ascender": 0.8, "descender": -0.2 },
                "glyphs": [ { "unicode": 65, "advance": 0.7 } ]
            }
        ]
    }"#;

    fn test_variants() -> Vec<Arc<FontVariant>> {
        let (_, variants) = parse_description(TEST_DESCRIPTION.as_bytes()).unwrap();
        variants
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::new(width, height);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_glyph_lookup_matches_description() {
        let variants = test_variants();
        let glyph = variants[0].glyph('A').unwrap();
        assert_eq!(glyph.codepoint, 'A');
        assert_eq!(glyph.advance, 0.6);
        assert_eq!(glyph.plane_bounds.left, 0.02);
        assert_eq!(glyph.plane_bounds.top, 0.71);
        assert_eq!(glyph.atlas_bounds.right, 3.5);
        assert_eq!(glyph.atlas_bounds.bottom, 0.5);

        // Second variant is independent.
        assert_eq!(variants[1].glyph('A').unwrap().advance, 0.7);
        assert!(variants[1].glyph('B').is_none());
    }

    #[test]
    fn test_unmapped_codepoint_returns_none() {
        let variants = test_variants();
        assert!(variants[0].glyph('Z').is_none());
        assert!(variants[0].glyph('\n').is_none());
    }

    #[test]
    fn test_boundless_glyph_has_zeroed_bounds() {
        let variants = test_variants();
        let space = variants[0].glyph(' ').unwrap();
        assert_eq!(space.advance, 0.25);
        assert_eq!(space.plane_bounds, GlyphBounds::default());
        assert_eq!(space.atlas_bounds, GlyphBounds::default());
    }

    #[test]
    fn test_kerning_lookup_and_miss() {
        let variants = test_variants();
        assert_eq!(variants[0].kerning('A', 'B'), Some(-0.05));
        // Kerning is keyed by the ordered pair.
        assert_eq!(variants[0].kerning('B', 'A'), None);
        assert_eq!(variants[1].kerning('A', 'B'), None);
    }

    #[test]
    fn test_measure_kerned_pair() {
        let variants = test_variants();
        let (width, height) = variants[0].measure("AB", 100.0);
        // 0.6 + (-0.05) + 0.5 = 1.05 em → 105 units at size 100.
        assert!((width - 105.0).abs() < 1e-3, "width = {width}");
        assert!((height - 120.0).abs() < 1e-3, "height = {height}");
    }

    #[test]
    fn test_measure_is_pure() {
        let variants = test_variants();
        let first = variants[0].measure("A B\nBA", 17.0);
        let second = variants[0].measure("A B\nBA", 17.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_measure_multiline_takes_max_width() {
        let variants = test_variants();
        let (width, height) = variants[0].measure("AB\nA", 100.0);
        assert!((width - 105.0).abs() < 1e-3, "width = {width}");
        // Two lines × 1.2 line height × 100.
        assert!((height - 240.0).abs() < 1e-3, "height = {height}");

        // Whole-string measure equals the per-line split.
        let (first, _) = variants[0].measure("AB", 100.0);
        let (second, _) = variants[0].measure("A", 100.0);
        assert!((width - first.max(second)).abs() < 1e-6);
    }

    #[test]
    fn test_measure_skips_unresolved_codepoints() {
        let variants = test_variants();
        // '?' is unmapped: it adds nothing and does not break the
        // (A, B) kerning link.
        let (with_hole, _) = variants[0].measure("A?B", 100.0);
        let (without, _) = variants[0].measure("AB", 100.0);
        assert_eq!(with_hole, without);
    }

    #[test]
    fn test_measure_empty_text() {
        let variants = test_variants();
        let (width, height) = variants[0].measure("", 100.0);
        assert_eq!(width, 0.0);
        // An empty string is still one (empty) line.
        assert!((height - 120.0).abs() < 1e-3);
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let result = parse_description(br#"{ "variants": [] }"#);
        assert!(matches!(result, Err(LoadError::Parse(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode_image(b"definitely not a png", 8, 8);
        assert!(matches!(result, Err(LoadError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_dimension_mismatch() {
        let bytes = png_bytes(4, 4);
        let result = decode_image(&bytes, 8, 8);
        match result {
            Err(LoadError::Decode(message)) => {
                assert!(message.contains("4x4"), "message = {message}");
            }
            other => panic!("expected Decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_memory() {
        // Needs a GPU adapter — skip gracefully in CI without one.
        let Some((device, queue)) = request_test_device() else {
            return;
        };

        let atlas = FontAtlas::from_memory(
            TEST_DESCRIPTION.as_bytes(),
            &png_bytes(8, 8),
            &device,
            &queue,
        )
        .unwrap();

        assert_eq!(atlas.variant_count(), 2);
        assert_eq!(atlas.width(), 8);
        assert_eq!(atlas.height(), 8);
        assert_eq!(atlas.em_size(), 32.0);
        assert_eq!(atlas.distance_range(), 2.0);
        assert_eq!(atlas.glyph(0, 'A').unwrap().advance, 0.6);
        assert_eq!(atlas.kerning(0, 'A', 'B'), Some(-0.05));
        assert!(atlas.font(0).is_some());
        assert!(atlas.font(2).is_none());

        let font = atlas.font(1).unwrap();
        assert_eq!(font.atlas_id, atlas.id());
        assert_eq!(font.variant_index, 1);
        assert_eq!(font.atlas_width, 8.0);
        assert_eq!(font.em_size, 32.0);
    }

    #[test]
    fn test_load_rejects_oversized_atlas() {
        let Some((device, queue)) = request_test_device() else {
            return;
        };

        let description = r#"{
            "atlas": { "distanceRange": 2.0, "size": 32.0, "width": 1048576, "height": 8 },
            "variants": []
        }"#;
        // Dimension check runs before image decode, so garbage bytes
        // never get that far.
        let result = FontAtlas::from_memory(description.as_bytes(), b"unused", &device, &queue);
        assert!(matches!(result, Err(LoadError::Device(_))));
    }

    #[test]
    fn test_image_size_mismatch_fails_load() {
        let Some((device, queue)) = request_test_device() else {
            return;
        };

        let result = FontAtlas::from_memory(
            TEST_DESCRIPTION.as_bytes(),
            &png_bytes(4, 4),
            &device,
            &queue,
        );
        assert!(matches!(result, Err(LoadError::Decode(_))));
    }
}
