//! GPU-POD data types shared between the text batch, the renderer, and
//! the WGSL shader.
//!
//! All types derive `bytemuck::Pod` + `Zeroable` for zero-copy upload
//! to GPU buffers. There is no vertex buffer anywhere in this crate:
//! glyph quads are expanded in the vertex shader from
//! `@builtin(vertex_index)`, pulling per-glyph data out of a storage
//! buffer of `GlyphInstance` and per-command parameters out of a
//! dynamically-offset uniform buffer of `DrawUniforms`. The struct
//! layouts below are therefore load-bearing — the size tests at the
//! bottom pin them to the strides the shader declares.

use bytemuck::{Pod, Zeroable};

/// Byte stride between per-command uniform blocks in the shared uniform
/// buffer.
///
/// `DrawUniforms` is 80 bytes, but dynamic uniform offsets must be
/// multiples of `min_uniform_buffer_offset_alignment`, which the WebGPU
/// limits guarantee to be at most 256. One 256-byte slot per draw
/// command keeps the offset arithmetic trivial.
pub const DRAW_UNIFORM_STRIDE: u64 = 256;

// ───────────────────────────────────────────────────────────────────
// Glyph instance
// ───────────────────────────────────────────────────────────────────

/// Per-glyph data for a single MSDF quad, pulled from a storage buffer.
///
/// 96 bytes per instance — a full 65,536-instance arena is 6 MB of GPU
/// memory, allocated once at renderer startup.
///
/// `position` is the glyph origin on the baseline in the coordinate
/// space of the owning draw command's transform (Y down). The shader
/// offsets it by `plane_bounds × em_size` (Y negated, since plane
/// bounds are in the font's Y-up em space) to get the four corners.
/// `atlas_bounds` is already normalized to texture UV space with V
/// flipped, so the shader interpolates it directly.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GlyphInstance {
    /// Baseline origin of the glyph, in draw-command space.
    pub position: [f32; 3],
    /// Font size in screen pixels (scales plane bounds and the MSDF
    /// anti-aliasing range).
    pub em_size: f32,
    /// RGBA fill color, each channel in [0.0, 1.0].
    pub color: [f32; 4],
    /// RGBA outline color; only sampled when `outline_width > 0`.
    pub outline_color: [f32; 4],
    /// Glyph quad [left, bottom, right, top] in em units, Y up.
    pub plane_bounds: [f32; 4],
    /// Atlas UV rectangle [u0, v0, u1, v1], V already flipped so that
    /// v0 pairs with `plane_bounds` bottom.
    pub atlas_bounds: [f32; 4],
    /// Outline band width in screen pixels; 0 disables the outline.
    pub outline_width: f32,
    /// Padding to a 16-byte-aligned stride (matches WGSL struct size).
    pub _pad: [f32; 3],
}

impl GlyphInstance {
    pub fn new(position: [f32; 3], em_size: f32, plane_bounds: [f32; 4], atlas_bounds: [f32; 4]) -> Self {
        Self {
            position,
            em_size,
            color: [1.0, 1.0, 1.0, 1.0],
            outline_color: [0.0, 0.0, 0.0, 0.0],
            plane_bounds,
            atlas_bounds,
            outline_width: 0.0,
            _pad: [0.0; 3],
        }
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_outline(mut self, color: [f32; 4], width: f32) -> Self {
        self.outline_color = color;
        self.outline_width = width;
        self
    }
}

// ───────────────────────────────────────────────────────────────────
// Per-command uniforms
// ───────────────────────────────────────────────────────────────────

/// Per-draw-command parameters, one 256-byte-aligned slot per command.
///
/// 80 bytes — the renderer binds the whole uniform buffer once and
/// re-offsets into it with a dynamic offset per command.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DrawUniforms {
    /// World-to-clip transform captured at `begin` (column-major).
    pub transform: [[f32; 4]; 4],
    /// Index of the command's first instance in the storage buffer.
    pub first_instance: u32,
    /// Nominal glyph size of the atlas, in atlas pixels.
    pub atlas_em_size: f32,
    /// MSDF distance range of the atlas, in atlas pixels.
    pub distance_range: f32,
    /// Padding to a 16-byte-aligned size.
    pub _pad: f32,
}

impl DrawUniforms {
    pub fn new(transform: [[f32; 4]; 4], first_instance: u32, atlas_em_size: f32, distance_range: f32) -> Self {
        Self {
            transform,
            first_instance,
            atlas_em_size,
            distance_range,
            _pad: 0.0,
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
