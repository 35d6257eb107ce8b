//! # quill-render
//!
//! Text layout and batched MSDF glyph rendering for Quill, built on
//! `wgpu`.
//!
//! ## Architecture
//!
//! ```text
//!  TextFont (quill-atlas)
//!       │
//!       ▼
//!  TextBatch.begin(transform, font)
//!  TextBatch.draw("…")              ◀─── layout → GlyphInstance arena,
//!       │                                ≤ 8 draw commands
//!       ▼
//!  TextRenderer.prepare(batch)      ◀─── uploads arena + per-command
//!       │                                uniforms
//!       ▼
//!  TextRenderer.render(pass, batch) ◀─── one draw per command, then
//!                                        batch reset
//! ```
//!
//! ## Crate modules
//!
//! - [`context`] — GPU device/queue/surface initialisation
//! - [`transform`] — column-major matrices and the screen projection
//! - [`instance`] — GPU-POD instance and uniform types
//! - [`layout`] — alignment, kerning-aware glyph placement, UVs
//! - [`batch`] — bounded frame-local instance/command accumulation
//! - [`renderer`] — pipeline, buffers, atlas bindings, prepare/render

pub mod batch;
pub mod context;
pub mod instance;
pub mod layout;
pub mod renderer;
pub mod transform;

// Re-exports for convenience
pub use batch::{
    DrawCmd, TextBatch, TextStyle, MAX_DRAW_CMDS, MAX_INSTANCES, MAX_INSTANCES_PER_DRAW_CMD,
};
pub use context::{GpuContext, GpuError};
pub use instance::{DrawUniforms, GlyphInstance};
pub use layout::{TextHAlign, TextVAlign};
pub use renderer::{FrameStats, TextRenderer};
pub use transform::Mat4;
