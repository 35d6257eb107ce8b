//! Frame-local accumulation of glyph instances into bounded draw
//! commands.
//!
//! ```text
//!   begin ──► draw / draw_multiline ──► … ──► end     (per segment)
//!     │              │
//!     │              └─ appends one GlyphInstance per resolved
//!     │                 codepoint; when the active command's
//!     │                 8192-instance slot fills, a continuation
//!     │                 command with the same transform/font opens
//!     │                 transparently
//!     └─ captures transform + font; the new command's instances live
//!        at slot `command_index × 8192` in the fixed arena
//!
//!   … then once per frame: TextRenderer::prepare → render (resets).
//! ```
//!
//! Capacities are deliberately fixed: at most [`MAX_DRAW_CMDS`]
//! commands of [`MAX_INSTANCES_PER_DRAW_CMD`] instances each, backed by
//! one [`MAX_INSTANCES`]-slot arena allocated once at startup. Text
//! rendering is a bounded per-frame workload — hitting a limit means
//! the frame is drawing more text than the renderer was sized for, and
//! the limit should be raised consciously rather than grown silently.
//! Slots are reserved per command index and never compacted, so a
//! partially filled command wastes arena space but keeps every
//! command's range disjoint and its offset a constant.
//!
//! Misuse (begin with a segment open, draw or end without one, more
//! than [`MAX_DRAW_CMDS`] commands) trips a `debug_assert!`. Release
//! builds skip the check and degrade to safe no-ops instead.

use bytemuck::Zeroable;
use quill_atlas::TextFont;

use crate::instance::GlyphInstance;
use crate::layout::{
    block_top_offset, glyph_uv, h_align_offset, v_align_offset, GlyphWalk, TextHAlign, TextVAlign,
};
use crate::transform::Mat4;

/// Maximum number of draw commands (`begin` segments plus overflow
/// continuations) per frame.
pub const MAX_DRAW_CMDS: usize = 8;

/// Instance capacity of a single draw command's arena slot.
pub const MAX_INSTANCES_PER_DRAW_CMD: usize = 8192;

/// Total instance arena capacity.
pub const MAX_INSTANCES: usize = MAX_DRAW_CMDS * MAX_INSTANCES_PER_DRAW_CMD;

// ───────────────────────────────────────────────────────────────────
// Style
// ───────────────────────────────────────────────────────────────────

/// Fill and outline styling applied to every glyph of a draw call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    /// RGBA fill color.
    pub color: [f32; 4],
    /// RGBA outline color; ignored while `outline_width` is 0.
    pub outline_color: [f32; 4],
    /// Outline band width in screen pixels, extending outward from the
    /// glyph edge. 0 disables the outline.
    pub outline_width: f32,
}

impl TextStyle {
    pub fn new(color: [f32; 4]) -> Self {
        Self {
            color,
            outline_color: [0.0, 0.0, 0.0, 0.0],
            outline_width: 0.0,
        }
    }

    pub fn with_outline(mut self, color: [f32; 4], width: f32) -> Self {
        self.outline_color = color;
        self.outline_width = width;
        self
    }
}

impl Default for TextStyle {
    /// Opaque white fill, no outline.
    fn default() -> Self {
        TextStyle::new([1.0, 1.0, 1.0, 1.0])
    }
}

// ───────────────────────────────────────────────────────────────────
// Draw command
// ───────────────────────────────────────────────────────────────────

/// One GPU draw's worth of glyphs: a contiguous instance range sharing
/// a transform and an (atlas, variant) binding.
#[derive(Clone, Debug)]
pub struct DrawCmd {
    /// World-to-clip transform captured at `begin`.
    pub transform: Mat4,
    /// Resolved font handle; `font.atlas_id` keys the renderer's
    /// texture bind group, the rest feeds layout and the per-command
    /// uniforms.
    pub font: TextFont,
    /// First arena slot of this command (`command_index × 8192`).
    pub first_instance: u32,
    /// Instances appended so far, ≤ [`MAX_INSTANCES_PER_DRAW_CMD`].
    pub instance_count: u32,
}

// ───────────────────────────────────────────────────────────────────
// Batch
// ───────────────────────────────────────────────────────────────────

/// CPU half of the text renderer: accumulates glyph instances and draw
/// commands for one frame.
///
/// Owns no GPU resources — [`crate::TextRenderer`] uploads the arena's
/// active range in `prepare` and replays the command list in `render`,
/// which also calls [`TextBatch::reset`] for the next frame.
pub struct TextBatch {
    commands: Vec<DrawCmd>,
    instances: Box<[GlyphInstance]>,
    segment_open: bool,
}

impl TextBatch {
    /// Allocate the instance arena ([`MAX_INSTANCES`] slots) once.
    pub fn new() -> Self {
        log::debug!(
            "TextBatch: arena of {} instances across {} command slots",
            MAX_INSTANCES,
            MAX_DRAW_CMDS
        );
        Self {
            commands: Vec::with_capacity(MAX_DRAW_CMDS),
            instances: vec![GlyphInstance::zeroed(); MAX_INSTANCES].into_boxed_slice(),
            segment_open: false,
        }
    }

    /// Open a segment: all draws until [`end`](Self::end) share
    /// `world_to_clip` and `font`.
    ///
    /// Contract: no segment may already be open, and command capacity
    /// must remain.
    pub fn begin(&mut self, world_to_clip: Mat4, font: &TextFont) {
        debug_assert!(!self.segment_open, "TextBatch: segment already open");
        debug_assert!(
            self.commands.len() < MAX_DRAW_CMDS,
            "TextBatch: draw command capacity ({MAX_DRAW_CMDS}) exhausted"
        );
        if self.segment_open || self.commands.len() >= MAX_DRAW_CMDS {
            return;
        }
        self.push_command(world_to_clip, font.clone());
        self.segment_open = true;
    }

    /// Close the open segment. Subsequent draws need a fresh `begin`.
    pub fn end(&mut self) {
        debug_assert!(self.segment_open, "TextBatch: no segment open");
        self.segment_open = false;
    }

    /// Lay out `text` as a single line and append one instance per
    /// resolved codepoint.
    ///
    /// `position` is the alignment anchor (Y down, `position[1]` on the
    /// baseline when `v_align` is `Baseline`); `size` is the em size in
    /// pixels. Codepoints without a glyph — including `'\n'` — are
    /// skipped; use [`draw_multiline`](Self::draw_multiline) for line
    /// breaks.
    pub fn draw(
        &mut self,
        text: &str,
        position: [f32; 3],
        size: f32,
        h_align: TextHAlign,
        v_align: TextVAlign,
        style: &TextStyle,
    ) {
        debug_assert!(self.segment_open, "TextBatch: no segment open");
        if !self.segment_open {
            return;
        }
        let font = self.active_font();
        let line_width = font.variant.line_advance(text) * size;
        let origin_x = position[0] + h_align_offset(h_align, line_width);
        let baseline_y = position[1] + v_align_offset(v_align, &font.variant, size);
        self.append_line(&font, text, origin_x, baseline_y, position[2], size, style);
    }

    /// Lay out `text` split on `'\n'`, lines stacked downward by the
    /// variant's line height, each line independently `h_align`ed.
    ///
    /// `block_size` is the measured bounding box of the whole text (see
    /// [`quill_atlas::FontVariant::measure`]); `v_align` anchors that
    /// block at `position`, with `Baseline` anchoring the first line's
    /// baseline.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_multiline(
        &mut self,
        text: &str,
        position: [f32; 3],
        size: f32,
        h_align: TextHAlign,
        v_align: TextVAlign,
        style: &TextStyle,
        block_size: (f32, f32),
    ) {
        debug_assert!(self.segment_open, "TextBatch: no segment open");
        if !self.segment_open {
            return;
        }
        let font = self.active_font();
        let block_top = position[1] + block_top_offset(v_align, &font.variant, size, block_size.1);
        let first_baseline = block_top + font.variant.ascender * size;
        let line_stride = font.variant.line_height * size;

        for (index, line) in text.split('\n').enumerate() {
            let line_width = font.variant.line_advance(line) * size;
            let origin_x = position[0] + h_align_offset(h_align, line_width);
            let baseline_y = first_baseline + index as f32 * line_stride;
            self.append_line(&font, line, origin_x, baseline_y, position[2], size, style);
        }
    }

    /// Clear frame-local state (command list and instance counts).
    ///
    /// [`crate::TextRenderer::render`] calls this after replaying the
    /// commands; call it directly for frames that accumulate but never
    /// render. Arena contents are left stale — the counts define what
    /// is live.
    pub fn reset(&mut self) {
        self.commands.clear();
        self.segment_open = false;
    }

    // ── Introspection ───────────────────────────────────────────────

    /// Accumulated draw commands, in submission order.
    pub fn commands(&self) -> &[DrawCmd] {
        &self.commands
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Total instances across all commands.
    pub fn glyph_count(&self) -> usize {
        self.commands.iter().map(|c| c.instance_count as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn is_segment_open(&self) -> bool {
        self.segment_open
    }

    /// Arena prefix covering every live instance this frame — the
    /// range `prepare` uploads. Padding slots of partially filled
    /// commands are included (stale but never read by the GPU).
    pub fn active_instances(&self) -> &[GlyphInstance] {
        match self.commands.last() {
            Some(last) => {
                let end = last.first_instance as usize + last.instance_count as usize;
                &self.instances[..end]
            }
            None => &[],
        }
    }

    /// The live instances of one command.
    pub fn instances_for(&self, cmd: &DrawCmd) -> &[GlyphInstance] {
        &self.instances[cmd.first_instance as usize..][..cmd.instance_count as usize]
    }

    // ── Internals ───────────────────────────────────────────────────

    fn active_font(&self) -> TextFont {
        // Only called with a segment open, so a command exists.
        self.commands[self.commands.len() - 1].font.clone()
    }

    fn push_command(&mut self, transform: Mat4, font: TextFont) {
        let first_instance = (self.commands.len() * MAX_INSTANCES_PER_DRAW_CMD) as u32;
        self.commands.push(DrawCmd {
            transform,
            font,
            first_instance,
            instance_count: 0,
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn append_line(
        &mut self,
        font: &TextFont,
        line: &str,
        origin_x: f32,
        baseline_y: f32,
        z: f32,
        size: f32,
        style: &TextStyle,
    ) {
        for placed in GlyphWalk::new(&font.variant, line, size) {
            let glyph = placed.glyph;
            let instance = GlyphInstance {
                position: [origin_x + placed.x, baseline_y, z],
                em_size: size,
                color: style.color,
                outline_color: style.outline_color,
                plane_bounds: [
                    glyph.plane_bounds.left,
                    glyph.plane_bounds.bottom,
                    glyph.plane_bounds.right,
                    glyph.plane_bounds.top,
                ],
                atlas_bounds: glyph_uv(&glyph.atlas_bounds, font.atlas_width, font.atlas_height),
                outline_width: style.outline_width,
                _pad: [0.0; 3],
            };
            self.append_instance(instance);
        }
    }

    fn append_instance(&mut self, instance: GlyphInstance) {
        let active = self.commands.len() - 1;
        if self.commands[active].instance_count as usize == MAX_INSTANCES_PER_DRAW_CMD {
            // Slot full: continue in a fresh command with the same
            // transform and font.
            debug_assert!(
                self.commands.len() < MAX_DRAW_CMDS,
                "TextBatch: draw command capacity ({MAX_DRAW_CMDS}) exhausted"
            );
            if self.commands.len() >= MAX_DRAW_CMDS {
                return;
            }
            let transform = self.commands[active].transform;
            let font = self.commands[active].font.clone();
            self.push_command(transform, font);
        }
        let Some(cmd) = self.commands.last_mut() else {
            return;
        };
        let slot = cmd.first_instance as usize + cmd.instance_count as usize;
        self.instances[slot] = instance;
        cmd.instance_count += 1;
    }
}

impl Default for TextBatch {
    fn default() -> Self {
        TextBatch::new()
    }
}

// ===================================================================
// Tests
// ===================================================================
