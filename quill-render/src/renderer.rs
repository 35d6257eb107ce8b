//! GPU half of text rendering: pipeline, buffers, per-atlas bindings,
//! and the per-frame prepare/render pair.
//!
//! The pipeline has no vertex or index buffer. The vertex stage derives
//! `(instance, corner)` from `@builtin(vertex_index)` and pulls glyph
//! data from a storage buffer holding the batch's instance arena; each
//! draw command supplies its transform and first-instance offset
//! through one 256-byte slot of a dynamically-offset uniform buffer.
//! Per frame that costs one storage-buffer upload, one uniform write
//! per command, and one `draw(count × 6)` per command.
//!
//! Atlas textures are bound through a small cache keyed by atlas id —
//! call [`TextRenderer::register_atlas`] once per loaded atlas before
//! drawing with its fonts.

use std::collections::HashMap;

use uuid::Uuid;
use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, BlendState,
    Buffer, BufferBinding, BufferBindingType, BufferDescriptor, BufferUsages, Color,
    ColorTargetState, ColorWrites, CommandEncoderDescriptor, Device, FilterMode, FragmentState,
    FrontFace, LoadOp, MultisampleState, Operations, PipelineCompilationOptions,
    PipelineLayoutDescriptor, PolygonMode, PrimitiveState, PrimitiveTopology, RenderPass,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    Sampler, SamplerBindingType, SamplerDescriptor, ShaderModuleDescriptor, ShaderStages, StoreOp,
    TextureSampleType, TextureViewDimension, VertexState,
};

use quill_atlas::FontAtlas;

use crate::batch::{TextBatch, MAX_DRAW_CMDS, MAX_INSTANCES};
use crate::context::GpuContext;
use crate::instance::{DrawUniforms, GlyphInstance, DRAW_UNIFORM_STRIDE};

/// Frame statistics returned after each render.
#[derive(Clone, Copy, Debug)]
pub struct FrameStats {
    /// Number of glyph instances drawn.
    pub glyph_count: u32,
    /// Number of draw calls issued.
    pub draw_calls: u32,
}

/// A draw command resolved by `prepare` into GPU-bindable form.
struct PreparedDraw {
    uniform_offset: u32,
    atlas_id: Uuid,
    vertex_count: u32,
}

/// Owns every GPU resource of the text path and replays a
/// [`TextBatch`] as render-pass commands.
///
/// Pipeline and buffers are released exactly once on drop; at
/// shutdown, drop only after the device has gone idle
/// ([`GpuContext::wait_idle`]).
///
/// # Usage
///
/// ```ignore
/// let mut renderer = TextRenderer::new(&gpu);
/// renderer.register_atlas(&gpu.device, &atlas);
/// // each frame:
/// batch.begin(transform, &font);
/// batch.draw("hello", [x, y, 0.0], 32.0, h, v, &style);
/// batch.end();
/// renderer.prepare(&gpu, &batch);
/// let stats = renderer.render_to_texture(&gpu, &view, &mut batch);
/// ```
pub struct TextRenderer {
    pipeline: RenderPipeline,

    // Group 0: per-command uniforms (dynamic offset) + instance arena.
    uniform_buffer: Buffer,
    instance_buffer: Buffer,
    frame_bind_group: BindGroup,

    // Group 1: one bind group per registered atlas.
    atlas_bgl: BindGroupLayout,
    sampler: Sampler,
    atlas_bind_groups: HashMap<Uuid, BindGroup>,

    prepared: Vec<PreparedDraw>,
    clear_color: Color,
}

impl TextRenderer {
    /// Create the pipeline and allocate the shared GPU buffers.
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        // ── Shader ──────────────────────────────────────────────
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("text_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/text.wgsl").into()),
        });

        // ── Frame bind group layout (group 0) ───────────────────
        let frame_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("text_frame_bgl"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::VERTEX,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: None,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::VERTEX,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        // ── Atlas bind group layout (group 1) ───────────────────
        let atlas_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("text_atlas_bgl"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // ── Pipeline layout ─────────────────────────────────────
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("text_pipeline_layout"),
            bind_group_layouts: &[&frame_bgl, &atlas_bgl],
            push_constant_ranges: &[],
        });

        // ── Render pipeline ─────────────────────────────────────
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("text_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: gpu.surface_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // ── Per-command uniform buffer ──────────────────────────
        let uniform_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("text_draw_ub"),
            size: MAX_DRAW_CMDS as u64 * DRAW_UNIFORM_STRIDE,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // ── Instance arena storage buffer ───────────────────────
        let instance_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("text_instances"),
            size: (MAX_INSTANCES * std::mem::size_of::<GlyphInstance>()) as u64,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("text_frame_bg"),
            layout: &frame_bgl,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    // Only one 80-byte block is visible per draw; the
                    // dynamic offset slides the window between slots.
                    resource: BindingResource::Buffer(BufferBinding {
                        buffer: &uniform_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
                    }),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: instance_buffer.as_entire_binding(),
                },
            ],
        });

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("glyph_atlas_sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });

        log::info!(
            "TextRenderer: created ({} command slots, {} instance arena)",
            MAX_DRAW_CMDS,
            MAX_INSTANCES
        );

        Self {
            pipeline,
            uniform_buffer,
            instance_buffer,
            frame_bind_group,
            atlas_bgl,
            sampler,
            atlas_bind_groups: HashMap::new(),
            prepared: Vec::with_capacity(MAX_DRAW_CMDS),
            clear_color: Color::TRANSPARENT,
        }
    }

    /// Set the background clear color used by
    /// [`render_to_texture`](Self::render_to_texture).
    pub fn set_clear_color(&mut self, r: f64, g: f64, b: f64, a: f64) {
        self.clear_color = Color { r, g, b, a };
    }

    /// Create (or reuse) the texture bind group for `atlas`.
    ///
    /// Draw commands referencing an unregistered atlas are skipped with
    /// a warning at prepare time.
    pub fn register_atlas(&mut self, device: &Device, atlas: &FontAtlas) {
        self.atlas_bind_groups.entry(atlas.id()).or_insert_with(|| {
            log::debug!("TextRenderer: registering atlas {}", atlas.id());
            device.create_bind_group(&BindGroupDescriptor {
                label: Some("text_atlas_bg"),
                layout: &self.atlas_bgl,
                entries: &[
                    BindGroupEntry {
                        binding: 0,
                        resource: BindingResource::TextureView(atlas.texture_view()),
                    },
                    BindGroupEntry {
                        binding: 1,
                        resource: BindingResource::Sampler(&self.sampler),
                    },
                ],
            })
        });
    }

    /// Drop the bind group of an atlas that is being unloaded.
    pub fn unregister_atlas(&mut self, atlas_id: Uuid) {
        self.atlas_bind_groups.remove(&atlas_id);
    }

    /// Upload the batch's per-frame data to the GPU.
    ///
    /// Call once per frame, after all `begin`/`draw`/`end` calls and
    /// before [`render`](Self::render). No-op for an empty batch.
    pub fn prepare(&mut self, gpu: &GpuContext, batch: &TextBatch) {
        debug_assert!(
            !batch.is_segment_open(),
            "TextRenderer: prepare with a segment still open"
        );
        self.prepared.clear();
        if batch.is_empty() {
            return;
        }

        // One upload covering every command's live instances (plus the
        // stale padding of partially filled slots, which is never read).
        let active = batch.active_instances();
        if !active.is_empty() {
            gpu.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(active));
        }

        for (index, cmd) in batch.commands().iter().enumerate() {
            if cmd.instance_count == 0 {
                continue;
            }
            let offset = index as u64 * DRAW_UNIFORM_STRIDE;
            let uniforms = DrawUniforms::new(
                cmd.transform,
                cmd.first_instance,
                cmd.font.em_size,
                cmd.font.distance_range,
            );
            gpu.queue
                .write_buffer(&self.uniform_buffer, offset, bytemuck::bytes_of(&uniforms));

            if !self.atlas_bind_groups.contains_key(&cmd.font.atlas_id) {
                log::warn!(
                    "TextRenderer: atlas {} not registered, skipping command {}",
                    cmd.font.atlas_id,
                    index
                );
                continue;
            }
            self.prepared.push(PreparedDraw {
                uniform_offset: offset as u32,
                atlas_id: cmd.font.atlas_id,
                vertex_count: cmd.instance_count * 6,
            });
        }

        log::debug!(
            "TextRenderer: prepared {} draws, {} glyphs",
            self.prepared.len(),
            batch.glyph_count()
        );
    }

    /// Record the prepared draws into an open render pass, then reset
    /// the batch for the next frame.
    ///
    /// Binds the pipeline and the shared frame bind group, then per
    /// command re-offsets the uniform window and swaps the atlas bind
    /// group; each command is one `draw` of `instance_count × 6`
    /// vertices.
    pub fn render<'a>(&'a self, pass: &mut RenderPass<'a>, batch: &mut TextBatch) -> FrameStats {
        let glyph_count = batch.glyph_count() as u32;
        let mut draw_calls = 0u32;

        if !self.prepared.is_empty() {
            pass.set_pipeline(&self.pipeline);
            for draw in &self.prepared {
                let Some(atlas_bg) = self.atlas_bind_groups.get(&draw.atlas_id) else {
                    continue;
                };
                pass.set_bind_group(0, &self.frame_bind_group, &[draw.uniform_offset]);
                pass.set_bind_group(1, atlas_bg, &[]);
                pass.draw(0..draw.vertex_count, 0..1);
                draw_calls += 1;
            }
        }

        batch.reset();
        FrameStats {
            glyph_count,
            draw_calls,
        }
    }

    /// Render into an off-screen texture view through a fresh
    /// clear-load pass and submit. The headless test/bench path.
    pub fn render_to_texture(
        &self,
        gpu: &GpuContext,
        target_view: &wgpu::TextureView,
        batch: &mut TextBatch,
    ) -> FrameStats {
        let mut encoder = gpu.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("text_offscreen_encoder"),
        });

        let stats;
        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("text_offscreen_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(self.clear_color),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            stats = self.render(&mut pass, batch);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        stats
    }

    /// Number of atlases with a live texture binding.
    pub fn registered_atlas_count(&self) -> usize {
        self.atlas_bind_groups.len()
    }

    /// Number of draws the last `prepare` resolved.
    pub fn prepared_draw_count(&self) -> usize {
        self.prepared.len()
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::TextStyle;
    use crate::layout::{TextHAlign, TextVAlign};
    use crate::transform;
    use std::io::Cursor;
    use std::sync::Arc;

    const TEST_DESCRIPTION: &str = r#"{
        "atlas": { "distanceRange": 2.0, "size": 32.0, "width": 8, "height": 8 },
        "variants": [
            {
                "metrics": { "lineHeight": 1.2, "ascender": 0.8, "descender": -0.2 },
                "glyphs": [
                    {
                        "unicode": 65,
                        "advance": 0.6,
                        "planeBounds": { "left": 0.05, "bottom": -0.01, "right": 0.55, "top": 0.72 },
                        "atlasBounds": { "left": 2.0, "bottom": 1.0, "right": 6.0, "top": 7.0 }
                    },
                    { "unicode": 32, "advance": 0.25 }
                ],
                "kerning": []
            }
        ]
    }"#;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::new(width, height);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn offscreen_view(gpu: &GpuContext, size: u32) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test_target"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gpu.surface_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    #[test]
    fn test_frame_stats_fields() {
        let stats = FrameStats {
            glyph_count: 42,
            draw_calls: 2,
        };
        assert_eq!(stats.glyph_count, 42);
        assert_eq!(stats.draw_calls, 2);
    }

    #[test]
    fn test_renderer_creation_headless() {
        // Attempt headless GPU init — may fail in CI without GPU
        let gpu = pollster::block_on(GpuContext::new_headless());
        if let Ok(gpu) = gpu {
            let renderer = TextRenderer::new(&gpu);
            assert_eq!(renderer.registered_atlas_count(), 0);
            assert_eq!(renderer.prepared_draw_count(), 0);
        }
    }

    #[test]
    fn test_register_atlas_is_idempotent() {
        let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) else {
            return;
        };
        let atlas = Arc::new(
            quill_atlas::FontAtlas::from_memory(
                TEST_DESCRIPTION.as_bytes(),
                &png_bytes(8, 8),
                &gpu.device,
                &gpu.queue,
            )
            .unwrap(),
        );
        let mut renderer = TextRenderer::new(&gpu);
        renderer.register_atlas(&gpu.device, &atlas);
        renderer.register_atlas(&gpu.device, &atlas);
        assert_eq!(renderer.registered_atlas_count(), 1);

        renderer.unregister_atlas(atlas.id());
        assert_eq!(renderer.registered_atlas_count(), 0);
    }

    #[test]
    fn test_prepare_and_render_to_texture() {
        let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) else {
            return;
        };
        let atlas = Arc::new(
            quill_atlas::FontAtlas::from_memory(
                TEST_DESCRIPTION.as_bytes(),
                &png_bytes(8, 8),
                &gpu.device,
                &gpu.queue,
            )
            .unwrap(),
        );
        let mut renderer = TextRenderer::new(&gpu);
        renderer.register_atlas(&gpu.device, &atlas);

        let font = atlas.font(0).unwrap();
        let mut batch = TextBatch::new();
        batch.begin(transform::orthographic(256.0, 256.0), &font);
        batch.draw(
            "A AA",
            [20.0, 128.0, 0.0],
            32.0,
            TextHAlign::Left,
            TextVAlign::Baseline,
            &TextStyle::default(),
        );
        batch.end();

        renderer.prepare(&gpu, &batch);
        assert_eq!(renderer.prepared_draw_count(), 1);

        let view = offscreen_view(&gpu, 256);
        let stats = renderer.render_to_texture(&gpu, &view, &mut batch);
        assert_eq!(stats.glyph_count, 4);
        assert_eq!(stats.draw_calls, 1);
        // Render resets the batch for the next frame.
        assert!(batch.is_empty());
        assert!(!batch.is_segment_open());

        // An empty follow-up frame is a clean no-op.
        renderer.prepare(&gpu, &batch);
        let stats = renderer.render_to_texture(&gpu, &view, &mut batch);
        assert_eq!(stats.glyph_count, 0);
        assert_eq!(stats.draw_calls, 0);

        gpu.wait_idle();
    }

    #[test]
    fn test_unregistered_atlas_skips_draws() {
        let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) else {
            return;
        };
        let atlas = Arc::new(
            quill_atlas::FontAtlas::from_memory(
                TEST_DESCRIPTION.as_bytes(),
                &png_bytes(8, 8),
                &gpu.device,
                &gpu.queue,
            )
            .unwrap(),
        );
        let mut renderer = TextRenderer::new(&gpu);
        // Deliberately not registered.

        let font = atlas.font(0).unwrap();
        let mut batch = TextBatch::new();
        batch.begin(transform::IDENTITY, &font);
        batch.draw(
            "AA",
            [0.0, 0.0, 0.0],
            16.0,
            TextHAlign::Left,
            TextVAlign::Baseline,
            &TextStyle::default(),
        );
        batch.end();

        renderer.prepare(&gpu, &batch);
        assert_eq!(renderer.prepared_draw_count(), 0);

        let view = offscreen_view(&gpu, 64);
        let stats = renderer.render_to_texture(&gpu, &view, &mut batch);
        assert_eq!(stats.draw_calls, 0);
        gpu.wait_idle();
    }
}
