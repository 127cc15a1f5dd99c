//! wgpu backend
//!
//! Draws are recorded during `present()` and encoded in `end_frame`:
//!
//! - **Record**: every `draw` snapshots the current per-draw uniform block
//!   into a CPU staging ring and stores the pipeline, geometry, texture and
//!   dynamic offsets it needs.
//! - **Encode**: `end_frame` uploads the staging rings with one
//!   `write_buffer` each, opens one wgpu render pass per recorded pass,
//!   replays the draws and submits a single command buffer.
//!
//! Bind group layout shared by every pipeline:
//!
//! | Group | Contents                                        | Dynamic offset |
//! |-------|-------------------------------------------------|----------------|
//! | 0     | per-draw uniform block                          | yes            |
//! | 1     | skin palette (`MAX_JOINTS` matrices, storage)   | yes            |
//! | 2     | material texture + sampler                      | no             |
//! | 3     | shadow map + comparison sampler                 | no             |
//!
//! Shadow pipelines use groups 0 and 1 only, since the shadow map is their
//! render target.

use std::num::NonZeroU64;

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::animation::MAX_JOINTS;
use crate::errors::GpuError;
use crate::renderer::backend::RenderBackend;
use crate::renderer::command::{GeometryId, ShaderId, TextureId};
use crate::renderer::pass::{PassState, RenderTarget};
use crate::renderer::settings::RendererSettings;
use crate::renderer::uniforms::{UniformSlot, UniformValue};

/// Size of the per-draw uniform block. A multiple of the dynamic offset
/// alignment, so consecutive blocks need no padding.
pub const UNIFORM_BLOCK_SIZE: usize = 512;

const OFFSET_ALIGNMENT: usize = 256;
const SKIN_PALETTE_BYTES: usize = MAX_JOINTS * std::mem::size_of::<Mat4>();

// Byte offset and width inside the uniform block, mirrored by the WGSL
// struct: five mat4x4, then vec4-aligned vectors, then 4-byte scalars.
fn block_offset(slot: UniformSlot) -> Option<(usize, usize)> {
    let entry = match slot {
        UniformSlot::MODEL => (0, 64),
        UniformSlot::VIEW => (64, 64),
        UniformSlot::PROJECTION => (128, 64),
        UniformSlot::MVP => (192, 64),
        UniformSlot::LIGHT_SPACE => (256, 64),

        UniformSlot::LIGHT_DIRECTION => (320, 16),
        UniformSlot::LIGHT_COLOR => (336, 16),
        UniformSlot::EYE => (352, 16),
        UniformSlot::COLOR => (368, 16),
        UniformSlot::SIZE => (384, 16),
        UniformSlot::BORDER => (400, 16),

        UniformSlot::AMBIENT_INTENSITY => (416, 4),
        UniformSlot::DIFFUSE_INTENSITY => (420, 4),
        UniformSlot::SPECULAR_INTENSITY => (424, 4),
        UniformSlot::SPECULAR_POWER => (428, 4),
        UniformSlot::OPACITY => (432, 4),
        UniformSlot::RECEIVE_SHADOWS => (436, 4),
        UniformSlot::RECEIVE_LIGHT => (440, 4),
        UniformSlot::ENABLE_SKINNING => (444, 4),
        UniformSlot::ENABLE_TEXTURE => (448, 4),
        UniformSlot::SHADOW_MAP => (452, 4),
        UniformSlot::TEXTURE_SAMPLER => (456, 4),
        _ => return None,
    };
    Some(entry)
}

/// Copies one encoded uniform into its place in `block`.
///
/// Values whose encoded width differs from the slot's width are rejected, so
/// a mistyped binding can never spill into its neighbours.
fn write_block_entry(block: &mut [u8], slot: UniformSlot, bytes: &[u8]) -> Result<(), GpuError> {
    let (offset, width) = block_offset(slot).ok_or_else(|| GpuError::UniformUpload {
        slot: slot.0,
        reason: format!("'{}' has no place in the uniform block", slot.name()),
    })?;
    if bytes.len() != width {
        return Err(GpuError::UniformUpload {
            slot: slot.0,
            reason: format!("'{}' takes {width} bytes, got {}", slot.name(), bytes.len()),
        });
    }
    let target = block
        .get_mut(offset..offset + width)
        .ok_or_else(|| GpuError::UniformUpload {
            slot: slot.0,
            reason: format!("'{}' lies outside the uniform block", slot.name()),
        })?;
    target.copy_from_slice(bytes);
    Ok(())
}

/// Skin ring size for a frame of `queue_capacity` draws: every draw may
/// carry its own palette, plus one palette of slack so the last slot can
/// bind a full window.
fn skin_ring_bytes(queue_capacity: usize) -> usize {
    (queue_capacity.max(1) + 1) * align_to(SKIN_PALETTE_BYTES, OFFSET_ALIGNMENT)
}

fn align_to(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

/// Vertex and optional index buffers for one geometry id.
#[derive(Debug)]
pub struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    /// `(buffer, format, index count)`
    pub index_buffer: Option<(wgpu::Buffer, wgpu::IndexFormat, u32)>,
    pub vertex_count: u32,
}

#[derive(Debug, Clone, Copy)]
struct DrawOp {
    shader: ShaderId,
    geometry: GeometryId,
    texture: Option<TextureId>,
    uniform_offset: u32,
    skin_offset: u32,
}

#[derive(Debug)]
struct RecordedPass {
    state: PassState,
    draws: Vec<DrawOp>,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    // Layouts
    uniform_layout: wgpu::BindGroupLayout,
    skin_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    shadow_layout: wgpu::BindGroupLayout,
    scene_pipeline_layout: wgpu::PipelineLayout,
    shadow_pipeline_layout: wgpu::PipelineLayout,

    // Ring buffers
    uniform_ring: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_staging: Vec<u8>,
    skin_ring: wgpu::Buffer,
    skin_bind_group: wgpu::BindGroup,
    skin_staging: Vec<u8>,

    // Targets
    depth_format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,
    shadow_view: wgpu::TextureView,
    shadow_bind_group: wgpu::BindGroup,
    frame_target: Option<wgpu::TextureView>,
    size: (u32, u32),

    // Registered resources
    pipelines: FxHashMap<ShaderId, wgpu::RenderPipeline>,
    geometries: FxHashMap<GeometryId, GpuGeometry>,
    sampler: wgpu::Sampler,
    textures: Vec<wgpu::BindGroup>,
    default_texture: wgpu::BindGroup,

    // Per-draw state
    block: Vec<u8>,
    skin_offset: u32,
    shader: Option<ShaderId>,
    geometry: Option<GeometryId>,
    texture: Option<TextureId>,

    // Per-frame state
    active: Option<RecordedPass>,
    recorded: Vec<RecordedPass>,
}

impl WgpuBackend {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        settings: &RendererSettings,
        size: (u32, u32),
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniforms Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UNIFORM_BLOCK_SIZE as u64),
                },
                count: None,
            }],
        });

        let skin_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skin Palette Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(SKIN_PALETTE_BYTES as u64),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Map Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let scene_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[Some(&uniform_layout), Some(&skin_layout), Some(&texture_layout), Some(&shadow_layout)],
            immediate_size: 0,
        });

        let shadow_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[Some(&uniform_layout), Some(&skin_layout)],
            immediate_size: 0,
        });

        // 1. Ring buffers
        let uniform_capacity = settings.queue_capacity.max(1) * UNIFORM_BLOCK_SIZE;
        let uniform_ring = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Ring"),
            size: uniform_capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniform BindGroup"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_ring,
                    offset: 0,
                    size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE as u64),
                }),
            }],
        });

        let skin_capacity = skin_ring_bytes(settings.queue_capacity);
        let skin_ring = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Skin Palette Ring"),
            size: skin_capacity as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let skin_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skin Palette BindGroup"),
            layout: &skin_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &skin_ring,
                    offset: 0,
                    size: wgpu::BufferSize::new(SKIN_PALETTE_BYTES as u64),
                }),
            }],
        });

        // 2. Depth targets
        let depth_view = Self::create_depth_view(&device, settings.depth_format, size, "Main Depth");

        let shadow_view = Self::create_depth_view(
            &device,
            settings.depth_format,
            (settings.shadow_map_size, settings.shadow_map_size),
            "Shadow Map",
        );
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Map BindGroup"),
            layout: &shadow_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });

        // 3. Material defaults
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let white = Self::create_white_texture(&device, &queue);
        let default_texture = Self::texture_bind_group(&device, &texture_layout, &white, &sampler);

        let mut backend = Self {
            device,
            queue,
            uniform_layout,
            skin_layout,
            texture_layout,
            shadow_layout,
            scene_pipeline_layout,
            shadow_pipeline_layout,
            uniform_ring,
            uniform_bind_group,
            uniform_staging: Vec::with_capacity(uniform_capacity),
            skin_ring,
            skin_bind_group,
            skin_staging: Vec::new(),
            depth_format: settings.depth_format,
            depth_view,
            shadow_view,
            shadow_bind_group,
            frame_target: None,
            size,
            pipelines: FxHashMap::default(),
            geometries: FxHashMap::default(),
            sampler,
            textures: Vec::new(),
            default_texture,
            block: vec![0; UNIFORM_BLOCK_SIZE],
            skin_offset: 0,
            shader: None,
            geometry: None,
            texture: None,
            active: None,
            recorded: Vec::new(),
        };
        backend.register_unit_quad();
        backend
    }

    fn create_depth_view(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        (width, height): (u32, u32),
        label: &str,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_white_texture(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Default White Texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255, 255, 255, 255],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn texture_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Texture BindGroup"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    // Two triangles over [-0.5, 0.5]², interleaved `position.xy, uv`.
    fn register_unit_quad(&mut self) {
        #[rustfmt::skip]
        let vertices: [f32; 16] = [
            -0.5, -0.5, 0.0, 1.0,
             0.5, -0.5, 1.0, 1.0,
             0.5,  0.5, 1.0, 0.0,
            -0.5,  0.5, 0.0, 0.0,
        ];
        let indices: [u16; 6] = [0, 1, 2, 0, 2, 3];

        let vertex_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Unit Quad Vertices"),
            size: std::mem::size_of_val(&vertices) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&vertex_buffer, 0, bytemuck::cast_slice(&vertices));

        // Index data padded to COPY_BUFFER_ALIGNMENT.
        let index_bytes = align_to(std::mem::size_of_val(&indices), 4);
        let index_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Unit Quad Indices"),
            size: index_bytes as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&index_buffer, 0, bytemuck::cast_slice(&indices));

        self.geometries.insert(
            GeometryId::UNIT_QUAD,
            GpuGeometry {
                vertex_buffer,
                index_buffer: Some((index_buffer, wgpu::IndexFormat::Uint16, 6)),
                vertex_count: 4,
            },
        );
    }

    // === Registration ===

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Layout for lit, text and quad pipelines (groups 0 to 3).
    #[must_use]
    pub fn scene_pipeline_layout(&self) -> &wgpu::PipelineLayout {
        &self.scene_pipeline_layout
    }

    /// Layout for shadow pipelines (groups 0 and 1).
    #[must_use]
    pub fn shadow_pipeline_layout(&self) -> &wgpu::PipelineLayout {
        &self.shadow_pipeline_layout
    }

    #[must_use]
    pub fn bind_group_layouts(&self) -> [&wgpu::BindGroupLayout; 4] {
        [
            &self.uniform_layout,
            &self.skin_layout,
            &self.texture_layout,
            &self.shadow_layout,
        ]
    }

    pub fn register_shader(&mut self, shader: ShaderId, pipeline: wgpu::RenderPipeline) {
        log::info!("Registered pipeline for {shader:?}");
        self.pipelines.insert(shader, pipeline);
    }

    pub fn register_geometry(&mut self, geometry: GeometryId, buffers: GpuGeometry) {
        log::info!("Registered {geometry:?} ({} vertices)", buffers.vertex_count);
        self.geometries.insert(geometry, buffers);
    }

    pub fn register_texture(&mut self, view: &wgpu::TextureView) -> TextureId {
        let bind_group = Self::texture_bind_group(&self.device, &self.texture_layout, view, &self.sampler);
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(bind_group);
        log::info!("Registered {id:?}");
        id
    }

    /// Colour target for the next frame, usually the surface texture view.
    pub fn set_frame_target(&mut self, view: wgpu::TextureView) {
        self.frame_target = Some(view);
    }

    /// Recreates the main depth target after a surface resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == self.size || width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        self.depth_view = Self::create_depth_view(&self.device, self.depth_format, self.size, "Main Depth");
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    #[must_use]
    pub fn shadow_map_view(&self) -> &wgpu::TextureView {
        &self.shadow_view
    }

    // === Recording ===

    fn write_block(&mut self, slot: UniformSlot, bytes: &[u8]) -> Result<(), GpuError> {
        write_block_entry(&mut self.block, slot, bytes)
    }

    fn push_palette(&mut self, palette: &[Mat4]) -> Result<(), GpuError> {
        if palette.len() > MAX_JOINTS {
            return Err(GpuError::UniformUpload {
                slot: UniformSlot::SKIN_TRANSFORMS.0,
                reason: format!("{} joints exceed the palette limit of {MAX_JOINTS}", palette.len()),
            });
        }
        let offset = align_to(self.skin_staging.len(), OFFSET_ALIGNMENT);
        if offset + SKIN_PALETTE_BYTES > self.skin_ring.size() as usize {
            return Err(GpuError::UniformUpload {
                slot: UniformSlot::SKIN_TRANSFORMS.0,
                reason: "skin palette ring exhausted for this frame".into(),
            });
        }
        self.skin_staging.resize(offset, 0);
        self.skin_staging.extend_from_slice(bytemuck::cast_slice(palette));
        self.skin_offset = offset as u32;
        Ok(())
    }

    fn reset_frame(&mut self) {
        self.uniform_staging.clear();
        self.skin_staging.clear();
        self.block.fill(0);
        self.skin_offset = 0;
        self.shader = None;
        self.geometry = None;
        self.texture = None;
        self.active = None;
        self.recorded.clear();
    }

    // === Encoding ===

    fn encode(&self, encoder: &mut wgpu::CommandEncoder, pass: &RecordedPass) -> Result<(), GpuError> {
        let state = &pass.state;
        let depth_ops = wgpu::Operations {
            load: state.clear_depth.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
            store: wgpu::StoreOp::Store,
        };

        let mut render_pass = match state.target {
            RenderTarget::ShadowMap => encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(state.label),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_view,
                    depth_ops: Some(depth_ops),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            }),
            RenderTarget::Screen => {
                let target = self
                    .frame_target
                    .as_ref()
                    .ok_or_else(|| GpuError::Submit("no frame target set".into()))?;
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(state.label),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: state.clear_color.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.depth_view,
                        depth_ops: Some(depth_ops),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                })
            }
        };

        // Each wgpu pass starts with a full-target viewport, which is what
        // restoring the previous viewport amounts to.
        if let Some((width, height)) = state.viewport {
            render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        }

        let mut bound_pipeline = None;
        for op in &pass.draws {
            let pipeline = self.pipelines.get(&op.shader).ok_or(GpuError::UnknownResource {
                kind: "shader",
                id: op.shader.0,
            })?;
            let geometry = self.geometries.get(&op.geometry).ok_or(GpuError::UnknownResource {
                kind: "geometry",
                id: op.geometry.0,
            })?;

            if bound_pipeline != Some(op.shader) {
                render_pass.set_pipeline(pipeline);
                bound_pipeline = Some(op.shader);
            }
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[op.uniform_offset]);
            render_pass.set_bind_group(1, &self.skin_bind_group, &[op.skin_offset]);
            if state.target == RenderTarget::Screen {
                let texture = match op.texture {
                    Some(id) => self.textures.get(id.0 as usize).ok_or(GpuError::UnknownResource {
                        kind: "texture",
                        id: id.0,
                    })?,
                    None => &self.default_texture,
                };
                render_pass.set_bind_group(2, texture, &[]);
                render_pass.set_bind_group(3, &self.shadow_bind_group, &[]);
            }

            render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
            if let Some((index_buffer, index_format, count)) = &geometry.index_buffer {
                render_pass.set_index_buffer(index_buffer.slice(..), *index_format);
                render_pass.draw_indexed(0..*count, 0, 0..1);
            } else {
                render_pass.draw(0..geometry.vertex_count, 0..1);
            }
        }

        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    fn begin_frame(&mut self) -> Result<(), GpuError> {
        self.reset_frame();
        Ok(())
    }

    fn begin_pass(&mut self, state: &PassState) -> Result<(), GpuError> {
        if let Some(active) = &self.active {
            return Err(GpuError::PassTransition(format!(
                "'{}' entered while '{}' is still active",
                state.label, active.state.label
            )));
        }
        self.active = Some(RecordedPass {
            state: state.clone(),
            draws: Vec::new(),
        });
        self.shader = None;
        self.texture = None;
        Ok(())
    }

    fn end_pass(&mut self) -> Result<(), GpuError> {
        let pass = self
            .active
            .take()
            .ok_or_else(|| GpuError::PassTransition("end_pass without an active pass".into()))?;
        self.recorded.push(pass);
        Ok(())
    }

    fn bind_shader(&mut self, shader: ShaderId) -> Result<(), GpuError> {
        if !self.pipelines.contains_key(&shader) {
            return Err(GpuError::ShaderBind(format!("no pipeline registered for {shader:?}")));
        }
        self.shader = Some(shader);
        Ok(())
    }

    fn set_uniform(&mut self, slot: UniformSlot, value: &UniformValue) -> Result<(), GpuError> {
        match value {
            UniformValue::Mat4(m) => self.write_block(slot, bytemuck::bytes_of(m)),
            UniformValue::Vec4(v) => self.write_block(slot, bytemuck::bytes_of(v)),
            UniformValue::Vec3(v) => self.write_block(slot, bytemuck::bytes_of(&v.extend(0.0))),
            UniformValue::Float(f) => self.write_block(slot, bytemuck::bytes_of(f)),
            UniformValue::Int(i) => self.write_block(slot, bytemuck::bytes_of(i)),
            UniformValue::Bool(b) => self.write_block(slot, bytemuck::bytes_of(&u32::from(*b))),
            UniformValue::Mat4Array(palette) if slot == UniformSlot::SKIN_TRANSFORMS => {
                self.push_palette(palette)
            }
            UniformValue::Mat4Array(_) => Err(GpuError::UniformUpload {
                slot: slot.0,
                reason: format!("'{}' does not accept a matrix array", slot.name()),
            }),
        }
    }

    fn bind_geometry(&mut self, geometry: GeometryId) -> Result<(), GpuError> {
        if !self.geometries.contains_key(&geometry) {
            return Err(GpuError::GeometryBind {
                geometry: geometry.0,
                reason: "geometry was never registered".into(),
            });
        }
        self.geometry = Some(geometry);
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<(), GpuError> {
        if unit != 0 {
            return Err(GpuError::TextureBind(format!("texture unit {unit} is not supported")));
        }
        if texture.0 as usize >= self.textures.len() {
            return Err(GpuError::UnknownResource {
                kind: "texture",
                id: texture.0,
            });
        }
        self.texture = Some(texture);
        Ok(())
    }

    fn draw(&mut self, geometry: GeometryId) -> Result<(), GpuError> {
        let shader = self.shader.ok_or_else(|| GpuError::Draw("no shader bound".into()))?;
        if self.geometry != Some(geometry) {
            return Err(GpuError::Draw(format!("{geometry:?} drawn without being bound")));
        }

        let uniform_offset = self.uniform_staging.len();
        if uniform_offset + UNIFORM_BLOCK_SIZE > self.uniform_ring.size() as usize {
            return Err(GpuError::Draw("uniform ring exhausted for this frame".into()));
        }
        self.uniform_staging.extend_from_slice(&self.block);

        let op = DrawOp {
            shader,
            geometry,
            texture: self.texture,
            uniform_offset: uniform_offset as u32,
            skin_offset: self.skin_offset,
        };
        let pass = self
            .active
            .as_mut()
            .ok_or_else(|| GpuError::Draw("draw outside of a pass".into()))?;
        pass.draws.push(op);

        // Texture bindings last for a single draw; hooks rebind per command.
        self.texture = None;
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        if self.active.is_some() {
            return Err(GpuError::Submit("frame ended inside a pass".into()));
        }

        if !self.uniform_staging.is_empty() {
            self.queue.write_buffer(&self.uniform_ring, 0, &self.uniform_staging);
        }
        if !self.skin_staging.is_empty() {
            // write_buffer sizes must be a multiple of 4; matrices always are.
            self.queue.write_buffer(&self.skin_ring, 0, &self.skin_staging);
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        let recorded = std::mem::take(&mut self.recorded);
        let encoded = recorded
            .iter()
            .try_for_each(|pass| self.encode(&mut encoder, pass));
        self.reset_frame();
        encoded?;

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn abort_frame(&mut self) {
        log::debug!("Dropping {} recorded passes", self.recorded.len());
        self.reset_frame();
    }
}
