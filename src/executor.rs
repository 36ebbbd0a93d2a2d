//! Pipeline Executor
//!
//! Owns the GPU-side machinery of the godray pass (pipelines, bind group
//! layouts, samplers, and the uniform buffer) and records the validated
//! stage sequence into the host's command encoder.
//!
//! # Data Flow
//!
//! ```text
//! FrameContext (color + depth, borrowed)
//!        │
//!        ▼
//! Stage 1: RayMarch ──► R8Unorm mask scratch (downsampled)
//!        │
//!        ▼  (optional copy_texture_to_texture)
//! Publication ──► full-res color snapshot scratch
//!        │
//!        ▼
//! Stage 2: Composite ──► output color buffer (LoadOp::Load + alpha blend)
//! ```
//!
//! # Caching
//!
//! - The ray-march pipeline is created once (mask format is fixed).
//! - Composite pipelines are cached per output color format; typical
//!   usage produces exactly one entry.
//! - Bind groups are rebuilt only when the ids of the views they
//!   reference change, so a stable frame costs no descriptor churn.

use rustc_hash::FxHashMap;

use crate::params::GodrayUniforms;
use crate::pool::ScratchTexture;
use crate::tracked::Tracked;

/// The ray-march mask format: single-channel unsigned normalized.
pub const MASK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// GPU-side state of the godray pass.
pub struct GodrayExecutor {
    // === Bind Group Layouts ===
    march_layout: Tracked<wgpu::BindGroupLayout>,
    composite_layout: Tracked<wgpu::BindGroupLayout>,

    // === Shared Resources ===
    /// Linear clamp sampler for color and mask sampling.
    color_sampler: Tracked<wgpu::Sampler>,
    /// Nearest clamp sampler for the depth buffer.
    depth_sampler: Tracked<wgpu::Sampler>,
    /// Uniform buffer holding [`GodrayUniforms`], rewritten every frame.
    uniform_buffer: wgpu::Buffer,

    // === Pipelines ===
    march_pipeline: Option<wgpu::RenderPipeline>,
    /// Composite pipelines keyed by output format; typically 1 entry.
    composite_pipelines: FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,

    // === Cached BindGroups (rebuilt when the referenced views change) ===
    march_bind_group: Option<wgpu::BindGroup>,
    march_bind_key: (u64, u64),
    composite_bind_group: Option<wgpu::BindGroup>,
    composite_bind_key: u64,
}

impl GodrayExecutor {
    /// Creates the executor, allocating layouts, samplers, and the
    /// uniform buffer. Pipelines are built lazily on first prepare.
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        // --- Bind Group Layout: ray march ---
        // scene color + depth + two samplers + uniforms
        let march_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Godray March Layout"),
            entries: &[
                // Binding 0: Scene color
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
                // Binding 1: Scene depth
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Binding 2: Color sampler (linear)
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Binding 3: Depth sampler (nearest)
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
                // Binding 4: Uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        // --- Bind Group Layout: composite ---
        // mask + sampler + uniforms
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Godray Composite Layout"),
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
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        // --- Samplers ---
        let color_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Godray Color Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let depth_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Godray Depth Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // --- Uniform buffer, rewritten each frame via write_buffer ---
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Godray Uniforms"),
            size: std::mem::size_of::<GodrayUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            march_layout: Tracked::new(march_layout),
            composite_layout: Tracked::new(composite_layout),
            color_sampler: Tracked::new(color_sampler),
            depth_sampler: Tracked::new(depth_sampler),
            uniform_buffer,
            march_pipeline: None,
            composite_pipelines: FxHashMap::default(),
            march_bind_group: None,
            march_bind_key: (0, 0),
            composite_bind_group: None,
            composite_bind_key: 0,
        }
    }

    // =========================================================================
    // Pipeline Creation
    // =========================================================================

    /// Builds the ray-march pipeline and the composite pipeline for
    /// `color_format` if they do not exist yet.
    pub fn ensure_pipelines(&mut self, device: &wgpu::Device, color_format: wgpu::TextureFormat) {
        if self.march_pipeline.is_none() {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Godray March Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/godray.wgsl").into()),
            });

            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Godray March Pipeline Layout"),
                bind_group_layouts: &[Some(&*self.march_layout)],
                immediate_size: 0,
            });

            self.march_pipeline = Some(Self::fullscreen_pipeline(
                device,
                &shader,
                &layout,
                wgpu::ColorTargetState {
                    format: MASK_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                },
                "Godray March Pipeline",
            ));
        }

        if !self.composite_pipelines.contains_key(&color_format) {
            log::debug!("compiling godray composite pipeline for {color_format:?}");

            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Godray Composite Shader"),
                source: wgpu::ShaderSource::Wgsl(
                    include_str!("shaders/godray_composite.wgsl").into(),
                ),
            });

            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Godray Composite Pipeline Layout"),
                bind_group_layouts: &[Some(&*self.composite_layout)],
                immediate_size: 0,
            });

            let pipeline = Self::fullscreen_pipeline(
                device,
                &shader,
                &layout,
                wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                },
                "Godray Composite Pipeline",
            );
            self.composite_pipelines.insert(color_format, pipeline);
        }
    }

    fn fullscreen_pipeline(
        device: &wgpu::Device,
        shader: &wgpu::ShaderModule,
        layout: &wgpu::PipelineLayout,
        target: wgpu::ColorTargetState,
        label: &str,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(target)],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    // =========================================================================
    // Per-Frame Preparation
    // =========================================================================

    /// Uploads this frame's uniform block.
    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &GodrayUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Rebuilds the ray-march bind group if the color or depth view
    /// changed since the last frame.
    pub fn prepare_march_bind_group(
        &mut self,
        device: &wgpu::Device,
        color_view: &Tracked<wgpu::TextureView>,
        depth_view: &Tracked<wgpu::TextureView>,
    ) {
        let key = (color_view.id(), depth_view.id());
        if self.march_bind_group.is_some() && self.march_bind_key == key {
            return;
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Godray March BindGroup"),
            layout: &self.march_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(color_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(depth_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.color_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.depth_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        self.march_bind_group = Some(bind_group);
        self.march_bind_key = key;
    }

    /// Rebuilds the composite bind group if the mask view changed (e.g.
    /// after a resolution-driven reallocation).
    pub fn prepare_composite_bind_group(
        &mut self,
        device: &wgpu::Device,
        mask_view: &Tracked<wgpu::TextureView>,
    ) {
        let key = mask_view.id();
        if self.composite_bind_group.is_some() && self.composite_bind_key == key {
            return;
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Godray Composite BindGroup"),
            layout: &self.composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(mask_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.color_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        self.composite_bind_group = Some(bind_group);
        self.composite_bind_key = key;
    }

    /// Whether every pipeline and bind group needed to record a frame is
    /// present. Checked by the pass before any command is issued.
    #[must_use]
    pub fn ready(&self, color_format: wgpu::TextureFormat) -> bool {
        self.march_pipeline.is_some()
            && self.composite_pipelines.contains_key(&color_format)
            && self.march_bind_group.is_some()
            && self.composite_bind_group.is_some()
    }

    // =========================================================================
    // Command Recording
    // =========================================================================

    /// Records the ray-march into the mask scratch.
    pub fn record_march(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        mask_view: &wgpu::TextureView,
        clear_mask: bool,
    ) {
        let Some(pipeline) = &self.march_pipeline else {
            return;
        };
        let Some(bind_group) = &self.march_bind_group else {
            return;
        };

        let load = if clear_mask {
            wgpu::LoadOp::Clear(wgpu::Color::BLACK)
        } else {
            wgpu::LoadOp::DontCare(wgpu::LoadOpDontCare::default())
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Godray March"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: mask_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1); // fullscreen triangle
    }

    /// Records the pre-composite snapshot copy into the publication
    /// scratch. The output buffer must carry `COPY_SRC`.
    pub fn record_snapshot_copy(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::Texture,
        snapshot: &ScratchTexture,
    ) {
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: source,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: snapshot.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: snapshot.desc().width,
                height: snapshot.desc().height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Records the composite blend over the output buffer.
    ///
    /// Uses `LoadOp::Load` so the existing output contents survive into
    /// the blend, the in-place aliasing documented on
    /// [`Kernel::Composite`](crate::stage::Kernel).
    pub fn record_composite(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output_view: &wgpu::TextureView,
        color_format: wgpu::TextureFormat,
    ) {
        let Some(pipeline) = self.composite_pipelines.get(&color_format) else {
            return;
        };
        let Some(bind_group) = &self.composite_bind_group else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Godray Composite"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1); // fullscreen triangle
    }
}
