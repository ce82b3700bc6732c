//! # Pipeline — Composite Program and GPU Resources
//!
//! The composite pass draws one full-target triangle per decal. Everything
//! that differs between decals lives in a per-draw uniform and the decal's own
//! texture bind group; the only thing that needs a different pipeline is the
//! blend equation, so pipelines are built lazily, one per [`BlendFactors`].
//!
//! ## Bind Groups
//!
//! ```text
//!   group 0  reference maps      position, normal   (Rgba32Float, textureLoad)
//!   group 1  decal image         texture, sampler   (Rgba8Unorm, linear clamp)
//!   group 2  decal uniform       dynamic offset into one buffer per pass
//! ```
//!
//! Reference maps are read with `textureLoad` because 32-bit float textures
//! are not filterable on every adapter.
//!
//! ## Dynamic Uniforms
//!
//! All draws of one pass write their [`DecalUniform`] into a single buffer at
//! `min_uniform_buffer_offset_alignment` strides and bind it with a dynamic
//! offset, the same scheme the mesh renderer uses for per-object transforms.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::composite::{BlendFactor, BlendFactors, CompositeError, DecalDrawParams};

/// Output format of the decal layer.
pub(crate) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Format of the baked reference maps.
pub(crate) const REFERENCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
/// Format of uploaded decal images.
pub(crate) const DECAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Per-draw uniform, mirrored by `DecalUniform` in `composite.wgsl`.
///
/// ```text
/// DecalUniform (112 bytes)
/// ┌──────────────────────┬────────────────┬──────────┬────────────────────┐
/// │ inverse_projection   │ projection_axis│ tint     │ params             │
/// │ mat4x4<f32>  64 B    │ vec4  16 B     │ vec4 16 B│ opacity, res, -, - │
/// └──────────────────────┴────────────────┴──────────┴────────────────────┘
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct DecalUniform {
    pub inverse_projection: [[f32; 4]; 4],
    pub projection_axis: [f32; 4],
    pub tint: [f32; 4],
    pub params: [f32; 4],
}

impl DecalUniform {
    pub fn new(params: &DecalDrawParams, resolution: u32) -> Self {
        Self {
            inverse_projection: params.inverse_projection.to_cols_array_2d(),
            projection_axis: params.projection_axis.extend(0.0).to_array(),
            tint: params.tint.to_array(),
            params: [params.opacity, resolution as f32, 0.0, 0.0],
        }
    }
}

fn wgpu_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstColor => wgpu::BlendFactor::Dst,
    }
}

/// Fixed-function blend state for a pair of factors. Alpha uses the same
/// equation as color.
pub(crate) fn blend_state(blend: BlendFactors) -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu_factor(blend.src),
        dst_factor: wgpu_factor(blend.dst),
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

pub(crate) fn align_up(size: usize, align: usize) -> usize {
    size.div_ceil(align) * align
}

/// All GPU resources for the composite pass.
pub(crate) struct CompositePipeline {
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    pipelines: HashMap<BlendFactors, wgpu::RenderPipeline>,

    pub reference_layout: wgpu::BindGroupLayout,
    pub decal_layout: wgpu::BindGroupLayout,
    uniform_layout: wgpu::BindGroupLayout,

    pub sampler: wgpu::Sampler,

    pub uniform_buffer: wgpu::Buffer,
    pub uniform_bind_group: wgpu::BindGroup,
    uniform_capacity: usize,
}

impl CompositePipeline {
    /// Compile `source` and create the shared layouts. Fails with
    /// [`CompositeError::MissingProgram`] when the program does not validate.
    pub fn new(device: &wgpu::Device, source: &str) -> Result<Self, CompositeError> {
        // ── Shader ──────────────────────────────────────────────────────
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("decal composite shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(CompositeError::MissingProgram(err.to_string()));
        }

        // ── Bind group layout 0: reference maps ─────────────────────────
        let reference_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
            },
            count: None,
        };
        let reference_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite reference layout"),
            entries: &[reference_entry(0), reference_entry(1)],
        });

        // ── Bind group layout 1: decal image ────────────────────────────
        let decal_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite decal layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
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

        // ── Bind group layout 2: per-draw uniform (dynamic offset) ──────
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<DecalUniform>() as u64),
                },
                count: None,
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("composite pipeline layout"),
            bind_group_layouts: &[&reference_layout, &decal_layout, &uniform_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("composite decal sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let initial_capacity = 16;
        let (uniform_buffer, uniform_bind_group) = create_uniform_buffer(device, &uniform_layout, initial_capacity);

        Ok(Self {
            shader,
            layout,
            pipelines: HashMap::new(),
            reference_layout,
            decal_layout,
            uniform_layout,
            sampler,
            uniform_buffer,
            uniform_bind_group,
            uniform_capacity: initial_capacity,
        })
    }

    /// The pipeline for a blend mode, built on first use.
    pub fn pipeline(&mut self, device: &wgpu::Device, blend: BlendFactors) -> &wgpu::RenderPipeline {
        let shader = &self.shader;
        let layout = &self.layout;
        self.pipelines.entry(blend).or_insert_with(|| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("decal composite pipeline"),
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
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: Some(blend_state(blend)),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
    }

    /// A pipeline already built by [`pipeline`](Self::pipeline).
    pub fn cached(&self, blend: BlendFactors) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&blend)
    }

    /// Ensure the uniform buffer holds `count` draws. Returns the aligned
    /// stride in bytes.
    pub fn ensure_uniform_capacity(&mut self, device: &wgpu::Device, count: usize) -> u32 {
        let align = device.limits().min_uniform_buffer_offset_alignment as usize;
        let stride = align_up(std::mem::size_of::<DecalUniform>(), align);

        if count > self.uniform_capacity {
            let new_cap = count.next_power_of_two();
            let (buffer, bind_group) = create_uniform_buffer(device, &self.uniform_layout, new_cap);
            self.uniform_buffer = buffer;
            self.uniform_bind_group = bind_group;
            self.uniform_capacity = new_cap;
        }

        stride as u32
    }
}

fn create_uniform_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let align = device.limits().min_uniform_buffer_offset_alignment as usize;
    let stride = align_up(std::mem::size_of::<DecalUniform>(), align);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("composite uniform buffer"),
        size: (stride * capacity) as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("composite uniform bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<DecalUniform>() as u64),
            }),
        }],
    });

    (buffer, bind_group)
}
