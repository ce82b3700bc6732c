//! # GPU Backend — The Decal Layer on wgpu
//!
//! [`GpuBackend`] implements [`CompositeBackend`] with an off-screen render
//! target. It runs the same per-texel program as the
//! [`SoftwareBackend`](super::SoftwareBackend), written in WGSL
//! (`composite.wgsl`), and lets fixed-function blending combine decals.
//!
//! ## How It Works
//!
//! ```text
//!   create_target ── load + validate program (MissingProgram on failure)
//!                    upload reference maps, create Rgba8 target
//!   begin_pass    ── start recording draws
//!   draw_decal    ── record (texture, uniform, blend)
//!   end_pass      ── one render pass: clear to transparent,
//!                    one full-target triangle per recorded draw
//!   read_output   ── copy target → staging buffer → FloatImage
//! ```
//!
//! Draws are recorded and submitted together in `end_pass`, so a whole
//! re-composite is a single command buffer.
//!
//! ## Program Source
//!
//! The program is compiled into the crate by default. A host can point the
//! backend at a file instead ([`ProgramSource::File`]) to iterate on the
//! shader; a missing or invalid file fails target creation with
//! [`CompositeError::MissingProgram`], which disables the compositor.

mod context;
mod pipeline;

pub use context::GpuContext;

use std::path::PathBuf;

use log::{debug, info};

use crate::math::Vec4;

use self::pipeline::{CompositePipeline, DecalUniform, DECAL_FORMAT, REFERENCE_FORMAT, TARGET_FORMAT};
use super::backend::{CompositeBackend, CompositeError, DecalDrawParams, OutputTexture};
use super::texture::{DecalImage, FloatImage, ReferenceMaps, TextureHandle};

const BUILTIN_PROGRAM: &str = include_str!("composite.wgsl");

/// Where the composite program comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProgramSource {
    /// The program shipped with the crate.
    #[default]
    Builtin,
    /// WGSL read from disk when the target is created.
    File(PathBuf),
}

impl ProgramSource {
    fn load(&self) -> Result<String, CompositeError> {
        match self {
            ProgramSource::Builtin => Ok(BUILTIN_PROGRAM.to_owned()),
            ProgramSource::File(path) => std::fs::read_to_string(path)
                .map_err(|e| CompositeError::MissingProgram(format!("{}: {e}", path.display()))),
        }
    }
}

struct GpuTexture {
    bind_group: wgpu::BindGroup,
}

struct GpuTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    resolution: u32,
}

/// wgpu implementation of [`CompositeBackend`].
pub struct GpuBackend {
    gpu: GpuContext,
    program: ProgramSource,
    pipeline: Option<CompositePipeline>,
    reference: Option<ReferenceMaps>,
    reference_bind_group: Option<wgpu::BindGroup>,
    /// CPU copies, kept so textures survive a program reload. Released
    /// handles leave a `None` slot.
    images: Vec<Option<DecalImage>>,
    textures: Vec<Option<GpuTexture>>,
    target: Option<GpuTarget>,
    generation: u64,
    pending: Option<Vec<DecalDrawParams>>,
}

impl GpuBackend {
    pub fn new(gpu: GpuContext, reference: ReferenceMaps) -> Self {
        Self {
            gpu,
            program: ProgramSource::Builtin,
            pipeline: None,
            reference: Some(reference),
            reference_bind_group: None,
            images: Vec::new(),
            textures: Vec::new(),
            target: None,
            generation: 0,
            pending: None,
        }
    }

    /// Create a headless context and a backend on it.
    pub fn headless(reference: ReferenceMaps) -> Result<Self, CompositeError> {
        Ok(Self::new(GpuContext::headless()?, reference))
    }

    pub fn with_program(mut self, program: ProgramSource) -> Self {
        self.set_program(program);
        self
    }

    /// Change the program source. Takes effect on the next target creation.
    pub fn set_program(&mut self, program: ProgramSource) {
        self.program = program;
        self.pipeline = None;
        self.reference_bind_group = None;
        self.textures.clear();
    }

    /// Replace the reference maps. Takes effect on the next target creation.
    pub fn set_reference_maps(&mut self, reference: ReferenceMaps) {
        self.reference = Some(reference);
        self.reference_bind_group = None;
    }

    pub fn context(&self) -> &GpuContext {
        &self.gpu
    }

    /// The layer texture, for hosts that sample it on the same device.
    pub fn target_texture(&self) -> Option<&wgpu::Texture> {
        self.target.as_ref().map(|t| &t.texture)
    }

    pub fn target_view(&self) -> Option<&wgpu::TextureView> {
        self.target.as_ref().map(|t| &t.view)
    }

    /// Build the pipeline, reference bind group, and any texture bind groups
    /// that are missing.
    fn prepare(&mut self) -> Result<(), CompositeError> {
        if self.pipeline.is_none() {
            let source = self.program.load()?;
            self.pipeline = Some(CompositePipeline::new(&self.gpu.device, &source)?);
            info!("composite program ready ({:?})", self.program);
        }
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Err(CompositeError::MissingProgram("pipeline not built".into()));
        };

        if self.reference_bind_group.is_none() {
            let reference = self.reference.as_ref().ok_or(CompositeError::MissingReferenceMaps)?;
            let position = upload_float_image(&self.gpu, reference.position(), "reference position");
            let normal = upload_float_image(&self.gpu, reference.normal(), "reference normal");
            self.reference_bind_group = Some(self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("composite reference bind group"),
                layout: &pipeline.reference_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&position),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&normal),
                    },
                ],
            }));
        }

        upload_missing(&self.gpu, pipeline, &self.images, &mut self.textures);
        Ok(())
    }
}

impl CompositeBackend for GpuBackend {
    fn create_target(&mut self, resolution: u32) -> Result<OutputTexture, CompositeError> {
        if resolution == 0 || resolution > self.gpu.max_resolution() {
            return Err(CompositeError::InvalidResolution(resolution));
        }
        self.prepare()?;

        let texture = self.gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("decal layer"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.target = Some(GpuTarget {
            texture,
            view,
            resolution,
        });
        self.generation += 1;
        debug!("gpu target {resolution}x{resolution} (generation {})", self.generation);

        // A fresh target starts transparent.
        self.begin_pass()?;
        self.end_pass()?;

        Ok(OutputTexture {
            generation: self.generation,
            resolution,
        })
    }

    fn destroy_target(&mut self) {
        self.target = None;
        self.pending = None;
    }

    fn upload_texture(&mut self, image: &DecalImage) -> Result<TextureHandle, CompositeError> {
        self.images.push(Some(image.clone()));
        let handle = TextureHandle(self.images.len() - 1);
        // Uploaded now if the pipeline exists, otherwise on the next prepare.
        if let Some(pipeline) = self.pipeline.as_ref() {
            upload_missing(&self.gpu, pipeline, &self.images, &mut self.textures);
        }
        Ok(handle)
    }

    fn release_texture(&mut self, handle: TextureHandle) -> bool {
        let Some(slot) = self.images.get_mut(handle.0) else {
            return false;
        };
        let released = slot.take().is_some();
        if let Some(texture) = self.textures.get_mut(handle.0) {
            *texture = None;
        }
        if released {
            debug!("released gpu decal texture #{}", handle.0);
        }
        released
    }

    fn begin_pass(&mut self) -> Result<(), CompositeError> {
        if self.target.is_none() {
            return Err(CompositeError::NoTarget);
        }
        self.pending = Some(Vec::new());
        Ok(())
    }

    fn draw_decal(&mut self, params: &DecalDrawParams) -> Result<(), CompositeError> {
        if !matches!(self.images.get(params.texture.0), Some(Some(_))) {
            return Err(CompositeError::UnknownTexture(params.texture));
        }
        let pending = self.pending.as_mut().ok_or(CompositeError::NoTarget)?;
        pending.push(*params);
        Ok(())
    }

    fn end_pass(&mut self) -> Result<(), CompositeError> {
        let draws = self.pending.take().ok_or(CompositeError::NoTarget)?;
        let resolution = self.target.as_ref().ok_or(CompositeError::NoTarget)?.resolution;
        self.prepare()?;

        let device = &self.gpu.device;
        let Some(pipeline) = self.pipeline.as_mut() else {
            return Err(CompositeError::MissingProgram("pipeline not built".into()));
        };

        // ── Uniforms ────────────────────────────────────────────────────
        let stride = pipeline.ensure_uniform_capacity(device, draws.len().max(1));
        for (i, draw) in draws.iter().enumerate() {
            let uniform = DecalUniform::new(draw, resolution);
            self.gpu.queue.write_buffer(
                &pipeline.uniform_buffer,
                i as u64 * stride as u64,
                bytemuck::cast_slice(&[uniform]),
            );
        }
        for draw in &draws {
            pipeline.pipeline(device, draw.blend);
        }

        // ── Pass ────────────────────────────────────────────────────────
        let (Some(target), Some(reference)) = (self.target.as_ref(), self.reference_bind_group.as_ref()) else {
            return Err(CompositeError::NoTarget);
        };
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("decal composite encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("decal composite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_bind_group(0, reference, &[]);
            for (i, draw) in draws.iter().enumerate() {
                let Some(Some(texture)) = self.textures.get(draw.texture.0) else {
                    continue;
                };
                let Some(render_pipeline) = pipeline.cached(draw.blend) else {
                    continue;
                };
                pass.set_pipeline(render_pipeline);
                pass.set_bind_group(1, &texture.bind_group, &[]);
                pass.set_bind_group(2, &pipeline.uniform_bind_group, &[i as u32 * stride]);
                pass.draw(0..3, 0..1);
            }
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn read_output(&mut self) -> Result<FloatImage, CompositeError> {
        let target = self.target.as_ref().ok_or(CompositeError::NoTarget)?;
        let pixels = read_target_pixels(&self.gpu, &target.texture, target.resolution)?;
        let res = target.resolution;
        Ok(FloatImage::from_fn(res, res, |x, y| {
            let i = ((y * res + x) * 4) as usize;
            Vec4::new(
                pixels[i] as f32,
                pixels[i + 1] as f32,
                pixels[i + 2] as f32,
                pixels[i + 3] as f32,
            ) / 255.0
        }))
    }
}

// ── Uploads ─────────────────────────────────────────────────────────────

fn upload_float_image(gpu: &GpuContext, image: &FloatImage, label: &str) -> wgpu::TextureView {
    let (width, height) = image.dimensions();
    let texels: Vec<[f32; 4]> = image.pixels().iter().map(|p| p.to_array()).collect();
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: REFERENCE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    gpu.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(&texels),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 16),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Upload every image that has no GPU texture yet. Released slots stay empty.
fn upload_missing(
    gpu: &GpuContext,
    pipeline: &CompositePipeline,
    images: &[Option<DecalImage>],
    textures: &mut Vec<Option<GpuTexture>>,
) {
    while textures.len() < images.len() {
        let texture = images[textures.len()]
            .as_ref()
            .map(|image| upload_decal_image(gpu, pipeline, image));
        textures.push(texture);
    }
}

fn upload_decal_image(gpu: &GpuContext, pipeline: &CompositePipeline, image: &DecalImage) -> GpuTexture {
    let size = wgpu::Extent3d {
        width: image.width(),
        height: image.height(),
        depth_or_array_layers: 1,
    };
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("decal image"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DECAL_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    gpu.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.as_bytes(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(image.width() * 4),
            rows_per_image: Some(image.height()),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("decal image bind group"),
        layout: &pipeline.decal_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&pipeline.sampler),
            },
        ],
    });
    GpuTexture { bind_group }
}

// ── Readback ────────────────────────────────────────────────────────────

/// Copy an RGBA8 target into tightly packed bytes.
fn read_target_pixels(gpu: &GpuContext, texture: &wgpu::Texture, resolution: u32) -> Result<Vec<u8>, CompositeError> {
    // Rows must be aligned to COPY_BYTES_PER_ROW_ALIGNMENT (256 bytes).
    let bytes_per_pixel = 4u32;
    let unpadded_bytes_per_row = resolution * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

    let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("decal layer staging buffer"),
        size: (padded_bytes_per_row * resolution) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("decal layer readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(resolution),
            },
        },
        wgpu::Extent3d {
            width: resolution,
            height: resolution,
            depth_or_array_layers: 1,
        },
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    gpu.device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| CompositeError::Readback(e.to_string()))?;
    rx.recv()
        .map_err(|e| CompositeError::Readback(e.to_string()))?
        .map_err(|e| CompositeError::Readback(e.to_string()))?;

    let mapped = slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * resolution) as usize);
    for row in 0..resolution {
        let start = (row * padded_bytes_per_row) as usize;
        pixels.extend_from_slice(&mapped[start..start + unpadded_bytes_per_row as usize]);
    }
    drop(mapped);
    staging.unmap();
    Ok(pixels)
}
