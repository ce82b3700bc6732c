//! The drawing seam between the [`Compositor`](super::Compositor) and a GPU
//! (or CPU) implementation.
//!
//! The compositor only ever asks for four things: make a square target, clear
//! it, draw one full-target quad per decal with a blend mode, and finish. Any
//! backend that can do that can host the decal layer.

use std::fmt;

use crate::color::Color;
use crate::math::{Mat4, Vec3, Vec4};

use super::texture::{DecalImage, FloatImage, TextureHandle};

// ── Errors ──────────────────────────────────────────────────────────────

/// Errors raised by composite backends.
#[derive(Debug)]
pub enum CompositeError {
    /// The composite shader/program could not be located or built.
    MissingProgram(String),
    /// The backend has no reference maps to project against.
    MissingReferenceMaps,
    /// Device, adapter, or target creation failed.
    Device(String),
    /// A draw referenced a texture the backend does not know.
    UnknownTexture(TextureHandle),
    /// Pass-level call made with no target (not initialized, or torn down).
    NoTarget,
    /// Resolution must be non-zero and within device limits.
    InvalidResolution(u32),
    /// The compositor is disabled after an earlier failure.
    Disabled,
    /// Reading the output back failed.
    Readback(String),
}

impl fmt::Display for CompositeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositeError::MissingProgram(e) => write!(f, "composite program not found: {e}"),
            CompositeError::MissingReferenceMaps => write!(f, "no reference maps assigned"),
            CompositeError::Device(e) => write!(f, "composite device error: {e}"),
            CompositeError::UnknownTexture(h) => write!(f, "unknown decal texture #{}", h.0),
            CompositeError::NoTarget => write!(f, "no composite target"),
            CompositeError::InvalidResolution(r) => write!(f, "invalid layer resolution {r}"),
            CompositeError::Disabled => write!(f, "compositor is disabled"),
            CompositeError::Readback(e) => write!(f, "output readback failed: {e}"),
        }
    }
}

impl std::error::Error for CompositeError {}

// ── Blending ────────────────────────────────────────────────────────────

/// One side of a fixed-function blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
}

impl BlendFactor {
    /// Per-channel weight for this factor.
    pub fn weight(self, src: Vec4, dst: Vec4) -> Vec4 {
        match self {
            BlendFactor::Zero => Vec4::ZERO,
            BlendFactor::One => Vec4::ONE,
            BlendFactor::SrcAlpha => Vec4::splat(src.w),
            BlendFactor::OneMinusSrcAlpha => Vec4::splat(1.0 - src.w),
            BlendFactor::DstColor => dst,
        }
    }
}

/// Source and destination factors: `out = src·S + dst·D`, per channel,
/// alpha included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendFactors {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendFactors {
    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self { src, dst }
    }

    /// Evaluate the blend equation, saturating to [0, 1] like a UNORM target.
    pub fn blend(self, src: Vec4, dst: Vec4) -> Vec4 {
        (src * self.src.weight(src, dst) + dst * self.dst.weight(src, dst))
            .clamp(Vec4::ZERO, Vec4::ONE)
    }
}

// ── Draw parameters ─────────────────────────────────────────────────────

/// Everything a backend needs to draw one decal into the layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecalDrawParams {
    pub texture: TextureHandle,
    /// Surface space to decal-local space.
    pub inverse_projection: Mat4,
    /// Unit projection direction in surface space, for back-face rejection.
    pub projection_axis: Vec3,
    pub opacity: f32,
    pub tint: Color,
    pub blend: BlendFactors,
}

/// The composited layer as seen by a surface material.
///
/// `generation` changes every time a backend creates a new target, so a
/// material can tell a rebind from a stale binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputTexture {
    pub generation: u64,
    pub resolution: u32,
}

/// A surface that can sample the decal layer.
pub trait CompositeBackend {
    /// Create a `resolution`² target, cleared to transparent.
    fn create_target(&mut self, resolution: u32) -> Result<OutputTexture, CompositeError>;

    /// Release the current target. No-op when there is none.
    fn destroy_target(&mut self);

    /// Make a decal image available to [`draw_decal`](Self::draw_decal).
    fn upload_texture(&mut self, image: &DecalImage) -> Result<TextureHandle, CompositeError>;

    /// Free a decal image. Later draws with `handle` fail with
    /// [`CompositeError::UnknownTexture`]; handles are never reused. Returns
    /// whether anything was freed.
    fn release_texture(&mut self, handle: TextureHandle) -> bool;

    /// Start a pass. The target is cleared to transparent.
    fn begin_pass(&mut self) -> Result<(), CompositeError>;

    /// Draw one full-target quad for a decal.
    fn draw_decal(&mut self, params: &DecalDrawParams) -> Result<(), CompositeError>;

    /// Finish the pass and make the result visible to samplers.
    fn end_pass(&mut self) -> Result<(), CompositeError>;

    /// Copy the current target back to the CPU.
    fn read_output(&mut self) -> Result<FloatImage, CompositeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_blend_is_over() {
        let blend = BlendFactors::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        let dst = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let src = Vec4::new(0.0, 0.0, 1.0, 0.25);
        let out = blend.blend(src, dst);
        assert!((out.x - 0.75).abs() < 1e-6);
        assert!((out.z - 0.25).abs() < 1e-6);
    }

    #[test]
    fn multiply_darkens() {
        let blend = BlendFactors::new(BlendFactor::DstColor, BlendFactor::Zero);
        let out = blend.blend(Vec4::splat(0.5), Vec4::new(0.8, 0.4, 1.0, 1.0));
        assert!((out - Vec4::new(0.4, 0.2, 0.5, 0.5)).length() < 1e-6);
    }

    #[test]
    fn additive_saturates() {
        let blend = BlendFactors::new(BlendFactor::SrcAlpha, BlendFactor::One);
        let out = blend.blend(Vec4::ONE, Vec4::splat(0.9));
        assert_eq!(out, Vec4::ONE);
    }
}
