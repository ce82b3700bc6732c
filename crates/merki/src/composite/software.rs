//! # Software Backend — CPU Reference Compositor
//!
//! Runs the same per-texel program as the GPU shader, one texel at a time:
//!
//! ```text
//!   for each output texel (x, y):
//!       uv           = texel center / resolution
//!       (p, n)       = reference maps at uv        (skip if no surface)
//!       local        = inverse_projection · p
//!       decal_uv     = footprint(local)            (skip if outside)
//!       skip if n faces away from the projector
//!       src          = decal(decal_uv) · tint,  src.a *= opacity
//!       dst          = blend(src, dst)
//! ```
//!
//! It is slow for large layers but exact and dependency-free, which makes it
//! the backend used by the test suite and by hosts without a GPU.

use log::debug;

use crate::decal::projection::footprint_uv;
use crate::math::{Vec2, Vec4};

use super::backend::{CompositeBackend, CompositeError, DecalDrawParams, OutputTexture};
use super::texture::{DecalImage, FloatImage, ReferenceMaps, TextureHandle};

/// Largest layer the CPU backend will allocate.
const MAX_RESOLUTION: u32 = 8192;

/// CPU implementation of [`CompositeBackend`].
#[derive(Debug, Default)]
pub struct SoftwareBackend {
    reference: Option<ReferenceMaps>,
    /// Released handles leave a `None` slot.
    textures: Vec<Option<DecalImage>>,
    target: Option<FloatImage>,
    generation: u64,
    in_pass: bool,
}

impl SoftwareBackend {
    pub fn new(reference: ReferenceMaps) -> Self {
        Self {
            reference: Some(reference),
            ..Default::default()
        }
    }

    /// A backend with no reference maps yet. Target creation fails until
    /// [`set_reference_maps`](Self::set_reference_maps) is called.
    pub fn without_reference() -> Self {
        Self::default()
    }

    pub fn set_reference_maps(&mut self, reference: ReferenceMaps) {
        self.reference = Some(reference);
    }

    /// The composited layer, if a target exists.
    pub fn output(&self) -> Option<&FloatImage> {
        self.target.as_ref()
    }

    /// Decal images currently held.
    pub fn texture_count(&self) -> usize {
        self.textures.iter().flatten().count()
    }
}

impl CompositeBackend for SoftwareBackend {
    fn create_target(&mut self, resolution: u32) -> Result<OutputTexture, CompositeError> {
        if resolution == 0 || resolution > MAX_RESOLUTION {
            return Err(CompositeError::InvalidResolution(resolution));
        }
        if self.reference.is_none() {
            return Err(CompositeError::MissingReferenceMaps);
        }
        self.target = Some(FloatImage::new(resolution, resolution, Vec4::ZERO));
        self.generation += 1;
        debug!("software target {resolution}x{resolution} (generation {})", self.generation);
        Ok(OutputTexture {
            generation: self.generation,
            resolution,
        })
    }

    fn destroy_target(&mut self) {
        self.target = None;
        self.in_pass = false;
    }

    fn upload_texture(&mut self, image: &DecalImage) -> Result<TextureHandle, CompositeError> {
        self.textures.push(Some(image.clone()));
        Ok(TextureHandle(self.textures.len() - 1))
    }

    fn release_texture(&mut self, handle: TextureHandle) -> bool {
        let released = self.textures.get_mut(handle.0).and_then(Option::take).is_some();
        if released {
            debug!("released decal texture #{}", handle.0);
        }
        released
    }

    fn begin_pass(&mut self) -> Result<(), CompositeError> {
        let target = self.target.as_mut().ok_or(CompositeError::NoTarget)?;
        target.fill(Vec4::ZERO);
        self.in_pass = true;
        Ok(())
    }

    fn draw_decal(&mut self, params: &DecalDrawParams) -> Result<(), CompositeError> {
        let decal = self
            .textures
            .get(params.texture.0)
            .and_then(Option::as_ref)
            .ok_or(CompositeError::UnknownTexture(params.texture))?;
        let reference = self.reference.as_ref().ok_or(CompositeError::MissingReferenceMaps)?;
        let target = self.target.as_mut().ok_or(CompositeError::NoTarget)?;
        if !self.in_pass {
            return Err(CompositeError::NoTarget);
        }

        let res = target.width();
        let tint = params.tint.to_vec4();
        for y in 0..res {
            for x in 0..res {
                let uv = Vec2::new((x as f32 + 0.5) / res as f32, (y as f32 + 0.5) / res as f32);
                let Some((position, normal)) = reference.lookup(uv) else {
                    continue;
                };
                let local = params.inverse_projection.transform_point3(position);
                let Some(decal_uv) = footprint_uv(local) else {
                    continue;
                };
                // Surfaces facing away from the projector stay untouched.
                if normal.length_squared() > 0.0 && normal.dot(params.projection_axis) >= 0.0 {
                    continue;
                }

                let mut src = decal.sample_bilinear(decal_uv) * tint;
                src.w *= params.opacity;
                let dst = target.get(x, y).unwrap_or(Vec4::ZERO);
                target.set(x, y, params.blend.blend(src, dst));
            }
        }
        Ok(())
    }

    fn end_pass(&mut self) -> Result<(), CompositeError> {
        if !self.in_pass {
            return Err(CompositeError::NoTarget);
        }
        self.in_pass = false;
        Ok(())
    }

    fn read_output(&mut self) -> Result<FloatImage, CompositeError> {
        self.target.clone().ok_or(CompositeError::NoTarget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::decal::{BlendMode, DecalRecord, projection::inverse_projection_matrix};
    use crate::math::Vec3;

    fn draw_params(record: &DecalRecord, texture: TextureHandle) -> DecalDrawParams {
        DecalDrawParams {
            texture,
            inverse_projection: inverse_projection_matrix(record),
            projection_axis: record.projection_direction.normalize(),
            opacity: record.opacity(),
            tint: record.tint,
            blend: record.blend_mode.factors(),
        }
    }

    fn backend() -> SoftwareBackend {
        let mut b = SoftwareBackend::new(ReferenceMaps::ground_plane(8, 2.0));
        b.create_target(8).unwrap();
        b
    }

    #[test]
    fn target_requires_reference_maps() {
        let mut b = SoftwareBackend::without_reference();
        assert!(matches!(b.create_target(4), Err(CompositeError::MissingReferenceMaps)));
        b.set_reference_maps(ReferenceMaps::ground_plane(4, 1.0));
        assert_eq!(b.create_target(4).unwrap().generation, 1);
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let mut b = SoftwareBackend::new(ReferenceMaps::ground_plane(4, 1.0));
        assert!(matches!(b.create_target(0), Err(CompositeError::InvalidResolution(0))));
    }

    #[test]
    fn decal_covers_only_its_footprint() {
        let mut b = backend();
        let red = b.upload_texture(&DecalImage::solid(2, 2, [255, 0, 0, 255])).unwrap();
        // Projector above the plane's -X/-Z quadrant, footprint 1x1.
        let record = DecalRecord::new("quadrant")
            .with_position(Vec3::new(-0.5, 0.05, -0.5))
            .with_size(0.99, 0.99)
            .with_texture(red);

        b.begin_pass().unwrap();
        b.draw_decal(&draw_params(&record, red)).unwrap();
        b.end_pass().unwrap();

        let out = b.output().unwrap();
        assert_eq!(out.get(0, 0).unwrap(), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(out.get(7, 7).unwrap(), Vec4::ZERO, "opposite corner untouched");
    }

    #[test]
    fn back_facing_surface_is_skipped() {
        let mut b = backend();
        let tex = b.upload_texture(&DecalImage::solid(1, 1, [255; 4])).unwrap();
        // Projector below the plane, pointing up: the plane's normal faces the
        // same way as the projection, so nothing is stamped.
        let record = DecalRecord::new("under")
            .with_position(Vec3::new(0.0, -0.05, 0.0))
            .with_direction(Vec3::Y)
            .with_size(4.0, 4.0)
            .with_texture(tex);

        b.begin_pass().unwrap();
        b.draw_decal(&draw_params(&record, tex)).unwrap();
        b.end_pass().unwrap();
        assert!(b.output().unwrap().pixels().iter().all(|p| *p == Vec4::ZERO));
    }

    #[test]
    fn opacity_and_tint_scale_source() {
        let mut b = backend();
        let tex = b.upload_texture(&DecalImage::solid(1, 1, [255; 4])).unwrap();
        let record = DecalRecord::new("faded")
            .with_position(Vec3::new(0.0, 0.05, 0.0))
            .with_size(4.0, 4.0)
            .with_opacity(0.5)
            .with_tint(Color::rgb(0.0, 1.0, 0.0))
            .with_blend_mode(BlendMode::AlphaBlend)
            .with_texture(tex);

        b.begin_pass().unwrap();
        b.draw_decal(&draw_params(&record, tex)).unwrap();
        b.end_pass().unwrap();

        let p = b.output().unwrap().get(3, 3).unwrap();
        // Over an empty layer: color·α, alpha·α.
        assert!((p - Vec4::new(0.0, 0.5, 0.0, 0.25)).length() < 1e-5, "got {p}");
    }

    #[test]
    fn unknown_texture_is_an_error() {
        let mut b = backend();
        let record = DecalRecord::new("ghost");
        b.begin_pass().unwrap();
        let err = b.draw_decal(&draw_params(&record, TextureHandle(42))).unwrap_err();
        assert!(matches!(err, CompositeError::UnknownTexture(TextureHandle(42))));
    }

    #[test]
    fn released_texture_is_freed_and_not_drawn() {
        let mut b = backend();
        let kept = b.upload_texture(&DecalImage::solid(1, 1, [255; 4])).unwrap();
        let gone = b.upload_texture(&DecalImage::solid(1, 1, [255; 4])).unwrap();
        assert_eq!(b.texture_count(), 2);

        assert!(b.release_texture(gone));
        assert!(!b.release_texture(gone), "second release is a no-op");
        assert!(!b.release_texture(TextureHandle(99)));
        assert_eq!(b.texture_count(), 1);

        let record = DecalRecord::new("stale");
        b.begin_pass().unwrap();
        assert!(matches!(
            b.draw_decal(&draw_params(&record, gone)),
            Err(CompositeError::UnknownTexture(h)) if h == gone
        ));
        assert!(b.draw_decal(&draw_params(&record, kept)).is_ok());

        let fresh = b.upload_texture(&DecalImage::solid(1, 1, [0; 4])).unwrap();
        assert_ne!(fresh, gone, "handles are not reused");
    }

    #[test]
    fn begin_pass_clears() {
        let mut b = backend();
        let tex = b.upload_texture(&DecalImage::solid(1, 1, [255; 4])).unwrap();
        let record = DecalRecord::new("full")
            .with_position(Vec3::new(0.0, 0.05, 0.0))
            .with_size(4.0, 4.0);
        b.begin_pass().unwrap();
        b.draw_decal(&draw_params(&record, tex)).unwrap();
        b.end_pass().unwrap();
        b.begin_pass().unwrap();
        b.end_pass().unwrap();
        assert!(b.read_output().unwrap().pixels().iter().all(|p| *p == Vec4::ZERO));
    }
}
