//! # Projection — Decal Volumes and Inverse-Projection Sampling
//!
//! A decal is a box-shaped projector. Its transform is
//!
//! ```text
//!   TRS( world_position,
//!        look_rotation(projection_direction, up_vector),
//!        (width, height, depth) )
//! ```
//!
//! which maps the unit volume below into world space:
//!
//! ```text
//!        +Y (up)
//!         │   ┌───────┐
//!         │   │ image │  x, y ∈ [-0.5, 0.5]
//!         o───┼───────┼── +X
//!        ╱    └───────┘
//!      ╱
//!   -Z (projection direction), −z ∈ [0, 1]
//! ```
//!
//! Compositing runs the other way: for every texel of the surface we know its
//! position (from the reference position map), push it through the *inverse*
//! of this transform, and keep it only if it lands inside the unit volume.
//! The local x/y then become the decal image's UVs.
//!
//! Degenerate input never produces NaN: a zero direction falls back to `-Y`,
//! a parallel up vector falls back through [`look_rotation`], and every extent
//! is clamped to [`MIN_EXTENT`] so the matrix stays invertible.

use crate::decal::DecalRecord;
use crate::math::{look_rotation, normalize_or, Mat4, Quat, Vec2, Vec3, MIN_EXTENT};

/// Slack on the depth range, in local units, so points lying exactly on the
/// projector plane are not lost to rounding.
const DEPTH_SLACK: f32 = 1e-4;

/// A resolved projection volume: origin, orientation, and extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionVolume {
    pub position: Vec3,
    pub rotation: Quat,
    /// (width, height, depth), each at least [`MIN_EXTENT`].
    pub extents: Vec3,
}

impl ProjectionVolume {
    pub fn new(position: Vec3, direction: Vec3, up: Vec3, size: Vec2, depth: f32) -> Self {
        let clamp = |v: f32| if v.is_finite() { v.max(MIN_EXTENT) } else { MIN_EXTENT };
        let extents = Vec3::new(clamp(size.x), clamp(size.y), clamp(depth));
        Self {
            position: if position.is_finite() { position } else { Vec3::ZERO },
            rotation: look_rotation(direction, up),
            extents,
        }
    }

    /// Volume of a record in world space.
    pub fn from_record(record: &DecalRecord) -> Self {
        Self::new(
            record.world_position,
            record.projection_direction,
            record.up_vector,
            record.size,
            record.projection_depth,
        )
    }

    /// Volume of a record expressed in a surface's local frame.
    ///
    /// `world_to_surface` is the inverse of the surface's model matrix. Points
    /// go through it as points and directions as vectors. A direction that
    /// collapses to zero in the surface frame keeps its world value. Each
    /// extent is rescaled by how much the frame stretches the volume's axis
    /// along it, so the footprint covers the same surface area as in world
    /// space.
    pub fn from_record_in(record: &DecalRecord, world_to_surface: Option<&Mat4>) -> Self {
        let world = Self::from_record(record);
        let Some(m) = world_to_surface else {
            return world;
        };
        let world_dir = world.axis();
        let world_up = world.rotation * Vec3::Y;
        let world_right = world.rotation * Vec3::X;
        let stretch = |axis: Vec3| {
            let len = m.transform_vector3(axis).length();
            if len.is_finite() && len > f32::EPSILON { len } else { 1.0 }
        };
        let extents = world.extents * Vec3::new(stretch(world_right), stretch(world_up), stretch(world_dir));
        Self::new(
            m.transform_point3(world.position),
            normalize_or(m.transform_vector3(world_dir), world_dir),
            normalize_or(m.transform_vector3(world_up), world_up),
            extents.truncate(),
            extents.z,
        )
    }

    /// Unit direction the volume projects along.
    pub fn axis(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Decal-local to world (or surface) space.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.extents, self.rotation, self.position)
    }

    /// World (or surface) space to decal-local space.
    pub fn inverse(&self) -> Mat4 {
        // Built from the factors instead of a general 4x4 inverse.
        let inv_rot = self.rotation.conjugate();
        Mat4::from_scale(self.extents.recip())
            * Mat4::from_quat(inv_rot)
            * Mat4::from_translation(-self.position)
    }
}

/// Projection matrix of a record (decal-local to world).
pub fn projection_matrix(record: &DecalRecord) -> Mat4 {
    ProjectionVolume::from_record(record).matrix()
}

/// Inverse projection matrix of a record (world to decal-local).
pub fn inverse_projection_matrix(record: &DecalRecord) -> Mat4 {
    ProjectionVolume::from_record(record).inverse()
}

/// Decal UV of a decal-local point, or `None` outside the projection volume.
///
/// `u = x + 0.5` runs left to right; `v = 0.5 - y` runs top to bottom so that
/// image row 0 is the decal's top edge.
pub fn footprint_uv(local: Vec3) -> Option<Vec2> {
    let depth = -local.z;
    let inside = local.x.abs() <= 0.5
        && local.y.abs() <= 0.5
        && (-DEPTH_SLACK..=1.0 + DEPTH_SLACK).contains(&depth);
    inside.then(|| Vec2::new(local.x + 0.5, 0.5 - local.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_mat(a: Mat4, b: Mat4, eps: f32) -> bool {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .all(|(x, y)| (x - y).abs() < eps)
    }

    #[test]
    fn inverse_times_projection_is_identity() {
        let records = [
            DecalRecord::new("a"),
            DecalRecord::new("b")
                .with_position(Vec3::new(1.0, 2.0, -3.0))
                .with_direction(Vec3::new(0.3, -1.0, 0.2))
                .with_up(Vec3::Z)
                .with_size(0.5, 0.25)
                .with_depth(0.4),
            DecalRecord::new("c")
                .with_direction(Vec3::X)
                .with_size(2.0, 3.0),
        ];
        for r in &records {
            let product = inverse_projection_matrix(r) * projection_matrix(r);
            assert!(approx_mat(product, Mat4::IDENTITY, 1e-4), "{}: {product}", r.name);
        }
    }

    #[test]
    fn zero_direction_falls_back_without_nan() {
        let r = DecalRecord::new("zero").with_direction(Vec3::ZERO);
        let m = projection_matrix(&r);
        let inv = inverse_projection_matrix(&r);
        assert!(m.is_finite() && inv.is_finite());
        let volume = ProjectionVolume::from_record(&r);
        assert!((volume.axis() - Vec3::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn up_parallel_to_direction_is_safe() {
        let r = DecalRecord::new("parallel")
            .with_direction(Vec3::Y)
            .with_up(Vec3::Y);
        assert!(projection_matrix(&r).is_finite());
        assert!(inverse_projection_matrix(&r).is_finite());
    }

    #[test]
    fn zero_size_stays_invertible() {
        let r = DecalRecord::new("flat").with_size(0.0, 0.0).with_depth(0.0);
        let inv = inverse_projection_matrix(&r);
        assert!(inv.is_finite());
    }

    #[test]
    fn point_below_downward_decal_maps_into_footprint() {
        let r = DecalRecord::new("down")
            .with_position(Vec3::new(0.0, 1.0, 0.0))
            .with_up(Vec3::NEG_Z)
            .with_size(1.0, 1.0)
            .with_depth(2.0);
        let inv = inverse_projection_matrix(&r);

        let center = inv.transform_point3(Vec3::new(0.0, 0.5, 0.0));
        let uv = footprint_uv(center).unwrap();
        assert!((uv - Vec2::splat(0.5)).length() < 1e-5);

        // Above the projector plane: outside.
        let above = inv.transform_point3(Vec3::new(0.0, 1.5, 0.0));
        assert!(footprint_uv(above).is_none());

        // Past the far end of the volume: outside.
        let far = inv.transform_point3(Vec3::new(0.0, -1.5, 0.0));
        assert!(footprint_uv(far).is_none());

        // Up is -Z, so a point toward -Z lands in the top rows of the image.
        let top = inv.transform_point3(Vec3::new(0.0, 0.5, -0.4));
        let uv = footprint_uv(top).unwrap();
        assert!(uv.y < 0.2, "v should be near the top edge, got {}", uv.y);
    }

    #[test]
    fn surface_frame_moves_the_volume() {
        let r = DecalRecord::new("framed").with_position(Vec3::new(5.0, 0.0, 0.0));
        let surface = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let world_to_surface = surface.inverse();
        let volume = ProjectionVolume::from_record_in(&r, Some(&world_to_surface));
        assert!(volume.position.length() < 1e-5);
        assert!((volume.axis() - Vec3::NEG_Y).length() < 1e-5);
        assert_eq!(volume.extents, ProjectionVolume::from_record(&r).extents);
    }

    #[test]
    fn scaled_surface_frame_rescales_extents() {
        let r = DecalRecord::new("scaled")
            .with_position(Vec3::new(2.0, 1.0, 0.0))
            .with_size(1.0, 0.5)
            .with_depth(2.0);
        // Surface stretched 2× along X and 4× along Y (the projection axis).
        let surface = Mat4::from_scale(Vec3::new(2.0, 4.0, 1.0));
        let volume = ProjectionVolume::from_record_in(&r, Some(&surface.inverse()));

        assert!((volume.position - Vec3::new(1.0, 0.25, 0.0)).length() < 1e-5);
        assert!((volume.axis() - Vec3::NEG_Y).length() < 1e-5);
        // Default record projects along −Y with right = −X and up = +Z.
        assert!((volume.extents - Vec3::new(0.5, 0.5, 0.5)).length() < 1e-5, "got {}", volume.extents);

        // The world-space edge still lands on the local volume's edge.
        let world_corner = Vec3::new(2.5, 1.0, 0.0);
        let local = volume.inverse().transform_point3(surface.inverse().transform_point3(world_corner));
        assert!((local.x.abs() - 0.5).abs() < 1e-5, "got {local}");
    }
}
