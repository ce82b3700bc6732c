//! # Math — Transforms, Rays, and Planes
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. On top of glam this module adds the handful of
//! primitives the decal and gizmo code share:
//!
//! - [`Transform`]: position, rotation, and scale, with `forward`/`right`/`up`
//!   accessors.
//! - [`look_rotation`]: build an orientation from a forward and an up vector,
//!   with deterministic fallbacks when the two are parallel.
//! - [`Ray`] and [`Plane`]: the picking and dragging primitives.
//!
//! ## Conventions
//!
//! Right-handed, Y up, forward is `-Z` (the same convention as
//! `Mat4::look_at_rh`). A rotation produced by [`look_rotation`] maps local
//! `-Z` to the requested forward direction and local `+Y` to the (corrected)
//! up vector:
//!
//! ```text
//!          +Y (up)
//!           │
//!           │
//!           o──── +X (right = forward × up)
//!          ╱
//!        ╱
//!     -Z (forward)
//! ```

pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

/// Smallest extent a projection volume may have along any axis.
///
/// Keeps TRS matrices invertible when a caller shrinks a decal to zero.
pub const MIN_EXTENT: f32 = 1e-4;

/// Squared length below which a cross product counts as "parallel".
const PARALLEL_EPSILON: f32 = 1e-8;

/// Normalize `v`, or return `fallback` if `v` is zero, tiny, or non-finite.
pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let len_sq = v.length_squared();
    if len_sq.is_finite() && len_sq > PARALLEL_EPSILON {
        v / len_sq.sqrt()
    } else {
        fallback
    }
}

/// Build a rotation whose local `-Z` points along `forward` and whose local
/// `+Y` is as close to `up` as possible.
///
/// A zero `forward` is replaced by `-Y`. If `up` is zero or parallel to
/// `forward`, the first of `+Y`, `+Z`, `+X` that is not parallel is used
/// instead, so the result is always a finite unit quaternion.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let f = normalize_or(forward, Vec3::NEG_Y);

    let right = [up, Vec3::Y, Vec3::Z, Vec3::X]
        .into_iter()
        .map(|candidate| f.cross(candidate))
        .find(|r| r.is_finite() && r.length_squared() > PARALLEL_EPSILON)
        .unwrap_or(Vec3::X)
        .normalize();
    let up = right.cross(f);

    Quat::from_mat3(&Mat3::from_cols(right, up, -f)).normalize()
}

// ── Transform ───────────────────────────────────────────────────────────

/// A 3D transform: position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform (origin, no rotation, uniform scale of 1).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a transform at the given position.
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self::from_translation(Vec3::new(x, y, z))
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Turn this transform to face `target`, keeping the given up vector.
    ///
    /// `Transform::from_xyz(0.0, 5.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y)`
    /// places a camera at (0,5,10) looking toward the origin.
    pub fn looking_at(mut self, target: Vec3, up: Vec3) -> Self {
        self.rotation = look_rotation(target - self.translation, up);
        self
    }

    /// Turn this transform to look along `direction`.
    pub fn looking_to(mut self, direction: Vec3, up: Vec3) -> Self {
        self.rotation = look_rotation(direction, up);
        self
    }

    /// Return a copy with uniform scale applied.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Local `-Z` in world space.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Local `+X` in world space.
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Local `+Y` in world space.
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Rotate about a world-space axis passing through the transform's origin.
    pub fn rotate_world_axis(&mut self, axis: Vec3, angle_radians: f32) {
        let axis = normalize_or(axis, Vec3::Y);
        self.rotation = (Quat::from_axis_angle(axis, angle_radians) * self.rotation).normalize();
    }

    /// Compute the 4x4 model matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ── Ray / Plane ─────────────────────────────────────────────────────────

/// A half-line starting at `origin`. `direction` is kept normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: normalize_or(direction, Vec3::NEG_Z),
        }
    }

    /// Point at distance `t` along the ray.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Express the ray in the local space described by `world_to_local`.
    ///
    /// The direction is *not* re-normalized, so hit distances measured in the
    /// local space stay comparable with world-space distances only when the
    /// transform has no scale. Callers that compare hits use the returned
    /// parameter on this ray, which is scale-independent.
    pub(crate) fn transformed(&self, world_to_local: &Mat4) -> Self {
        Self {
            origin: world_to_local.transform_point3(self.origin),
            direction: world_to_local.transform_vector3(self.direction),
        }
    }
}

/// An infinite plane through `point` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub point: Vec3,
}

impl Plane {
    pub fn new(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal: normalize_or(normal, Vec3::Y),
            point,
        }
    }

    /// Distance along `ray` to the plane, if the ray hits it in front of its
    /// origin. Rays parallel to the plane never hit.
    pub fn raycast(&self, ray: &Ray) -> Option<f32> {
        let denom = self.normal.dot(ray.direction);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = self.normal.dot(self.point - ray.origin) / denom;
        (t >= 0.0 && t.is_finite()).then_some(t)
    }

    /// Intersection point of `ray` with the plane.
    pub fn intersect(&self, ray: &Ray) -> Option<Vec3> {
        self.raycast(ray).map(|t| ray.at(t))
    }

    /// Closest point on the plane to `point`.
    pub fn project(&self, point: Vec3) -> Vec3 {
        point - self.normal * self.normal.dot(point - self.point)
    }
}

/// Wrap an angle difference in degrees into (-180, 180].
pub fn wrap_degrees(delta: f32) -> f32 {
    let mut d = delta % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn look_rotation_maps_neg_z_to_forward() {
        let dir = Vec3::new(1.0, -2.0, 0.5).normalize();
        let rot = look_rotation(dir, Vec3::Y);
        assert!(approx(rot * Vec3::NEG_Z, dir), "forward should follow dir");
        assert!((rot * Vec3::Y).dot(dir).abs() < 1e-5, "up should be orthogonal");
    }

    #[test]
    fn look_rotation_zero_forward_uses_down() {
        let rot = look_rotation(Vec3::ZERO, Vec3::Y);
        assert!(rot.is_finite());
        assert!(approx(rot * Vec3::NEG_Z, Vec3::NEG_Y));
    }

    #[test]
    fn look_rotation_parallel_up_falls_back() {
        let rot = look_rotation(Vec3::NEG_Y, Vec3::Y);
        assert!(rot.is_finite());
        assert!(approx(rot * Vec3::NEG_Z, Vec3::NEG_Y));
        // +Y is parallel, so +Z is the next candidate.
        assert!((rot * Vec3::Y).dot(Vec3::Z) > 0.99);
    }

    #[test]
    fn look_rotation_nan_input_is_safe() {
        let rot = look_rotation(Vec3::splat(f32::NAN), Vec3::splat(f32::NAN));
        assert!(rot.is_finite());
    }

    #[test]
    fn transform_axes_are_orthonormal() {
        let t = Transform::from_xyz(1.0, 2.0, 3.0).looking_at(Vec3::ZERO, Vec3::Y);
        assert!(t.forward().dot(t.right()).abs() < 1e-5);
        assert!(t.forward().dot(t.up()).abs() < 1e-5);
        assert!(approx(t.forward(), (-t.translation).normalize()));
    }

    #[test]
    fn rotate_world_axis_quarter_turn() {
        let mut t = Transform::IDENTITY;
        t.rotate_world_axis(Vec3::Y, std::f32::consts::FRAC_PI_2);
        // Rotating -Z by +90° about +Y gives -X.
        assert!(approx(t.forward(), Vec3::NEG_X));
    }

    #[test]
    fn plane_raycast_hits_in_front_only() {
        let plane = Plane::new(Vec3::Y, Vec3::ZERO);
        let down = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y);
        assert!((plane.raycast(&down).unwrap() - 5.0).abs() < 1e-5);

        let up = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::Y);
        assert!(plane.raycast(&up).is_none(), "plane behind the ray");

        let parallel = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::X);
        assert!(plane.raycast(&parallel).is_none());
    }

    #[test]
    fn wrap_degrees_picks_shortest_path() {
        assert!((wrap_degrees(-179.0 - 179.0) - 2.0).abs() < 1e-4);
        assert!((wrap_degrees(179.0 - -179.0) + 2.0).abs() < 1e-4);
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(-180.0), 180.0);
        assert!((wrap_degrees(10.0) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_or_rejects_degenerate() {
        assert_eq!(normalize_or(Vec3::ZERO, Vec3::X), Vec3::X);
        assert_eq!(normalize_or(Vec3::splat(f32::INFINITY), Vec3::X), Vec3::X);
        assert!(approx(normalize_or(Vec3::new(0.0, 3.0, 0.0), Vec3::X), Vec3::Y));
    }
}
