//! # Handles — What Can Be Grabbed, and Where
//!
//! A [`HandleAxis`] names one grabbable part of the
//! [`ManipulationGizmo`](super::ManipulationGizmo). Translation mode shows all
//! six, rotation mode shows the three single axes as rings.
//!
//! ## Collision Volumes
//!
//! Hit tests run in gizmo-local space: the pointer ray is carried through the
//! inverse of the gizmo's model matrix (origin, orientation, screen-constant
//! scale), so every volume below is described in fixed gizmo units.
//!
//! ```text
//!   axis      box centered at dir·len/2, (len + arrow) long, 2·arrow_r wide
//!   plane     square [off, off+size]² in the handle's plane
//!   ring      tube of radius max(thickness, tolerance) around the circle R
//! ```
//!
//! Rings are hit as solid tubes, so a ring seen edge-on is still grabbable
//! along the line it is drawn as. The tube is found by sphere tracing its
//! distance function.
//!
//! The local ray keeps its world parameterization (the direction is not
//! re-normalized), so hit distances from different handles compare directly
//! and the nearest hit wins. Equal distances resolve to the handle listed
//! first.

use crate::color::Color;
use crate::math::{Mat4, Plane, Ray, Vec2, Vec3};

use super::config::{GizmoConfig, GizmoMode};

/// Iteration cap for ring sphere tracing.
const RING_MARCH_STEPS: usize = 128;
/// Distance under which a traced point counts as on the ring tube.
const RING_HIT_EPSILON: f32 = 1e-4;

/// One grabbable part of the manipulation gizmo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleAxis {
    X,
    Y,
    Z,
    XY,
    XZ,
    YZ,
}

impl HandleAxis {
    /// Handles shown in translation mode, in pick order.
    pub const TRANSLATION: [HandleAxis; 6] = [
        HandleAxis::X,
        HandleAxis::Y,
        HandleAxis::Z,
        HandleAxis::XY,
        HandleAxis::XZ,
        HandleAxis::YZ,
    ];

    /// Handles shown in rotation mode, in pick order.
    pub const ROTATION: [HandleAxis; 3] = [HandleAxis::X, HandleAxis::Y, HandleAxis::Z];

    /// The handles a mode exposes.
    pub fn for_mode(mode: GizmoMode) -> &'static [HandleAxis] {
        match mode {
            GizmoMode::Translation => &Self::TRANSLATION,
            GizmoMode::Rotation => &Self::ROTATION,
        }
    }

    pub fn is_planar(self) -> bool {
        matches!(self, HandleAxis::XY | HandleAxis::XZ | HandleAxis::YZ)
    }

    /// Gizmo-local direction: the axis itself for X/Y/Z, the plane normal
    /// for the planar handles (XY→Z, XZ→Y, YZ→X).
    pub fn direction(self) -> Vec3 {
        match self {
            HandleAxis::X | HandleAxis::YZ => Vec3::X,
            HandleAxis::Y | HandleAxis::XZ => Vec3::Y,
            HandleAxis::Z | HandleAxis::XY => Vec3::Z,
        }
    }

    /// The two in-plane axes of a planar handle.
    pub fn plane_axes(self) -> Option<(Vec3, Vec3)> {
        match self {
            HandleAxis::XY => Some((Vec3::X, Vec3::Y)),
            HandleAxis::XZ => Some((Vec3::X, Vec3::Z)),
            HandleAxis::YZ => Some((Vec3::Y, Vec3::Z)),
            _ => None,
        }
    }

    /// Resting color. Planar handles take their normal axis' color at
    /// `plane_alpha`.
    pub fn color(self, config: &GizmoConfig) -> Color {
        let base = match self.direction() {
            d if d == Vec3::X => config.x_color,
            d if d == Vec3::Y => config.y_color,
            _ => config.z_color,
        };
        if self.is_planar() {
            base.with_alpha(config.plane_alpha)
        } else {
            base
        }
    }

    /// Ray parameter of the hit against this handle's volume, if any.
    /// `ray` must already be in gizmo-local space.
    pub fn hit(self, mode: GizmoMode, ray: &Ray, config: &GizmoConfig) -> Option<f32> {
        match (mode, self.plane_axes()) {
            (GizmoMode::Rotation, _) => hit_ring(ray, self.direction(), config),
            (GizmoMode::Translation, Some(axes)) => hit_plane(ray, self.direction(), axes, config),
            (GizmoMode::Translation, None) => hit_axis(ray, self.direction(), config),
        }
    }
}

/// Nearest handle of `mode` under a world-space `ray`, with its ray
/// parameter. `gizmo_to_world` is the gizmo's model matrix. A collapsed
/// gizmo (zero or non-finite scale) has nothing to pick.
pub fn pick(
    ray: &Ray,
    gizmo_to_world: &Mat4,
    mode: GizmoMode,
    config: &GizmoConfig,
) -> Option<(HandleAxis, f32)> {
    let det = gizmo_to_world.determinant();
    if !det.is_finite() || det.abs() <= f32::EPSILON {
        return None;
    }
    let local = ray.transformed(&gizmo_to_world.inverse());
    if !(local.origin.is_finite() && local.direction.is_finite()) {
        return None;
    }
    let mut best: Option<(HandleAxis, f32)> = None;
    for &handle in HandleAxis::for_mode(mode) {
        if let Some(t) = handle.hit(mode, &local, config) {
            if best.is_none_or(|(_, best_t)| t < best_t) {
                best = Some((handle, t));
            }
        }
    }
    best
}

// ── Volumes ─────────────────────────────────────────────────────────────

fn hit_axis(ray: &Ray, dir: Vec3, config: &GizmoConfig) -> Option<f32> {
    let center = dir * (config.axis_length * 0.5);
    let along = (config.axis_length + config.arrow_height) * 0.5;
    let across = config.arrow_radius;
    let half = dir * along + (Vec3::ONE - dir) * across;
    ray_aabb(ray, center - half, center + half)
}

fn hit_plane(ray: &Ray, normal: Vec3, (a, b): (Vec3, Vec3), config: &GizmoConfig) -> Option<f32> {
    let t = Plane::new(normal, Vec3::ZERO).raycast(ray)?;
    let p = ray.at(t);
    let lo = config.plane_offset;
    let hi = config.plane_offset + config.plane_size;
    let inside = |v: f32| (lo..=hi).contains(&v);
    (inside(p.dot(a)) && inside(p.dot(b))).then_some(t)
}

fn hit_ring(ray: &Ray, normal: Vec3, config: &GizmoConfig) -> Option<f32> {
    let scale = ray.direction.length();
    if scale <= f32::EPSILON {
        return None;
    }
    let dir = ray.direction / scale;
    let radius = config.rotation_radius;
    let tube = config.rotation_thickness.max(config.pick_tolerance);
    let distance = |p: Vec3| {
        let height = p.dot(normal);
        let planar = (p - normal * height).length();
        Vec2::new(planar - radius, height).length() - tube
    };

    // Past this the ray is outside the ring's bounding sphere for good.
    let limit = ray.origin.length() + radius + tube;
    let mut s = 0.0;
    for _ in 0..RING_MARCH_STEPS {
        let d = distance(ray.origin + dir * s);
        if d <= RING_HIT_EPSILON {
            return Some(s / scale);
        }
        s += d;
        if s > limit {
            return None;
        }
    }
    None
}

/// Slab test. Returns the entry parameter, or 0 when the ray starts inside.
pub(crate) fn ray_aabb(ray: &Ray, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_near = 0.0_f32;
    let mut t_far = f32::INFINITY;
    for i in 0..3 {
        let o = ray.origin[i];
        let d = ray.direction[i];
        if d.abs() < 1e-12 {
            if o < min[i] || o > max[i] {
                return None;
            }
            continue;
        }
        let t0 = (min[i] - o) / d;
        let t1 = (max[i] - o) / d;
        t_near = t_near.max(t0.min(t1));
        t_far = t_far.min(t0.max(t1));
        if t_near > t_far {
            return None;
        }
    }
    Some(t_near)
}

/// Nearest non-negative hit of a ray with a sphere.
pub(crate) fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let a = ray.direction.length_squared();
    if a <= f32::EPSILON {
        return None;
    }
    let b = oc.dot(ray.direction);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt = disc.sqrt();
    let near = (-b - sqrt) / a;
    let far = (-b + sqrt) / a;
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        Some(0.0)
    } else {
        None
    }
}
