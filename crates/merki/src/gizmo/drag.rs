//! Per-drag state for the manipulation gizmo.
//!
//! A [`DragSession`] exists from pointer-down on a handle until pointer-up (or
//! a forced mode/space switch). It remembers the plane the pointer ray is
//! projected onto and the last value seen on it, so every step produces an
//! incremental delta.

use log::trace;

use crate::camera::Camera;
use crate::math::{normalize_or, wrap_degrees, Plane, Ray, Vec3};

use super::handle::HandleAxis;

/// Smallest translation step applied to the target.
pub const MIN_TRANSLATION_STEP: f32 = 1e-4;
/// Smallest rotation step applied to the target, in degrees.
pub const MIN_ROTATION_STEP: f32 = 1e-3;
/// Squared length under which a candidate drag-plane normal is rejected.
const DEGENERATE_NORMAL_SQ: f32 = 1e-3;

/// What one drag step did to the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragStep {
    /// World-space translation to apply.
    Translate(Vec3),
    /// Rotation about a world axis, in degrees.
    Rotate { axis: Vec3, degrees: f32 },
}

#[derive(Debug, Clone, PartialEq)]
enum DragKind {
    Translate {
        /// World direction for single-axis handles; `None` for planar ones.
        axis: Option<Vec3>,
        last_point: Vec3,
    },
    Rotate {
        axis: Vec3,
        last_angle: f32,
        accumulated: f32,
        start_direction: Vec3,
    },
}

/// State of an active drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    handle: HandleAxis,
    plane: Plane,
    kind: DragKind,
}

impl DragSession {
    /// Start a translation drag. `direction` is the handle's world direction
    /// (the axis, or the plane normal for planar handles). Returns `None`
    /// when the pointer ray misses the drag plane.
    pub fn translate(
        handle: HandleAxis,
        origin: Vec3,
        direction: Vec3,
        camera: &Camera,
        ray: &Ray,
    ) -> Option<Self> {
        let (axis, normal) = if handle.is_planar() {
            (None, direction)
        } else {
            (Some(direction), axis_drag_normal(direction, origin, camera))
        };
        let plane = Plane::new(normal, origin);
        let last_point = plane.intersect(ray)?;
        Some(Self {
            handle,
            plane,
            kind: DragKind::Translate { axis, last_point },
        })
    }

    /// Start a rotation drag about the world `axis` through `origin`.
    pub fn rotate(handle: HandleAxis, origin: Vec3, axis: Vec3, ray: &Ray) -> Option<Self> {
        let plane = Plane::new(axis, origin);
        let hit = ring_point(&plane, ray)?;
        Some(Self {
            handle,
            plane,
            kind: DragKind::Rotate {
                axis: plane.normal,
                last_angle: plane_angle(&plane, hit),
                accumulated: 0.0,
                start_direction: normalize_or(hit - origin, perpendicular(plane.normal)),
            },
        })
    }

    pub fn handle(&self) -> HandleAxis {
        self.handle
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Advance with the current pointer ray. Returns the change to apply to
    /// the target, or `None` when the ray misses the plane or the change is
    /// below the step threshold.
    pub fn step(&mut self, ray: &Ray) -> Option<DragStep> {
        let point = match self.kind {
            DragKind::Translate { .. } => self.plane.intersect(ray)?,
            DragKind::Rotate { .. } => ring_point(&self.plane, ray)?,
        };
        match &mut self.kind {
            DragKind::Translate { axis, last_point } => {
                let mut delta = point - *last_point;
                if let Some(axis) = axis {
                    delta = *axis * delta.dot(*axis);
                }
                *last_point = point;
                (delta.length() > MIN_TRANSLATION_STEP).then_some(DragStep::Translate(delta))
            }
            DragKind::Rotate {
                axis,
                last_angle,
                accumulated,
                ..
            } => {
                let angle = plane_angle(&self.plane, point);
                let delta = wrap_degrees(angle - *last_angle);
                *last_angle = angle;
                if delta.abs() > MIN_ROTATION_STEP {
                    *accumulated -= delta;
                    trace!("rotate {:?}: {:.3}° (total {:.3}°)", self.handle, -delta, accumulated);
                    Some(DragStep::Rotate {
                        axis: *axis,
                        degrees: -delta,
                    })
                } else {
                    None
                }
            }
        }
    }

    /// For rotation drags: the world axis, the direction of the first hit,
    /// and the accumulated angle in degrees.
    pub fn rotation_progress(&self) -> Option<(Vec3, Vec3, f32)> {
        match self.kind {
            DragKind::Rotate {
                axis,
                accumulated,
                start_direction,
                ..
            } => Some((axis, start_direction, accumulated)),
            DragKind::Translate { .. } => None,
        }
    }
}

/// Normal of the plane a single-axis drag projects onto: contains the axis
/// and faces the camera as much as possible.
pub fn axis_drag_normal(axis: Vec3, origin: Vec3, camera: &Camera) -> Vec3 {
    let to_camera = normalize_or(camera.position() - origin, camera.transform.forward() * -1.0);
    let candidates = [
        axis.cross(to_camera.cross(axis)),
        axis.cross(camera.transform.up()),
        axis.cross(camera.transform.right()),
    ];
    candidates
        .into_iter()
        .find(|n| n.length_squared() >= DEGENERATE_NORMAL_SQ)
        .map(Vec3::normalize)
        .unwrap_or_else(|| perpendicular(axis))
}

/// Angle of `point` around the plane's normal, in degrees, measured in a
/// fixed in-plane basis (`right = n × Y`, or `n × X` when `n` is vertical).
pub fn plane_angle(plane: &Plane, point: Vec3) -> f32 {
    let n = plane.normal;
    let mut right = n.cross(Vec3::Y);
    if right.length_squared() < DEGENERATE_NORMAL_SQ {
        right = n.cross(Vec3::X);
    }
    let right = right.normalize();
    let up = right.cross(n);
    let v = point - plane.point;
    v.dot(up).atan2(v.dot(right)).to_degrees()
}

/// Where the pointer ray meets a ring's plane. A ray lying in the plane
/// (ring seen edge-on) uses its closest approach to the ring center instead.
fn ring_point(plane: &Plane, ray: &Ray) -> Option<Vec3> {
    plane.intersect(ray).or_else(|| {
        let along = (plane.point - ray.origin).dot(ray.direction).max(0.0);
        let point = plane.project(ray.at(along));
        ((point - plane.point).length_squared() > f32::EPSILON).then_some(point)
    })
}

fn perpendicular(v: Vec3) -> Vec3 {
    normalize_or(v.any_orthonormal_vector(), Vec3::X)
}
