//! Draw lists the gizmos hand to the host renderer.

use crate::color::Color;
use crate::math::{Mat3, Mat4, Quat, Vec3};

use super::handle::HandleAxis;
use super::shapes::GizmoShape;

/// One mesh instance of the manipulation gizmo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleVisual {
    pub handle: HandleAxis,
    pub shape: GizmoShape,
    /// Shape space to world space.
    pub model: Mat4,
    pub color: Color,
    pub highlighted: bool,
}

/// Feedback for an active rotation drag: a pie slice in the ring plane from
/// `start_direction` sweeping `degrees` around `axis`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationArc {
    pub center: Vec3,
    pub axis: Vec3,
    pub start_direction: Vec3,
    /// Signed sweep in degrees, magnitude in `[0, 360)`.
    pub degrees: f32,
    /// World radius of the fan.
    pub radius: f32,
    pub color: Color,
}

impl RotationArc {
    /// Sweep for an accumulated rotation: magnitude wrapped below one full
    /// turn, sign kept.
    pub fn sweep(accumulated: f32) -> f32 {
        (accumulated.abs() % 360.0).copysign(accumulated)
    }

    /// Model matrix placing a [`GizmoShape::Square`] fan quad (unit square in
    /// XY) in the ring plane, `2 * radius` across, with its local +X along
    /// `start_direction`.
    pub fn model(&self) -> Mat4 {
        let x = self.start_direction;
        let z = self.axis;
        let y = z.cross(x);
        let rotation = Quat::from_mat3(&Mat3::from_cols(x, y, z));
        let scale = Vec3::new(2.0 * self.radius, 2.0 * self.radius, 1.0);
        Mat4::from_scale_rotation_translation(scale, rotation, self.center)
    }

    /// Point on the arc's outer edge at `fraction` of the sweep (0 = start).
    pub fn point_at(&self, fraction: f32) -> Vec3 {
        let angle = (self.degrees * fraction).to_radians();
        self.center + Quat::from_axis_angle(self.axis, angle) * self.start_direction * self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_wraps_and_keeps_sign() {
        assert_eq!(RotationArc::sweep(90.0), 90.0);
        assert_eq!(RotationArc::sweep(-450.0), -90.0);
        assert_eq!(RotationArc::sweep(720.0), 0.0);
    }

    #[test]
    fn arc_end_point_follows_the_sweep() {
        let arc = RotationArc {
            center: Vec3::ZERO,
            axis: Vec3::Z,
            start_direction: Vec3::X,
            degrees: 90.0,
            radius: 2.0,
            color: Color::YELLOW,
        };
        assert!((arc.point_at(1.0) - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);
        let corner = arc.model().transform_point3(Vec3::new(0.5, 0.0, 0.0));
        assert!((corner - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }
}
