//! # Gizmo — On-Screen Handles for Placing Decals
//!
//! Two controllers turn pointer drags into edits:
//!
//! - [`ManipulationGizmo`]: arrows, planes, and rings that translate or
//!   rotate any [`GizmoTarget`].
//! - [`ResizeHandles`]: edge and corner handles on a decal's footprint that
//!   change its width and height.
//!
//! Neither draws anything. Each step they read a [`Camera`](crate::camera::Camera)
//! and a [`Pointer`](crate::input::Pointer), edit their target, and expose a
//! draw list ([`HandleVisual`], [`ResizeVisual`]) built from the meshes in
//! [`shapes`].

mod config;
pub mod drag;
pub mod handle;
mod manipulator;
pub mod resize;
pub mod shapes;
mod visuals;

pub use config::{GizmoConfig, GizmoMode, GizmoSpace, ResizeConfig};
pub use handle::HandleAxis;
pub use manipulator::ManipulationGizmo;
pub use resize::{ResizeHandle, ResizeHandles, ResizePart, ResizeVisual};
pub use shapes::{GizmoShape, Mesh, MeshVertex};
pub use visuals::{HandleVisual, RotationArc};

use crate::decal::DecalSource;
use crate::math::{Quat, Transform, Vec3};

/// Something the manipulation gizmo can move.
pub trait GizmoTarget {
    fn position(&self) -> Vec3;
    fn rotation(&self) -> Quat;
    fn translate(&mut self, delta: Vec3);
    /// Rotate about a world-space axis through the target's position.
    fn rotate_world_axis(&mut self, axis: Vec3, angle_radians: f32);
}

impl GizmoTarget for Transform {
    fn position(&self) -> Vec3 {
        self.translation
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn translate(&mut self, delta: Vec3) {
        self.translation += delta;
    }

    fn rotate_world_axis(&mut self, axis: Vec3, angle_radians: f32) {
        Transform::rotate_world_axis(self, axis, angle_radians);
    }
}

impl GizmoTarget for DecalSource {
    fn position(&self) -> Vec3 {
        DecalSource::position(self)
    }

    fn rotation(&self) -> Quat {
        DecalSource::rotation(self)
    }

    fn translate(&mut self, delta: Vec3) {
        DecalSource::translate(self, delta);
    }

    fn rotate_world_axis(&mut self, axis: Vec3, angle_radians: f32) {
        DecalSource::rotate_world_axis(self, axis, angle_radians);
    }
}

/// What happened during a drag, for hosts that record undo steps or sync
/// other views.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GizmoEvent {
    BeginDrag(HandleAxis),
    /// World-space translation applied this step.
    Translated(Vec3),
    /// Rotation applied this step about a world axis.
    Rotated { axis: Vec3, degrees: f32 },
    EndDrag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decal_source_target_raises_change_flag() {
        let mut source = DecalSource::new("s");
        source.take_changes();
        GizmoTarget::translate(&mut source, Vec3::X);
        assert!(source.has_changes());
        assert_eq!(GizmoTarget::position(&source), Vec3::X);

        source.take_changes();
        GizmoTarget::rotate_world_axis(&mut source, Vec3::Y, std::f32::consts::FRAC_PI_2);
        assert!(source.has_changes());
    }
}
