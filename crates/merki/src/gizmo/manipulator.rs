//! # Manipulation Gizmo — Translate and Rotate by Dragging Handles
//!
//! The gizmo sits on its target, keeps a constant size on screen, and turns
//! pointer drags into translations or rotations of the target.
//!
//! ## How It Works
//!
//! Each [`step`](ManipulationGizmo::step) runs in a fixed order:
//!
//! ```text
//!   1. sync     origin ← target position
//!               orientation ← target rotation (Local) or identity (Global)
//!               scale ← screen-constant size at the origin
//!   2. input    dragging?  pointer up → end drag
//!                          otherwise  → project ray onto drag plane, apply delta
//!               idle?      pointer down on a handle → begin drag
//!                          otherwise → hover highlight
//! ```
//!
//! Syncing before input means picks always test the handles where they are
//! drawn this frame.
//!
//! ## Translation
//!
//! A single-axis drag projects the pointer onto a plane that contains the
//! axis and faces the camera; the movement is then projected onto the axis.
//! A planar drag uses the handle's own plane. Deltas are incremental: each
//! step moves the target by the distance since the previous step.
//!
//! ## Rotation
//!
//! The pointer is projected onto the ring's plane and converted to an angle.
//! The target rotates about the world-space ring axis by the wrapped change
//! in angle, and the running total drives the [`RotationArc`] feedback.
//!
//! ## Comparison
//!
//! - **Unity**: `Handles.PositionHandle` / `Handles.RotationHandle` in the
//!   editor; same axis, plane, and ring layout.
//! - **Blender**: the transform gizmo adds view-plane and trackball handles
//!   on top of the same idea.

use log::{debug, trace};

use crate::camera::Camera;
use crate::input::Pointer;
use crate::math::{Mat3, Mat4, Quat, Ray, Vec3};

use super::config::{GizmoConfig, GizmoMode, GizmoSpace};
use super::drag::{DragSession, DragStep};
use super::handle::{pick, HandleAxis};
use super::shapes::GizmoShape;
use super::visuals::{HandleVisual, RotationArc};
use super::{GizmoEvent, GizmoTarget};

/// Translate/rotate controller for one target at a time.
#[derive(Debug, Clone)]
pub struct ManipulationGizmo {
    config: GizmoConfig,
    origin: Vec3,
    orientation: Quat,
    scale: f32,
    hovered: Option<HandleAxis>,
    session: Option<DragSession>,
    events: Vec<GizmoEvent>,
}

impl Default for ManipulationGizmo {
    fn default() -> Self {
        Self::new(GizmoConfig::default())
    }
}

impl ManipulationGizmo {
    pub fn new(config: GizmoConfig) -> Self {
        Self {
            config,
            origin: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: 1.0,
            hovered: None,
            session: None,
            events: Vec::new(),
        }
    }

    // ── Mode / space ────────────────────────────────────────────────────

    pub fn mode(&self) -> GizmoMode {
        self.config.mode
    }

    pub fn space(&self) -> GizmoSpace {
        self.config.space
    }

    /// Switch between translation and rotation. Ends any active drag.
    pub fn set_mode(&mut self, mode: GizmoMode) {
        if mode != self.config.mode {
            self.end_drag();
            self.hovered = None;
            self.config.mode = mode;
        }
    }

    /// Switch between world and target-local axes. Ends any active drag.
    pub fn set_space(&mut self, space: GizmoSpace) {
        if space != self.config.space {
            self.end_drag();
            self.config.space = space;
        }
    }

    pub fn config(&self) -> &GizmoConfig {
        &self.config
    }

    /// Replace the configuration. Mode and space go through
    /// [`set_mode`](Self::set_mode) / [`set_space`](Self::set_space).
    pub fn set_config(&mut self, config: GizmoConfig) {
        self.set_mode(config.mode);
        self.set_space(config.space);
        self.config = config;
    }

    // ── Frame update ────────────────────────────────────────────────────

    /// Run one frame: follow the target, then handle the pointer.
    pub fn step(&mut self, camera: &Camera, pointer: &Pointer, target: &mut impl GizmoTarget) {
        self.sync_to(camera, target);

        let ray = camera.screen_point_to_ray(pointer.cursor.to_vec2());

        if self.session.is_some() {
            if !pointer.primary_pressed() {
                self.end_drag();
                return;
            }
            self.drag(&ray, target);
            return;
        }

        let hit = pick(&ray, &self.model(), self.config.mode, &self.config).map(|(handle, _)| handle);
        if pointer.primary_just_pressed() {
            if let Some(handle) = hit {
                self.begin_drag(handle, camera, &ray);
            }
        } else {
            if hit != self.hovered {
                trace!("gizmo hover: {:?}", hit);
            }
            self.hovered = hit;
        }
    }

    /// Move the gizmo onto the target and recompute its on-screen scale.
    pub fn sync_to(&mut self, camera: &Camera, target: &impl GizmoTarget) {
        self.origin = target.position();
        self.orientation = match self.config.space {
            GizmoSpace::Global => Quat::IDENTITY,
            GizmoSpace::Local => target.rotation(),
        };
        self.scale = camera.screen_constant_scale(self.origin, self.config.screen_size_coefficient);
    }

    fn begin_drag(&mut self, handle: HandleAxis, camera: &Camera, ray: &Ray) {
        let direction = self.orientation * handle.direction();
        let session = match self.config.mode {
            GizmoMode::Translation => DragSession::translate(handle, self.origin, direction, camera, ray),
            GizmoMode::Rotation => DragSession::rotate(handle, self.origin, direction, ray),
        };
        match session {
            Some(session) => {
                debug!("gizmo: begin {:?} drag on {:?}", self.config.mode, handle);
                self.hovered = None;
                self.session = Some(session);
                self.events.push(GizmoEvent::BeginDrag(handle));
            }
            None => debug!("gizmo: {:?} hit but pointer ray misses its drag plane", handle),
        }
    }

    fn drag(&mut self, ray: &Ray, target: &mut impl GizmoTarget) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.step(ray) {
            Some(DragStep::Translate(delta)) => {
                target.translate(delta);
                self.origin += delta;
                self.events.push(GizmoEvent::Translated(delta));
            }
            Some(DragStep::Rotate { axis, degrees }) => {
                target.rotate_world_axis(axis, degrees.to_radians());
                self.events.push(GizmoEvent::Rotated { axis, degrees });
            }
            None => {}
        }
    }

    /// Stop the active drag, if any. Clears highlight and the rotation arc.
    pub fn end_drag(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("gizmo: end drag on {:?}", session.handle());
            self.events.push(GizmoEvent::EndDrag);
        }
        self.hovered = None;
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Handle being dragged.
    pub fn active(&self) -> Option<HandleAxis> {
        self.session.as_ref().map(DragSession::handle)
    }

    /// Handle under the pointer while idle.
    pub fn hovered(&self) -> Option<HandleAxis> {
        self.hovered
    }

    /// Events since the last drain, oldest first.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GizmoEvent> {
        self.events.drain(..)
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// World size of one gizmo unit this frame.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Gizmo space to world space.
    pub fn model(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.orientation, self.origin)
    }

    /// Rotation feedback while a ring is being dragged.
    pub fn arc(&self) -> Option<RotationArc> {
        let (axis, start_direction, accumulated) = self.session.as_ref()?.rotation_progress()?;
        Some(RotationArc {
            center: self.origin,
            axis,
            start_direction,
            degrees: RotationArc::sweep(accumulated),
            radius: self.config.rotation_radius * self.scale,
            color: self.config.arc_color,
        })
    }

    /// Everything to draw this frame, in handle order.
    pub fn visuals(&self) -> Vec<HandleVisual> {
        let model = self.model();
        let lit = self.active().or(self.hovered);
        let c = &self.config;
        let mut out = Vec::new();

        for &handle in HandleAxis::for_mode(c.mode) {
            let highlighted = lit == Some(handle);
            let color = if highlighted {
                c.highlight_color.with_alpha(handle.color(c).a)
            } else {
                handle.color(c)
            };
            let mut push = |shape: GizmoShape, local: Mat4| {
                out.push(HandleVisual {
                    handle,
                    shape,
                    model: model * local,
                    color,
                    highlighted,
                });
            };

            let dir = handle.direction();
            match (c.mode, handle.is_planar()) {
                (GizmoMode::Translation, false) => {
                    let onto_axis = Mat4::from_quat(Quat::from_rotation_arc(Vec3::Y, dir));
                    push(
                        GizmoShape::Cylinder {
                            radius: c.axis_radius,
                            height: c.axis_length,
                        },
                        onto_axis,
                    );
                    push(
                        GizmoShape::Cone {
                            radius: c.arrow_radius,
                            height: c.arrow_height,
                        },
                        Mat4::from_translation(dir * c.axis_length) * onto_axis,
                    );
                }
                (GizmoMode::Translation, true) => {
                    let (a, b) = handle.plane_axes().unwrap_or((Vec3::X, Vec3::Y));
                    let into_plane = Mat4::from_mat3(Mat3::from_cols(a, b, a.cross(b)));
                    push(
                        GizmoShape::Quad {
                            offset: c.plane_offset,
                            size: c.plane_size,
                        },
                        into_plane,
                    );
                }
                (GizmoMode::Rotation, _) => {
                    push(
                        GizmoShape::Torus {
                            radius: c.rotation_radius,
                            thickness: c.rotation_thickness,
                        },
                        Mat4::from_quat(Quat::from_rotation_arc(Vec3::Y, dir)),
                    );
                }
            }
        }
        out
    }
}
