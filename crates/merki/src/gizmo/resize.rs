//! # Resize Handles — Changing a Decal's Footprint by Dragging
//!
//! Eight handles sit on the outline of a decal's footprint. Edge handles
//! change one dimension, corner handles scale both.
//!
//! ```text
//!        TopLeft ───── Top ───── TopRight
//!           │                       │
//!         Left          ●         Right        ● = decal position
//!           │                       │
//!     BottomLeft ──── Bottom ──── BottomRight
//! ```
//!
//! ## How It Works
//!
//! On pointer-down the pointer ray is tested against the edge handles first,
//! then the corners, each in the order above; the first hit starts a drag.
//! Handle pick volumes grow with camera distance so they stay grabbable when
//! zoomed out.
//!
//! - **Edge drag**: the cursor's movement since the drag began is unprojected
//!   at the decal's depth and measured along the decal's right (width) or up
//!   (height) axis. The footprint is centered, so the dimension changes by
//!   twice that amount.
//! - **Corner drag**: uniform scale from the pixel distance the cursor moved.
//!   Up-right grows, down-left shrinks.
//!
//! Every drag step writes the size into the [`DecalSource`] and forces its
//! [`BindingAdapter`] to push, so the composited texture catches up in the
//! same frame.
//!
//! ## Comparison
//!
//! - **Unity**: `Handles.ScaleHandle` / the Rect tool; the Rect tool's
//!   edge-and-corner layout is what this mirrors.
//! - **Figma / Photoshop**: free-transform bounding boxes behave the same,
//!   corners scaling uniformly with a modifier.

use log::debug;

use crate::camera::Camera;
use crate::color::Color;
use crate::composite::CompositeBackend;
use crate::decal::{BindingAdapter, DecalSource};
use crate::input::Pointer;
use crate::math::{Mat3, Mat4, Quat, Ray, Vec2, Vec3};

use super::config::ResizeConfig;
use super::handle::ray_sphere;
use super::shapes::GizmoShape;

/// Converts camera distance into handle size.
const DISTANCE_FACTOR: f32 = 0.1;
/// Corner pick volume relative to the drawn corner handle.
const CORNER_PICK_FACTOR: f32 = 1.2;

/// One of the eight resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    Right,
    Top,
    Left,
    Bottom,
    TopRight,
    TopLeft,
    BottomLeft,
    BottomRight,
}

impl ResizeHandle {
    /// All handles in pick order: edges, then corners.
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::Right,
        ResizeHandle::Top,
        ResizeHandle::Left,
        ResizeHandle::Bottom,
        ResizeHandle::TopRight,
        ResizeHandle::TopLeft,
        ResizeHandle::BottomLeft,
        ResizeHandle::BottomRight,
    ];

    pub fn is_corner(self) -> bool {
        matches!(
            self,
            ResizeHandle::TopRight | ResizeHandle::TopLeft | ResizeHandle::BottomLeft | ResizeHandle::BottomRight
        )
    }

    /// Position on the footprint in units of its size, relative to the
    /// center (right, up).
    pub fn anchor(self) -> Vec2 {
        match self {
            ResizeHandle::Right => Vec2::new(0.5, 0.0),
            ResizeHandle::Top => Vec2::new(0.0, 0.5),
            ResizeHandle::Left => Vec2::new(-0.5, 0.0),
            ResizeHandle::Bottom => Vec2::new(0.0, -0.5),
            ResizeHandle::TopRight => Vec2::new(0.5, 0.5),
            ResizeHandle::TopLeft => Vec2::new(-0.5, 0.5),
            ResizeHandle::BottomLeft => Vec2::new(-0.5, -0.5),
            ResizeHandle::BottomRight => Vec2::new(0.5, -0.5),
        }
    }

    /// World position on the given decal.
    pub fn position(self, source: &DecalSource) -> Vec3 {
        let offset = self.anchor() * source.size();
        source.position() + source.right() * offset.x + source.up() * offset.y
    }
}

/// What part of the resize overlay a visual belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePart {
    /// Translucent fill over the footprint.
    Footprint,
    /// The decal image drawn over the footprint; the host binds the texture.
    Preview,
    Frame,
    DepthBox,
    Handle(ResizeHandle),
}

/// One mesh instance of the resize overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeVisual {
    pub part: ResizePart,
    pub shape: GizmoShape,
    pub model: Mat4,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ResizeDrag {
    handle: ResizeHandle,
    start_cursor: Vec2,
    start_size: Vec2,
    depth: f32,
}

/// Width/height controller for one decal.
#[derive(Debug, Clone, Default)]
pub struct ResizeHandles {
    config: ResizeConfig,
    drag: Option<ResizeDrag>,
}

impl ResizeHandles {
    pub fn new(config: ResizeConfig) -> Self {
        Self { config, drag: None }
    }

    pub fn config(&self) -> &ResizeConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ResizeConfig) {
        self.config = config;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn active(&self) -> Option<ResizeHandle> {
        self.drag.map(|d| d.handle)
    }

    /// Stop the active drag without touching the decal.
    pub fn cancel(&mut self) {
        self.drag = None;
    }

    /// Pick radius of `handle` when the camera is `distance` away.
    pub fn pick_radius(&self, handle: ResizeHandle, distance: f32) -> f32 {
        let scaled = distance * DISTANCE_FACTOR;
        if handle.is_corner() {
            self.config.corner_handle_size * scaled * CORNER_PICK_FACTOR * 0.5
        } else {
            self.config.handle_size * scaled * 0.5
        }
    }

    /// First handle (edges before corners) the ray passes through.
    pub fn hit_test(&self, ray: &Ray, camera: &Camera, source: &DecalSource) -> Option<ResizeHandle> {
        let distance = camera.position().distance(source.position());
        ResizeHandle::ALL.into_iter().find(|&handle| {
            ray_sphere(ray, handle.position(source), self.pick_radius(handle, distance)).is_some()
        })
    }

    /// Run one frame. Returns whether the decal's size changed.
    pub fn step<B: CompositeBackend>(
        &mut self,
        camera: &Camera,
        pointer: &Pointer,
        source: &mut DecalSource,
        adapter: &mut BindingAdapter<B>,
    ) -> bool {
        let cursor = pointer.cursor.to_vec2();

        let Some(drag) = self.drag else {
            if pointer.primary_just_pressed() {
                let ray = camera.screen_point_to_ray(cursor);
                if let Some(handle) = self.hit_test(&ray, camera, source) {
                    debug!("resize '{}': begin {:?}", source.name(), handle);
                    self.drag = Some(ResizeDrag {
                        handle,
                        start_cursor: cursor,
                        start_size: source.size(),
                        depth: camera.view_depth(source.position()),
                    });
                }
            }
            return false;
        };

        if !pointer.primary_pressed() {
            debug!("resize '{}': end {:?} at {}", source.name(), drag.handle, source.size());
            self.drag = None;
            return false;
        }

        let size = if drag.handle.is_corner() {
            self.corner_size(&drag, cursor)
        } else {
            self.edge_size(&drag, camera, cursor, source)
        };
        let changed = size != source.size();
        source.set_size(size);
        adapter.force_refresh(source);
        changed
    }

    fn edge_size(&self, drag: &ResizeDrag, camera: &Camera, cursor: Vec2, source: &DecalSource) -> Vec2 {
        let world_delta =
            camera.screen_to_world(cursor, drag.depth) - camera.screen_to_world(drag.start_cursor, drag.depth);
        let mut size = drag.start_size;
        let grow = |start: f32, along: f32, sign: f32| (start + along * sign * 2.0).max(self.config.min_size);
        match drag.handle {
            ResizeHandle::Right => size.x = grow(size.x, world_delta.dot(source.right()), 1.0),
            ResizeHandle::Left => size.x = grow(size.x, world_delta.dot(source.right()), -1.0),
            ResizeHandle::Top => size.y = grow(size.y, world_delta.dot(source.up()), 1.0),
            ResizeHandle::Bottom => size.y = grow(size.y, world_delta.dot(source.up()), -1.0),
            _ => {}
        }
        size
    }

    fn corner_size(&self, drag: &ResizeDrag, cursor: Vec2) -> Vec2 {
        // Window pixels, y down: up-right is +x, −y.
        let delta = cursor - drag.start_cursor;
        let signed = delta.length() * (delta.x - delta.y).signum();
        let factor = (1.0 + signed * self.config.corner_sensitivity).max(self.config.min_scale);
        drag.start_size * factor
    }

    // ── Visuals ─────────────────────────────────────────────────────────

    /// The overlay for `source` as seen from `camera`.
    pub fn visuals(&self, camera: &Camera, source: &DecalSource) -> Vec<ResizeVisual> {
        let c = &self.config;
        let distance = camera.position().distance(source.position());
        let thickness = (distance * c.line_thickness_scale).max(f32::EPSILON);
        let rotation = source.rotation();
        let size = source.size();
        let mut out = Vec::new();

        let footprint = Mat4::from_scale_rotation_translation(size.extend(1.0), rotation, source.position());
        out.push(ResizeVisual {
            part: ResizePart::Footprint,
            shape: GizmoShape::Square,
            model: footprint,
            color: c.main_plane_color,
        });
        if c.show_decal_preview && source.texture().is_some() {
            out.push(ResizeVisual {
                part: ResizePart::Preview,
                shape: GizmoShape::Square,
                model: footprint,
                color: Color::WHITE.with_alpha(c.decal_preview_opacity * source.opacity()),
            });
        }

        let corner = |x: f32, y: f32, z: f32| {
            source.position() + source.right() * (x * size.x) + source.up() * (y * size.y) + source.direction() * z
        };
        let outline = [(0.5, 0.5), (-0.5, 0.5), (-0.5, -0.5), (0.5, -0.5)];
        for i in 0..4 {
            let (ax, ay) = outline[i];
            let (bx, by) = outline[(i + 1) % 4];
            if let Some(model) = line(corner(ax, ay, 0.0), corner(bx, by, 0.0), thickness, rotation) {
                out.push(ResizeVisual {
                    part: ResizePart::Frame,
                    shape: GizmoShape::Cube,
                    model,
                    color: c.frame_color,
                });
            }
        }

        if c.show_depth_box {
            let depth = source.depth();
            let mut edges = Vec::with_capacity(12);
            for i in 0..4 {
                let (ax, ay) = outline[i];
                let (bx, by) = outline[(i + 1) % 4];
                edges.push((corner(ax, ay, 0.0), corner(bx, by, 0.0)));
                edges.push((corner(ax, ay, depth), corner(bx, by, depth)));
                edges.push((corner(ax, ay, 0.0), corner(ax, ay, depth)));
            }
            for (a, b) in edges {
                if let Some(model) = line(a, b, thickness, rotation) {
                    out.push(ResizeVisual {
                        part: ResizePart::DepthBox,
                        shape: GizmoShape::Cube,
                        model,
                        color: c.depth_box_color,
                    });
                }
            }
        }

        let active = self.active();
        for handle in ResizeHandle::ALL {
            let (shape, diameter, resting) = if handle.is_corner() {
                (GizmoShape::Cube, c.corner_handle_size, c.corner_handle_color)
            } else {
                (GizmoShape::Sphere, c.handle_size, c.edge_handle_color)
            };
            let color = if active == Some(handle) { c.dragging_color } else { resting };
            let scale = Vec3::splat(diameter * distance * DISTANCE_FACTOR);
            out.push(ResizeVisual {
                part: ResizePart::Handle(handle),
                shape,
                model: Mat4::from_scale_rotation_translation(scale, rotation, handle.position(source)),
                color,
            });
        }
        out
    }
}

/// Model matrix stretching a unit cube from `a` to `b`. `None` for zero
/// length.
fn line(a: Vec3, b: Vec3, thickness: f32, frame: Quat) -> Option<Mat4> {
    let along = b - a;
    let length = along.length();
    if length <= f32::EPSILON {
        return None;
    }
    let x = along / length;
    // Keep the cross-section aligned with the decal frame where possible.
    let mut y = (frame * Vec3::Y).reject_from_normalized(x);
    if y.length_squared() < 1e-6 {
        y = (frame * Vec3::Z).reject_from_normalized(x);
    }
    let y = y.normalize();
    let rotation = Quat::from_mat3(&Mat3::from_cols(x, y, x.cross(y)));
    Some(Mat4::from_scale_rotation_translation(
        Vec3::new(length, thickness, thickness),
        rotation,
        (a + b) * 0.5,
    ))
}
