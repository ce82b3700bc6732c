//! # Camera — Screen/World Conversions for Picking
//!
//! The gizmos never render anything themselves, but they need to answer three
//! questions about the host's camera every step:
//!
//! 1. Which world-space ray passes through this cursor pixel? (picking and
//!    dragging)
//! 2. Which world point sits under this pixel at a given view depth? (resize
//!    handles convert pixel deltas into world deltas this way)
//! 3. How large is one "screen unit" at this point? (screen-constant gizmo
//!    sizing)
//!
//! ## Screen-Constant Sizing
//!
//! A gizmo should cover the same fraction of the viewport no matter how far
//! away it is. The visible half-height of the view at distance `D` is
//! `D · tan(fov/2)` for a perspective camera and a constant `half_height` for
//! an orthographic one, so scaling the gizmo by that value times a
//! coefficient keeps its on-screen size fixed:
//!
//! ```text
//!   perspective:   scale = D · tan(fov_y / 2) · c
//!   orthographic:  scale = half_height · c
//! ```
//!
//! Cursor coordinates are window pixels with the origin at the top-left and
//! y growing downward, matching winit's `CursorMoved` events.

use serde::{Deserialize, Serialize};

use crate::math::{Mat4, Ray, Transform, Vec2, Vec3};

/// How the camera maps the view volume onto the screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Vertical field of view in degrees.
    Perspective { fov_y: f32 },
    /// Half of the visible height in world units.
    Orthographic { half_height: f32 },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective { fov_y: 45.0 }
    }
}

/// A camera as seen by the gizmos: a transform, a projection, and the pixel
/// size of the viewport it renders into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub transform: Transform,
    pub projection: Projection,
    /// Near clipping plane distance.
    pub near: f32,
    /// Far clipping plane distance.
    pub far: f32,
    /// Viewport size in pixels.
    pub viewport: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            transform: Transform::IDENTITY,
            projection: Projection::default(),
            near: 0.1,
            far: 1000.0,
            viewport: Vec2::new(1280.0, 720.0),
        }
    }
}

impl Camera {
    pub fn perspective(transform: Transform, fov_y: f32, viewport: Vec2) -> Self {
        Self {
            transform,
            projection: Projection::Perspective { fov_y },
            viewport,
            ..Default::default()
        }
    }

    pub fn orthographic(transform: Transform, half_height: f32, viewport: Vec2) -> Self {
        Self {
            transform,
            projection: Projection::Orthographic { half_height },
            viewport,
            ..Default::default()
        }
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }

    pub fn is_orthographic(&self) -> bool {
        matches!(self.projection, Projection::Orthographic { .. })
    }

    /// Width over height, never zero.
    pub fn aspect(&self) -> f32 {
        self.viewport.x.max(1.0) / self.viewport.y.max(1.0)
    }

    /// Half of the visible height at view depth 1 (perspective) or the fixed
    /// half-height (orthographic).
    fn half_extent_y(&self) -> f32 {
        match self.projection {
            Projection::Perspective { fov_y } => (fov_y.to_radians() * 0.5).tan(),
            Projection::Orthographic { half_height } => half_height,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.transform.rotation, self.transform.translation)
            .inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let aspect = self.aspect();
        match self.projection {
            Projection::Perspective { fov_y } => {
                Mat4::perspective_rh(fov_y.to_radians(), aspect, self.near, self.far)
            }
            Projection::Orthographic { half_height } => Mat4::orthographic_rh(
                -half_height * aspect,
                half_height * aspect,
                -half_height,
                half_height,
                self.near,
                self.far,
            ),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Cursor pixel to normalized device coordinates (x right, y up, ±1).
    fn screen_to_ndc(&self, screen: Vec2) -> Vec2 {
        Vec2::new(
            2.0 * screen.x / self.viewport.x.max(1.0) - 1.0,
            1.0 - 2.0 * screen.y / self.viewport.y.max(1.0),
        )
    }

    /// View-space offset of the pixel on the plane one unit in front of the
    /// camera (perspective) or on the camera plane (orthographic).
    fn ndc_to_view_offset(&self, ndc: Vec2) -> Vec2 {
        let half_y = self.half_extent_y();
        Vec2::new(ndc.x * half_y * self.aspect(), ndc.y * half_y)
    }

    /// World-space ray through a cursor pixel.
    pub fn screen_point_to_ray(&self, screen: Vec2) -> Ray {
        let offset = self.ndc_to_view_offset(self.screen_to_ndc(screen));
        let rot = self.transform.rotation;
        match self.projection {
            Projection::Perspective { .. } => {
                let dir = rot * Vec3::new(offset.x, offset.y, -1.0);
                Ray::new(self.position(), dir)
            }
            Projection::Orthographic { .. } => {
                let origin = self.position() + rot * Vec3::new(offset.x, offset.y, 0.0);
                Ray::new(origin, self.transform.forward())
            }
        }
    }

    /// World point under a cursor pixel at `depth` units along the view axis.
    pub fn screen_to_world(&self, screen: Vec2, depth: f32) -> Vec3 {
        let offset = self.ndc_to_view_offset(self.screen_to_ndc(screen));
        let local = match self.projection {
            Projection::Perspective { .. } => Vec3::new(offset.x * depth, offset.y * depth, -depth),
            Projection::Orthographic { .. } => Vec3::new(offset.x, offset.y, -depth),
        };
        self.transform.translation + self.transform.rotation * local
    }

    /// Cursor pixel of a world point, or `None` when it is behind the camera.
    pub fn world_to_screen(&self, point: Vec3) -> Option<Vec2> {
        let clip = self.view_projection() * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.viewport.x,
            (1.0 - ndc.y) * 0.5 * self.viewport.y,
        ))
    }

    /// Distance of `point` along the camera's forward axis.
    pub fn view_depth(&self, point: Vec3) -> f32 {
        (point - self.position()).dot(self.transform.forward())
    }

    /// World size that renders at a constant fraction of the viewport when
    /// placed at `point`. `coefficient` is that fraction.
    pub fn screen_constant_scale(&self, point: Vec3, coefficient: f32) -> f32 {
        match self.projection {
            Projection::Orthographic { half_height } => half_height * coefficient,
            Projection::Perspective { fov_y } => {
                let distance = self.position().distance(point);
                distance * (fov_y.to_radians() * 0.5).tan() * coefficient
            }
        }
    }
}
