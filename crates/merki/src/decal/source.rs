//! The editable side of a decal.
//!
//! A [`DecalSource`] is what the user and the gizmos move around: a transform
//! plus appearance. Every setter raises a change flag. The
//! [`BindingAdapter`](super::BindingAdapter) polls that flag once per step
//! and, when set, pushes the new values into the compositor.

use crate::color::Color;
use crate::composite::TextureHandle;
use crate::math::{look_rotation, Quat, Transform, Vec2, Vec3};

use super::record::{BlendMode, DecalRecord, DEFAULT_DEPTH, DEFAULT_SIZE};

/// Source of truth for one decal's placement and look.
#[derive(Debug, Clone, PartialEq)]
pub struct DecalSource {
    name: String,
    transform: Transform,
    size: Vec2,
    depth: f32,
    texture: Option<TextureHandle>,
    opacity: f32,
    tint: Color,
    blend_mode: BlendMode,
    changed: bool,
}

impl DecalSource {
    /// A source at the origin projecting straight down.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform {
                rotation: look_rotation(Vec3::NEG_Y, Vec3::NEG_Z),
                ..Transform::IDENTITY
            },
            size: Vec2::splat(DEFAULT_SIZE),
            depth: DEFAULT_DEPTH,
            texture: None,
            opacity: 1.0,
            tint: Color::WHITE,
            blend_mode: BlendMode::AlphaBlend,
            changed: true,
        }
    }

    // ── Getters ─────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }

    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    /// Projection direction (the transform's forward).
    pub fn direction(&self) -> Vec3 {
        self.transform.forward()
    }

    pub fn up(&self) -> Vec3 {
        self.transform.up()
    }

    pub fn right(&self) -> Vec3 {
        self.transform.right()
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn tint(&self) -> Color {
        self.tint
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    // ── Setters (each raises the change flag) ───────────────────────────

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.translation = position;
        self.changed = true;
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.set_position(self.transform.translation + delta);
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation.normalize();
        self.changed = true;
    }

    /// Point the decal along `direction` with the given up vector.
    pub fn look_to(&mut self, direction: Vec3, up: Vec3) {
        self.set_rotation(look_rotation(direction, up));
    }

    pub fn rotate_world_axis(&mut self, axis: Vec3, angle_radians: f32) {
        self.transform.rotate_world_axis(axis, angle_radians);
        self.changed = true;
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
        self.changed = true;
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth;
        self.changed = true;
    }

    pub fn set_texture(&mut self, texture: Option<TextureHandle>) {
        self.texture = texture;
        self.changed = true;
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity;
        self.changed = true;
    }

    pub fn set_tint(&mut self, tint: Color) {
        self.tint = tint;
        self.changed = true;
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
        self.changed = true;
    }

    // ── Change signal ───────────────────────────────────────────────────

    /// Whether anything changed since the last [`take_changes`](Self::take_changes).
    pub fn has_changes(&self) -> bool {
        self.changed
    }

    /// Read and reset the change flag.
    pub fn take_changes(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Copy placement and appearance into `record`.
    pub fn apply_to(&self, record: &mut DecalRecord) {
        record.name.clone_from(&self.name);
        record.world_position = self.position();
        record.projection_direction = self.direction();
        record.up_vector = self.up();
        record.size = self.size;
        record.projection_depth = self.depth;
        record.texture = self.texture;
        record.set_opacity(self.opacity);
        record.tint = self.tint;
        record.blend_mode = self.blend_mode;
    }
}
