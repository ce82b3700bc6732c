//! The data describing one decal.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::composite::{BlendFactor, BlendFactors, TextureHandle};
use crate::math::{Vec2, Vec3};

/// Default footprint edge length in world units.
pub const DEFAULT_SIZE: f32 = 0.2;
/// Default thickness of the projection volume.
pub const DEFAULT_DEPTH: f32 = 0.1;

static NEXT_DECAL_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a [`DecalRecord`].
///
/// Allocated once when the record is created. Clones of a record share the
/// id, so the compositor treats them as the same decal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecalId(u64);

impl DecalId {
    fn next() -> Self {
        Self(NEXT_DECAL_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// How a decal's color combines with what is already in the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Standard "over": `src·αs + dst·(1−αs)`.
    #[default]
    AlphaBlend,
    /// Adds the alpha-weighted color: `src·αs + dst`.
    Additive,
    /// Darkens: `src·dst`.
    Multiply,
}

impl BlendMode {
    /// Source/destination factor pair for this mode.
    pub fn factors(self) -> BlendFactors {
        match self {
            BlendMode::AlphaBlend => BlendFactors::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha),
            BlendMode::Additive => BlendFactors::new(BlendFactor::SrcAlpha, BlendFactor::One),
            BlendMode::Multiply => BlendFactors::new(BlendFactor::DstColor, BlendFactor::Zero),
        }
    }
}

/// One decal: where it projects from, which way, how large, and how it looks.
///
/// Records are owned by the [`Compositor`](crate::composite::Compositor) once
/// registered; mutate them through
/// [`Compositor::update`](crate::composite::Compositor::update) or a
/// [`BindingAdapter`](crate::decal::BindingAdapter) so the layer gets
/// re-composited.
#[derive(Debug, Clone, PartialEq)]
pub struct DecalRecord {
    id: DecalId,
    /// Label used in log output.
    pub name: String,
    /// Image to stamp. `None` keeps the decal registered but invisible.
    pub texture: Option<TextureHandle>,
    pub world_position: Vec3,
    /// Direction the decal projects along, pointing into the surface.
    pub projection_direction: Vec3,
    /// Fixes the in-plane rotation of the image.
    pub up_vector: Vec3,
    /// Footprint (width, height) in world units.
    pub size: Vec2,
    /// Thickness of the projection volume in world units.
    pub projection_depth: f32,
    opacity: f32,
    pub tint: Color,
    pub blend_mode: BlendMode,
}

impl DecalRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: DecalId::next(),
            name: name.into(),
            texture: None,
            world_position: Vec3::ZERO,
            projection_direction: Vec3::NEG_Y,
            up_vector: Vec3::Y,
            size: Vec2::splat(DEFAULT_SIZE),
            projection_depth: DEFAULT_DEPTH,
            opacity: 1.0,
            tint: Color::WHITE,
            blend_mode: BlendMode::AlphaBlend,
        }
    }

    pub fn id(&self) -> DecalId {
        self.id
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Set opacity, clamped to [0, 1]. NaN becomes 0.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };
    }

    /// Whether the compositor will draw this record.
    pub fn is_renderable(&self) -> bool {
        self.texture.is_some()
    }

    // ── Builders ────────────────────────────────────────────────────────

    pub fn with_texture(mut self, texture: TextureHandle) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.world_position = position;
        self
    }

    pub fn with_direction(mut self, direction: Vec3) -> Self {
        self.projection_direction = direction;
        self
    }

    pub fn with_up(mut self, up: Vec3) -> Self {
        self.up_vector = up;
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Vec2::new(width, height);
        self
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.projection_depth = depth;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.set_opacity(opacity);
        self
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }
}

impl Default for DecalRecord {
    fn default() -> Self {
        Self::new("decal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_project_downward() {
        let r = DecalRecord::new("a");
        assert_eq!(r.projection_direction, Vec3::NEG_Y);
        assert_eq!(r.up_vector, Vec3::Y);
        assert_eq!(r.size, Vec2::splat(0.2));
        assert_eq!(r.projection_depth, 0.1);
        assert_eq!(r.opacity(), 1.0);
        assert_eq!(r.blend_mode, BlendMode::AlphaBlend);
        assert!(!r.is_renderable());
    }

    #[test]
    fn ids_are_unique_and_shared_by_clones() {
        let a = DecalRecord::new("a");
        let b = DecalRecord::new("b");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn opacity_is_clamped() {
        let mut r = DecalRecord::default();
        r.set_opacity(1.5);
        assert_eq!(r.opacity(), 1.0);
        r.set_opacity(-0.2);
        assert_eq!(r.opacity(), 0.0);
        r.set_opacity(f32::NAN);
        assert_eq!(r.opacity(), 0.0);
    }

    #[test]
    fn blend_modes_map_to_factor_pairs() {
        assert_eq!(
            BlendMode::AlphaBlend.factors(),
            BlendFactors::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)
        );
        assert_eq!(
            BlendMode::Additive.factors(),
            BlendFactors::new(BlendFactor::SrcAlpha, BlendFactor::One)
        );
        assert_eq!(
            BlendMode::Multiply.factors(),
            BlendFactors::new(BlendFactor::DstColor, BlendFactor::Zero)
        );
    }
}
