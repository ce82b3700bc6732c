//! Gizmo tuning: modes, handle dimensions, and colors.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::config::{require_positive, ConfigError, JsonConfig};

/// What dragging a handle does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GizmoMode {
    #[default]
    Translation,
    Rotation,
}

/// Which frame the handles are aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GizmoSpace {
    /// World axes.
    #[default]
    Global,
    /// The target's own axes.
    Local,
}

/// Settings for [`ManipulationGizmo`](super::ManipulationGizmo).
///
/// Lengths are in gizmo units: one unit is the screen-constant scale, so an
/// `axis_length` of 1 covers `screen_size_coefficient` of the viewport's
/// half-height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GizmoConfig {
    pub mode: GizmoMode,
    pub space: GizmoSpace,
    /// Fraction of the view half-height one gizmo unit covers. Default: 0.1.
    pub screen_size_coefficient: f32,
    pub axis_length: f32,
    pub axis_radius: f32,
    pub arrow_height: f32,
    pub arrow_radius: f32,
    /// Edge of the square planar handles.
    pub plane_size: f32,
    /// Distance of the planar handles from the origin along both of their axes.
    pub plane_offset: f32,
    pub plane_alpha: f32,
    pub rotation_radius: f32,
    pub rotation_thickness: f32,
    /// Extra half-width around each ring that still counts as a hit.
    pub pick_tolerance: f32,
    pub x_color: Color,
    pub y_color: Color,
    pub z_color: Color,
    pub highlight_color: Color,
    /// Color of the rotation feedback arc.
    pub arc_color: Color,
}

impl Default for GizmoConfig {
    fn default() -> Self {
        Self {
            mode: GizmoMode::Translation,
            space: GizmoSpace::Global,
            screen_size_coefficient: 0.1,
            axis_length: 1.0,
            axis_radius: 0.02,
            arrow_height: 0.2,
            arrow_radius: 0.06,
            plane_size: 0.3,
            plane_offset: 0.0,
            plane_alpha: 0.2,
            rotation_radius: 1.0,
            rotation_thickness: 0.05,
            pick_tolerance: 0.05,
            x_color: Color::RED,
            y_color: Color::GREEN,
            z_color: Color::BLUE,
            highlight_color: Color::YELLOW,
            arc_color: Color::rgba(1.0, 1.0, 0.0, 0.4),
        }
    }
}

impl JsonConfig for GizmoConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("screen_size_coefficient", self.screen_size_coefficient)?;
        require_positive("axis_length", self.axis_length)?;
        require_positive("axis_radius", self.axis_radius)?;
        require_positive("arrow_height", self.arrow_height)?;
        require_positive("arrow_radius", self.arrow_radius)?;
        require_positive("plane_size", self.plane_size)?;
        require_positive("rotation_radius", self.rotation_radius)?;
        require_positive("rotation_thickness", self.rotation_thickness)?;
        if !(0.0..=1.0).contains(&self.plane_alpha) {
            return Err(ConfigError::Invalid(format!(
                "plane_alpha must be in [0, 1], got {}",
                self.plane_alpha
            )));
        }
        Ok(())
    }
}

/// Settings for [`ResizeHandles`](super::ResizeHandles).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    /// Diameter of the edge handles. Scaled by a tenth of the camera distance
    /// so they keep a steady size on screen.
    pub handle_size: f32,
    /// Size of the corner handles, same units as `handle_size`.
    pub corner_handle_size: f32,
    /// Frame line thickness per unit of camera distance.
    pub line_thickness_scale: f32,
    /// Smallest width or height an edge drag can produce.
    pub min_size: f32,
    /// Smallest uniform factor a corner drag can produce.
    pub min_scale: f32,
    /// Scale change per pixel of corner drag.
    pub corner_sensitivity: f32,
    pub frame_color: Color,
    pub main_plane_color: Color,
    pub edge_handle_color: Color,
    pub corner_handle_color: Color,
    pub depth_box_color: Color,
    pub dragging_color: Color,
    pub show_depth_box: bool,
    /// Draw the decal image on the footprint quad.
    pub show_decal_preview: bool,
    pub decal_preview_opacity: f32,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            handle_size: 0.1,
            corner_handle_size: 0.15,
            line_thickness_scale: 0.002,
            min_size: 0.01,
            min_scale: 0.01,
            corner_sensitivity: 0.001,
            frame_color: Color::rgba(0.0, 1.0, 1.0, 0.8),
            main_plane_color: Color::rgba(0.0, 1.0, 1.0, 0.1),
            edge_handle_color: Color::rgba(1.0, 1.0, 1.0, 0.9),
            corner_handle_color: Color::rgba(1.0, 0.8, 0.0, 0.9),
            depth_box_color: Color::rgba(0.5, 0.5, 1.0, 0.3),
            dragging_color: Color::rgba(1.0, 0.5, 0.0, 1.0),
            show_depth_box: true,
            show_decal_preview: true,
            decal_preview_opacity: 0.5,
        }
    }
}

impl JsonConfig for ResizeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("handle_size", self.handle_size)?;
        require_positive("corner_handle_size", self.corner_handle_size)?;
        require_positive("min_size", self.min_size)?;
        require_positive("min_scale", self.min_scale)?;
        require_positive("corner_sensitivity", self.corner_sensitivity)?;
        if !(0.0..=1.0).contains(&self.decal_preview_opacity) {
            return Err(ConfigError::Invalid(format!(
                "decal_preview_opacity must be in [0, 1], got {}",
                self.decal_preview_opacity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = GizmoConfig::from_json_str(r#"{ "mode": "Rotation", "axis_length": 2.0 }"#).unwrap();
        assert_eq!(config.mode, GizmoMode::Rotation);
        assert_eq!(config.axis_length, 2.0);
        assert_eq!(config.arrow_height, 0.2);
        assert_eq!(config.highlight_color, Color::YELLOW);
    }

    #[test]
    fn rejects_non_positive_lengths() {
        assert!(GizmoConfig::from_json_str(r#"{ "axis_length": 0.0 }"#).is_err());
        assert!(GizmoConfig::from_json_str(r#"{ "plane_alpha": 1.5 }"#).is_err());
        assert!(ResizeConfig::from_json_str(r#"{ "min_size": -1.0 }"#).is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let config = ResizeConfig {
            show_depth_box: false,
            ..Default::default()
        };
        let json = config.to_json_string().unwrap();
        assert_eq!(ResizeConfig::from_json_str(&json).unwrap(), config);
    }
}
