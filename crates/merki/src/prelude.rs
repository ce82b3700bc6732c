//! Convenience re-exports — `use merki::prelude::*`.

pub use crate::camera::{Camera, Projection};
pub use crate::color::Color;
pub use crate::composite::{
    BlendFactor, BlendFactors, CompositeBackend, CompositeError, Compositor, CompositorConfig,
    CompositorSlot, CompositorState, DecalImage, FloatImage, MaterialProperties, ReferenceMaps,
    SharedCompositor, SoftwareBackend, SurfaceMaterial, TextureHandle,
};
pub use crate::config::{ConfigError, JsonConfig};
pub use crate::decal::{BindingAdapter, BlendMode, DecalId, DecalRecord, DecalSource, ProjectionVolume};
pub use crate::gizmo::{
    GizmoConfig, GizmoEvent, GizmoMode, GizmoSpace, GizmoTarget, HandleAxis, ManipulationGizmo,
    ResizeConfig, ResizeHandle, ResizeHandles,
};
pub use crate::input::{CursorPosition, Input, MouseButton, Pointer};
pub use crate::math::{Mat3, Mat4, Plane, Quat, Ray, Transform, Vec2, Vec3, Vec4};

#[cfg(feature = "gpu")]
pub use crate::composite::{GpuBackend, GpuContext, ProgramSource};
