//! # Merki — Surface Decals with Interactive Placement
//!
//! Stamp flat images onto a 3D surface and move them around with on-screen
//! handles.
//!
//! - [`composite`]: the [`Compositor`](composite::Compositor) flattens every
//!   registered decal into one texture in the surface's UV space, using baked
//!   position/normal reference maps and inverse projection. It only redraws
//!   when something changed.
//! - [`decal`]: decal records, projection math, the editable
//!   [`DecalSource`](decal::DecalSource), and the
//!   [`BindingAdapter`](decal::BindingAdapter) that keeps a source registered
//!   and in sync.
//! - [`gizmo`]: a translate/rotate [`ManipulationGizmo`](gizmo::ManipulationGizmo)
//!   and per-decal [`ResizeHandles`](gizmo::ResizeHandles), driven by pointer
//!   rays and sized to stay constant on screen.
//!
//! Everything is single-threaded and frame-driven: feed input, step the
//! gizmos and adapters, then call
//! [`Compositor::process_frame`](composite::Compositor::process_frame) once.
//!
//! Start with `use merki::prelude::*`.

pub mod camera;
pub mod color;
pub mod composite;
pub mod config;
pub mod decal;
pub mod gizmo;
pub mod input;
pub mod math;
pub mod prelude;
