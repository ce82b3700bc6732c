//! # Composite — The Decal Layer
//!
//! All decals on one surface are flattened into a single texture, the *decal
//! layer*, which the surface's own shader samples like any other map. The
//! [`Compositor`] owns that texture and the registry of decals drawn into it.
//!
//! ## How It Works
//!
//! ```text
//!   BindingAdapter ──sync──▶ Compositor.records ──mark_dirty──▶ dirty = true
//!                                                                   │
//!   host frame ──▶ process_frame() ── dirty? ──▶ recomposite()  ◀───┘
//!                                                  │
//!                          clear to transparent ───┤
//!                          for record in order:    │
//!                            draw_decal(params) ───┤──▶ CompositeBackend
//!                          end_pass ───────────────┘
//! ```
//!
//! 1. **Registry**: records are kept in insertion order, keyed by
//!    [`DecalId`]. Later records draw on top. Registering twice is a no-op.
//! 2. **Dirty flag**: every mutation through the compositor sets it. Any
//!    number of changes in one frame cost exactly one re-composite.
//! 3. **Pass**: the target is cleared, then each record with a texture is
//!    drawn as a full-target quad. The per-texel program inverse-projects the
//!    baked surface position into the decal's volume and blends where it
//!    lands inside (see [`software`] for the reference version).
//! 4. **Binding**: the target is bound on the surface material under
//!    [`CompositorConfig::property_name`] after every (re)initialization, so a
//!    resolution change rebinds automatically.
//!
//! If the backend cannot find its program or create the target, the
//! compositor logs an error and goes [`CompositorState::Disabled`]. A disabled
//! compositor ignores registry calls and never draws.
//!
//! ## Comparison
//!
//! - **Deferred decals** (most engines): project into the G-buffer every
//!   frame. No bake, but costs a pass per frame and doesn't travel with the
//!   mesh's UVs.
//! - **This approach**: bakes decals into UV space only when something
//!   changes. Free at runtime, works with any surface shader that can sample
//!   one extra texture.

mod backend;
#[cfg(feature = "gpu")]
pub mod gpu;
mod material;
mod slot;
pub mod software;
mod texture;

pub use backend::{
    BlendFactor, BlendFactors, CompositeBackend, CompositeError, DecalDrawParams, OutputTexture,
};
pub use material::{MaterialProperties, SurfaceMaterial, DEFAULT_PROPERTY};
pub use slot::{CompositorSlot, SharedCompositor};
#[cfg(feature = "gpu")]
pub use gpu::{GpuBackend, GpuContext, ProgramSource};
pub use software::SoftwareBackend;
pub use texture::{DecalImage, FloatImage, ReferenceMaps, TextureError, TextureHandle};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, JsonConfig};
use crate::decal::projection::ProjectionVolume;
use crate::decal::{DecalId, DecalRecord};
use crate::math::Mat4;

/// Default layer resolution (width and height, in texels).
pub const DEFAULT_RESOLUTION: u32 = 2048;

// ── Config ──────────────────────────────────────────────────────────────

/// Compositor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Width and height of the layer. Default: 2048.
    pub resolution: u32,
    /// Material property the layer is bound under. Default: `_DecalLayer`.
    pub property_name: String,
    /// Model matrix of the target surface. When set, decals are projected in
    /// the surface's local frame, matching reference maps baked in object
    /// space.
    pub surface_frame: Option<Mat4>,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            property_name: DEFAULT_PROPERTY.to_owned(),
            surface_frame: None,
        }
    }
}

impl JsonConfig for CompositorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution == 0 {
            return Err(ConfigError::Invalid("resolution must be non-zero".into()));
        }
        if self.property_name.is_empty() {
            return Err(ConfigError::Invalid("property_name must not be empty".into()));
        }
        Ok(())
    }
}

// ── Compositor ──────────────────────────────────────────────────────────

/// Lifecycle of a [`Compositor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorState {
    /// Created but [`Compositor::initialize`] not yet called (or shut down).
    /// The registry works, nothing is drawn.
    Uninitialized,
    /// Target exists and is bound.
    Ready,
    /// Initialization failed. Everything is a no-op until a successful
    /// re-initialize.
    Disabled,
}

/// Owns the decal registry and the composited layer of one surface.
pub struct Compositor<B: CompositeBackend = SoftwareBackend> {
    backend: B,
    config: CompositorConfig,
    state: CompositorState,
    material: Option<Box<dyn SurfaceMaterial>>,
    output: Option<OutputTexture>,
    records: Vec<DecalRecord>,
    dirty: bool,
    recomposite_count: u64,
    last_draw_count: usize,
    /// Consecutive passes that failed to start or finish.
    failed_passes: u32,
}

impl<B: CompositeBackend> Compositor<B> {
    pub fn new(backend: B, config: CompositorConfig) -> Self {
        Self {
            backend,
            config,
            state: CompositorState::Uninitialized,
            material: None,
            output: None,
            records: Vec::new(),
            dirty: false,
            recomposite_count: 0,
            last_draw_count: 0,
            failed_passes: 0,
        }
    }

    /// Attach the material the layer is bound on. Binds immediately when ready.
    pub fn set_material(&mut self, material: impl SurfaceMaterial + 'static) {
        self.material = Some(Box::new(material));
        self.bind_output();
    }

    pub fn with_material(mut self, material: impl SurfaceMaterial + 'static) -> Self {
        self.set_material(material);
        self
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Create the target and bind it. On failure the compositor is disabled
    /// and the error is logged and returned. Safe to call again to retry.
    pub fn initialize(&mut self) -> Result<(), CompositeError> {
        self.backend.destroy_target();
        self.output = None;

        let resolution = self.config.resolution;
        let created = if resolution == 0 {
            Err(CompositeError::InvalidResolution(resolution))
        } else {
            self.backend.create_target(resolution)
        };

        match created {
            Ok(output) => {
                self.output = Some(output);
                self.state = CompositorState::Ready;
                self.bind_output();
                self.dirty = true;
                info!(
                    "decal compositor ready: {resolution}x{resolution}, {} decal(s), bound as '{}'",
                    self.records.len(),
                    self.config.property_name
                );
                Ok(())
            }
            Err(e) => {
                error!("decal compositor disabled: {e}");
                self.state = CompositorState::Disabled;
                Err(e)
            }
        }
    }

    /// Release the target. The registry is kept.
    pub fn shutdown(&mut self) {
        self.backend.destroy_target();
        self.output = None;
        self.state = CompositorState::Uninitialized;
        info!("decal compositor shut down");
    }

    /// Change the layer resolution: full teardown and re-initialization,
    /// keeping every registered record. Zero is rejected and leaves the
    /// compositor as it was.
    pub fn set_resolution(&mut self, resolution: u32) -> Result<(), CompositeError> {
        if resolution == 0 {
            warn!("ignoring decal layer resolution 0, keeping {}", self.config.resolution);
            return Err(CompositeError::InvalidResolution(resolution));
        }
        if resolution == self.config.resolution && self.is_ready() {
            return Ok(());
        }
        self.config.resolution = resolution;
        if self.state == CompositorState::Uninitialized {
            return Ok(());
        }
        info!("decal layer resolution -> {resolution}");
        self.initialize()
    }

    /// Set (or clear) the surface's model matrix.
    pub fn set_surface_frame(&mut self, frame: Option<Mat4>) {
        self.config.surface_frame = frame;
        self.mark_dirty();
    }

    fn bind_output(&mut self) {
        if let (Some(material), Some(output)) = (self.material.as_mut(), self.output) {
            material.set_texture(&self.config.property_name, output);
        }
    }

    fn accepts_changes(&self) -> bool {
        if self.state == CompositorState::Disabled {
            debug!("decal compositor disabled, ignoring registry change");
            return false;
        }
        true
    }

    // ── Registry ────────────────────────────────────────────────────────

    /// Add a record. Registering an id that is already present changes
    /// nothing. Returns whether the record is a member afterward.
    pub fn register(&mut self, record: DecalRecord) -> bool {
        if !self.accepts_changes() {
            return false;
        }
        if self.contains(record.id()) {
            return true;
        }
        debug!("register decal '{}'", record.name);
        self.records.push(record);
        self.mark_dirty();
        true
    }

    /// Remove a record by id. Removing an absent id is a no-op.
    pub fn unregister(&mut self, id: DecalId) -> bool {
        if !self.accepts_changes() {
            return false;
        }
        let before = self.records.len();
        self.records.retain(|r| r.id() != id);
        let removed = self.records.len() != before;
        if removed {
            self.mark_dirty();
        }
        removed
    }

    /// Mutate a registered record in place.
    pub fn update(&mut self, id: DecalId, f: impl FnOnce(&mut DecalRecord)) -> bool {
        if !self.accepts_changes() {
            return false;
        }
        let Some(record) = self.records.iter_mut().find(|r| r.id() == id) else {
            return false;
        };
        f(record);
        self.mark_dirty();
        true
    }

    /// Overwrite the registered copy of `record` (matched by id).
    pub fn sync(&mut self, record: &DecalRecord) -> bool {
        self.update(record.id(), |r| r.clone_from(record))
    }

    /// Remove every record.
    pub fn clear(&mut self) {
        if !self.accepts_changes() {
            return;
        }
        self.records.clear();
        self.mark_dirty();
    }

    pub fn contains(&self, id: DecalId) -> bool {
        self.records.iter().any(|r| r.id() == id)
    }

    pub fn get(&self, id: DecalId) -> Option<&DecalRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Registered records in draw order.
    pub fn records(&self) -> &[DecalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Upload a decal image to the backend.
    pub fn add_texture(&mut self, image: &DecalImage) -> Result<TextureHandle, CompositeError> {
        if self.state == CompositorState::Disabled {
            return Err(CompositeError::Disabled);
        }
        self.backend.upload_texture(image)
    }

    /// Free a decal image on the backend. Records still pointing at it are
    /// skipped on later passes. Returns whether the image was freed.
    pub fn remove_texture(&mut self, handle: TextureHandle) -> bool {
        if !self.backend.release_texture(handle) {
            return false;
        }
        if self.records.iter().any(|r| r.texture == Some(handle)) {
            warn!("decal texture #{} released while still in use", handle.index());
            self.mark_dirty();
        }
        true
    }

    // ── Compositing ─────────────────────────────────────────────────────

    /// Request a re-composite on the next processed frame.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Once-per-frame hook. Re-composites if anything changed since the last
    /// pass. Returns whether a pass ran.
    pub fn process_frame(&mut self) -> bool {
        self.dirty && self.is_ready() && self.recomposite()
    }

    /// Redraw the whole layer now. Returns whether the pass completed.
    pub fn recomposite(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        if let Err(e) = self.backend.begin_pass() {
            self.pass_failed("start", &e);
            return false;
        }

        let world_to_surface = self.world_to_surface();
        let mut drawn = 0;
        for record in &self.records {
            let Some(texture) = record.texture else {
                continue;
            };
            let volume = ProjectionVolume::from_record_in(record, world_to_surface.as_ref());
            let params = DecalDrawParams {
                texture,
                inverse_projection: volume.inverse(),
                projection_axis: volume.axis(),
                opacity: record.opacity(),
                tint: record.tint,
                blend: record.blend_mode.factors(),
            };
            match self.backend.draw_decal(&params) {
                Ok(()) => drawn += 1,
                Err(e) => warn!("skipping decal '{}': {e}", record.name),
            }
        }

        if let Err(e) = self.backend.end_pass() {
            self.pass_failed("finish", &e);
            return false;
        }

        if self.failed_passes > 0 {
            info!("decal composite recovered after {} failed pass(es)", self.failed_passes);
            self.failed_passes = 0;
        }
        self.dirty = false;
        self.recomposite_count += 1;
        self.last_draw_count = drawn;
        debug!("recomposited {drawn}/{} decal(s)", self.records.len());
        true
    }

    /// Errors are logged once per streak of failed passes.
    fn pass_failed(&mut self, stage: &str, e: &CompositeError) {
        if self.failed_passes == 0 {
            error!("decal composite pass failed to {stage}: {e}");
        } else {
            debug!("decal composite pass failed to {stage} again ({}): {e}", self.failed_passes + 1);
        }
        self.failed_passes = self.failed_passes.saturating_add(1);
    }

    fn world_to_surface(&self) -> Option<Mat4> {
        let frame = self.config.surface_frame?;
        if frame.determinant().abs() < 1e-12 {
            warn!("surface frame is singular, projecting in world space");
            return None;
        }
        Some(frame.inverse())
    }

    /// Copy the layer back to the CPU.
    pub fn read_output(&mut self) -> Result<FloatImage, CompositeError> {
        if !self.is_ready() {
            return Err(CompositeError::NoTarget);
        }
        self.backend.read_output()
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn state(&self) -> CompositorState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == CompositorState::Ready
    }

    pub fn is_disabled(&self) -> bool {
        self.state == CompositorState::Disabled
    }

    /// Number of completed passes since creation.
    pub fn recomposite_count(&self) -> u64 {
        self.recomposite_count
    }

    /// Passes in a row that failed to start or finish. Reset by the next
    /// completed pass.
    pub fn failed_passes(&self) -> u32 {
        self.failed_passes
    }

    /// Decals drawn by the latest pass.
    pub fn last_draw_count(&self) -> usize {
        self.last_draw_count
    }

    /// The bound layer, if ready.
    pub fn output(&self) -> Option<OutputTexture> {
        self.output
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::decal::BlendMode;
    use crate::math::{Vec3, Vec4};

    // ── Recording backend ───────────────────────────────────────────────

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Begin,
        Draw(DecalDrawParams),
        End,
    }

    #[derive(Default)]
    struct RecordingBackend {
        missing_program: bool,
        failing_passes: u32,
        released: Vec<TextureHandle>,
        calls: Vec<Call>,
        generation: u64,
        textures: usize,
        destroyed: usize,
    }

    impl CompositeBackend for RecordingBackend {
        fn create_target(&mut self, resolution: u32) -> Result<OutputTexture, CompositeError> {
            if self.missing_program {
                return Err(CompositeError::MissingProgram("decal_projection".into()));
            }
            self.generation += 1;
            Ok(OutputTexture {
                generation: self.generation,
                resolution,
            })
        }
        fn destroy_target(&mut self) {
            self.destroyed += 1;
        }
        fn upload_texture(&mut self, _: &DecalImage) -> Result<TextureHandle, CompositeError> {
            self.textures += 1;
            Ok(TextureHandle(self.textures - 1))
        }
        fn release_texture(&mut self, handle: TextureHandle) -> bool {
            if handle.index() >= self.textures || self.released.contains(&handle) {
                return false;
            }
            self.released.push(handle);
            true
        }
        fn begin_pass(&mut self) -> Result<(), CompositeError> {
            if self.failing_passes > 0 {
                self.failing_passes -= 1;
                return Err(CompositeError::Device("lost".into()));
            }
            self.calls.push(Call::Begin);
            Ok(())
        }
        fn draw_decal(&mut self, params: &DecalDrawParams) -> Result<(), CompositeError> {
            self.calls.push(Call::Draw(*params));
            Ok(())
        }
        fn end_pass(&mut self) -> Result<(), CompositeError> {
            self.calls.push(Call::End);
            Ok(())
        }
        fn read_output(&mut self) -> Result<FloatImage, CompositeError> {
            Err(CompositeError::NoTarget)
        }
    }

    fn recording() -> Compositor<RecordingBackend> {
        let mut c = Compositor::new(RecordingBackend::default(), CompositorConfig::default());
        c.initialize().unwrap();
        c
    }

    fn textured(c: &mut Compositor<RecordingBackend>, name: &str) -> DecalRecord {
        let tex = c.add_texture(&DecalImage::solid(1, 1, [255; 4])).unwrap();
        DecalRecord::new(name).with_texture(tex)
    }

    // ── Registry ────────────────────────────────────────────────────────

    #[test]
    fn register_is_idempotent() {
        let mut c = recording();
        let r = textured(&mut c, "a");
        assert!(c.register(r.clone()));
        assert!(c.register(r.clone()));
        assert_eq!(c.len(), 1);

        assert!(c.unregister(r.id()));
        assert!(!c.unregister(r.id()), "second unregister is a no-op");
        assert!(c.is_empty());
    }

    #[test]
    fn mutations_mark_dirty() {
        let mut c = recording();
        let r = textured(&mut c, "a");
        c.register(r.clone());
        c.recomposite();
        assert!(!c.is_dirty());

        assert!(c.update(r.id(), |r| r.world_position = Vec3::X));
        assert!(c.is_dirty());
        c.recomposite();

        let mut moved = r.clone();
        moved.size.x = 1.0;
        assert!(c.sync(&moved));
        assert!(c.is_dirty());
        assert_eq!(c.get(r.id()).unwrap().size.x, 1.0);
    }

    #[test]
    fn update_unknown_id_is_ignored() {
        let mut c = recording();
        c.recomposite();
        let stray = DecalRecord::new("stray");
        assert!(!c.update(stray.id(), |r| r.name.clear()));
        assert!(!c.is_dirty());
    }

    // ── Compositing ─────────────────────────────────────────────────────

    #[test]
    fn recomposite_clears_then_draws_in_order() {
        let mut c = recording();
        let a = textured(&mut c, "a");
        let b = textured(&mut c, "b").with_blend_mode(BlendMode::Additive);
        let hidden = DecalRecord::new("no texture");
        c.register(a.clone());
        c.register(hidden);
        c.register(b.clone());
        assert!(c.recomposite());

        let calls = &c.backend().calls;
        assert_eq!(calls.len(), 4, "begin, two draws, end: {calls:?}");
        assert_eq!(calls[0], Call::Begin);
        assert_eq!(calls[3], Call::End);
        match (&calls[1], &calls[2]) {
            (Call::Draw(first), Call::Draw(second)) => {
                assert_eq!(Some(first.texture), a.texture);
                assert_eq!(Some(second.texture), b.texture);
                assert_eq!(second.blend, BlendMode::Additive.factors());
            }
            other => panic!("expected two draws, got {other:?}"),
        }
        assert_eq!(c.last_draw_count(), 2);
    }

    #[test]
    fn draw_params_carry_projection() {
        let mut c = recording();
        let r = textured(&mut c, "p")
            .with_position(Vec3::new(1.0, 2.0, 3.0))
            .with_direction(Vec3::new(0.0, 0.0, -2.0))
            .with_opacity(0.5)
            .with_tint(Color::RED);
        c.register(r.clone());
        c.recomposite();

        let Call::Draw(params) = &c.backend().calls[1] else {
            panic!("expected a draw");
        };
        assert!((params.projection_axis - Vec3::NEG_Z).length() < 1e-5);
        let origin = params.inverse_projection.transform_point3(Vec3::new(1.0, 2.0, 3.0));
        assert!(origin.length() < 1e-5);
        assert_eq!(params.opacity, 0.5);
        assert_eq!(params.tint, Color::RED);
    }

    #[test]
    fn three_dirty_marks_one_pass() {
        let mut c = recording();
        for name in ["a", "b", "c"] {
            let r = textured(&mut c, name);
            c.register(r);
        }
        c.process_frame();
        let before = c.recomposite_count();

        c.mark_dirty();
        c.mark_dirty();
        c.mark_dirty();
        assert!(c.process_frame());
        assert!(!c.process_frame(), "clean frame does nothing");
        assert_eq!(c.recomposite_count() - before, 1);
    }

    #[test]
    fn uninitialized_compositor_keeps_registry_but_never_draws() {
        let mut c = Compositor::new(RecordingBackend::default(), CompositorConfig::default());
        let r = DecalRecord::new("early");
        assert!(c.register(r));
        assert!(!c.process_frame());
        assert_eq!(c.recomposite_count(), 0);

        c.initialize().unwrap();
        assert!(c.process_frame(), "initialize marks dirty");
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn removing_a_used_texture_redraws_without_it() {
        let mut c = recording();
        let r = textured(&mut c, "a");
        let handle = r.texture.unwrap();
        c.register(r);
        c.process_frame();

        assert!(c.remove_texture(handle));
        assert!(!c.remove_texture(handle), "already released");
        assert_eq!(c.backend().released, vec![handle]);
        assert!(c.is_dirty());

        let unused = c.add_texture(&DecalImage::solid(1, 1, [0; 4])).unwrap();
        c.process_frame();
        assert!(c.remove_texture(unused));
        assert!(!c.is_dirty(), "no record used it");
    }

    // ── Failure ─────────────────────────────────────────────────────────

    #[test]
    fn failing_passes_are_counted_until_one_completes() {
        let mut c = recording();
        c.backend_mut().failing_passes = 3;
        for expected in 1..=3 {
            assert!(!c.process_frame());
            assert_eq!(c.failed_passes(), expected);
            assert!(c.is_dirty(), "still waiting for a pass");
        }
        assert!(c.process_frame());
        assert_eq!(c.failed_passes(), 0);
        assert_eq!(c.recomposite_count(), 1);
    }

    #[test]
    fn zero_resolution_change_is_rejected_and_state_kept() {
        let material = MaterialProperties::new();
        let mut c = Compositor::new(RecordingBackend::default(), CompositorConfig::default())
            .with_material(material.clone());
        c.initialize().unwrap();

        assert!(matches!(c.set_resolution(0), Err(CompositeError::InvalidResolution(0))));
        assert!(c.is_ready());
        assert_eq!(c.config().resolution, DEFAULT_RESOLUTION);
        assert_eq!(material.bind_count(), 1, "nothing was rebuilt");
        assert_eq!(c.backend().destroyed, 1);

        // Uninitialized compositors reject it too.
        let mut idle = Compositor::new(RecordingBackend::default(), CompositorConfig::default());
        assert!(idle.set_resolution(0).is_err());
        assert_eq!(idle.config().resolution, DEFAULT_RESOLUTION);
    }

    #[test]
    fn missing_program_disables() {
        let backend = RecordingBackend {
            missing_program: true,
            ..Default::default()
        };
        let mut c = Compositor::new(backend, CompositorConfig::default());
        let err = c.initialize().unwrap_err();
        assert!(matches!(err, CompositeError::MissingProgram(_)));
        assert_eq!(c.state(), CompositorState::Disabled);

        assert!(!c.register(DecalRecord::new("ignored")));
        assert!(c.is_empty());
        c.mark_dirty();
        assert!(!c.process_frame());
        assert!(matches!(
            c.add_texture(&DecalImage::solid(1, 1, [0; 4])),
            Err(CompositeError::Disabled)
        ));
        assert!(c.backend().calls.is_empty());
    }

    #[test]
    fn zero_resolution_disables() {
        let config = CompositorConfig {
            resolution: 0,
            ..Default::default()
        };
        let mut c = Compositor::new(RecordingBackend::default(), config);
        assert!(c.initialize().is_err());
        assert!(c.is_disabled());
    }

    // ── Binding ─────────────────────────────────────────────────────────

    #[test]
    fn output_is_bound_and_rebound_on_resolution_change() {
        let material = MaterialProperties::new();
        let mut c = Compositor::new(RecordingBackend::default(), CompositorConfig::default())
            .with_material(material.clone());
        assert!(material.texture(DEFAULT_PROPERTY).is_none());

        c.initialize().unwrap();
        let first = material.texture(DEFAULT_PROPERTY).unwrap();
        assert_eq!(first.resolution, DEFAULT_RESOLUTION);

        let r = DecalRecord::new("kept");
        c.register(r.clone());
        c.set_resolution(512).unwrap();
        let second = material.texture(DEFAULT_PROPERTY).unwrap();
        assert_eq!(second.resolution, 512);
        assert_ne!(first.generation, second.generation);
        assert!(c.contains(r.id()), "registry survives reinitialization");
        assert!(c.is_dirty());

        c.set_resolution(512).unwrap();
        assert_eq!(material.bind_count(), 2, "same resolution does not rebind");
    }

    #[test]
    fn custom_property_name() {
        let material = MaterialProperties::new();
        let config = CompositorConfig::from_json_str(r#"{ "property_name": "_Stickers", "resolution": 64 }"#)
            .unwrap();
        let mut c = Compositor::new(RecordingBackend::default(), config).with_material(material.clone());
        c.initialize().unwrap();
        assert_eq!(material.texture("_Stickers").unwrap().resolution, 64);
        assert!(material.texture(DEFAULT_PROPERTY).is_none());
    }

    #[test]
    fn config_rejects_zero_resolution() {
        assert!(CompositorConfig::from_json_str(r#"{ "resolution": 0 }"#).is_err());
        let defaults = CompositorConfig::from_json_str("{}").unwrap();
        assert_eq!(defaults, CompositorConfig::default());
    }

    // ── Software backend, end to end ────────────────────────────────────

    fn software(resolution: u32) -> Compositor {
        let config = CompositorConfig {
            resolution,
            ..Default::default()
        };
        let mut c = Compositor::new(SoftwareBackend::new(ReferenceMaps::ground_plane(resolution, 2.0)), config);
        c.initialize().unwrap();
        c
    }

    fn covering(c: &mut Compositor, rgba: [u8; 4]) -> DecalRecord {
        let tex = c.add_texture(&DecalImage::solid(1, 1, rgba)).unwrap();
        DecalRecord::new("cover")
            .with_position(Vec3::new(0.0, 0.05, 0.0))
            .with_size(4.0, 4.0)
            .with_texture(tex)
    }

    #[test]
    fn alpha_blend_later_record_draws_on_top() {
        let mut c = software(4);
        let a = covering(&mut c, [255, 0, 0, 255]);
        let b = covering(&mut c, [0, 0, 255, 128]);
        c.register(a);
        c.register(b);
        c.process_frame();

        let alpha_b = 128.0 / 255.0;
        let p = c.backend().output().unwrap().get(1, 2).unwrap();
        // B·αB + A·(1−αB) on the color channels.
        assert!((p.x - (1.0 - alpha_b)).abs() < 1e-5, "got {p}");
        assert!(p.y.abs() < 1e-6, "got {p}");
        assert!((p.z - alpha_b).abs() < 1e-5, "got {p}");
    }

    #[test]
    fn unregister_then_recomposite_clears_layer() {
        let mut c = software(4);
        let r = covering(&mut c, [255; 4]);
        c.register(r.clone());
        c.process_frame();
        assert!(c.backend().output().unwrap().pixels().iter().any(|p| p.w > 0.0));

        c.unregister(r.id());
        c.process_frame();
        assert!(c.backend().output().unwrap().pixels().iter().all(|p| *p == Vec4::ZERO));
    }

    #[test]
    fn missing_reference_maps_disable_software_compositor() {
        let mut c = Compositor::new(SoftwareBackend::without_reference(), CompositorConfig::default());
        assert!(matches!(c.initialize(), Err(CompositeError::MissingReferenceMaps)));
        assert!(c.is_disabled());
    }

    #[test]
    fn scaled_surface_frame_keeps_world_footprint() {
        let mut c = software(8);
        // Object space is 2 units wide, so the surface is 4 world units wide
        // and each texel covers half a world unit.
        c.set_surface_frame(Some(Mat4::from_scale(Vec3::splat(2.0))));
        let tex = c.add_texture(&DecalImage::solid(1, 1, [255; 4])).unwrap();
        c.register(
            DecalRecord::new("one unit")
                .with_position(Vec3::new(0.0, 0.05, 0.0))
                .with_size(0.99, 0.99)
                .with_texture(tex),
        );
        c.process_frame();

        let out = c.backend().output().unwrap();
        let row: Vec<bool> = (0..8).map(|x| out.get(x, 4).unwrap().w > 0.0).collect();
        assert_eq!(row, [false, false, false, true, true, false, false, false]);
    }

    #[test]
    fn surface_frame_projects_in_object_space() {
        let mut c = software(4);
        // The surface sits 10 units along +X in the world; the baked maps
        // are in its local frame.
        c.set_surface_frame(Some(Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0))));
        let mut r = covering(&mut c, [255; 4]);
        r.world_position = Vec3::new(10.0, 0.05, 0.0);
        c.register(r);
        c.process_frame();
        assert!(c.backend().output().unwrap().pixels().iter().all(|p| p.w > 0.99));
    }
}
