//! Binding the decal layer onto a surface material.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::backend::OutputTexture;

/// Default material property the layer is bound under.
pub const DEFAULT_PROPERTY: &str = "_DecalLayer";

/// Something that samples the decal layer, usually the target object's
/// surface shader. The compositor calls this after every (re)initialization.
pub trait SurfaceMaterial {
    fn set_texture(&mut self, property: &str, texture: OutputTexture);
}

/// A shareable property table that implements [`SurfaceMaterial`].
///
/// Clones share the same table, so the host keeps one clone and hands another
/// to the compositor.
#[derive(Debug, Clone, Default)]
pub struct MaterialProperties {
    textures: Rc<RefCell<HashMap<String, OutputTexture>>>,
    binds: Rc<RefCell<u64>>,
}

impl MaterialProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Texture currently bound under `property`.
    pub fn texture(&self, property: &str) -> Option<OutputTexture> {
        self.textures.borrow().get(property).copied()
    }

    /// How many times any texture was bound.
    pub fn bind_count(&self) -> u64 {
        *self.binds.borrow()
    }
}

impl SurfaceMaterial for MaterialProperties {
    fn set_texture(&mut self, property: &str, texture: OutputTexture) {
        self.textures.borrow_mut().insert(property.to_owned(), texture);
        *self.binds.borrow_mut() += 1;
    }
}
