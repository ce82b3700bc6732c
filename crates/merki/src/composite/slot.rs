//! Shared access to a compositor that may come and go.
//!
//! Adapters are handed a [`CompositorSlot`] at construction instead of
//! looking up a global. The host installs the compositor into the slot when
//! it is created and takes it out when it is torn down; adapters that find the
//! slot empty (or the compositor busy) retry on their next step.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use super::{CompositeBackend, Compositor, SoftwareBackend};

/// A compositor shared between the host and its adapters.
pub type SharedCompositor<B = SoftwareBackend> = Rc<RefCell<Compositor<B>>>;

/// A possibly-empty, shared reference to a compositor.
pub struct CompositorSlot<B: CompositeBackend = SoftwareBackend> {
    inner: Rc<RefCell<Option<SharedCompositor<B>>>>,
}

impl<B: CompositeBackend> Clone for CompositorSlot<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<B: CompositeBackend> Default for CompositorSlot<B> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(None)),
        }
    }
}

impl<B: CompositeBackend> CompositorSlot<B> {
    /// An empty slot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A slot holding `compositor`.
    pub fn with(compositor: SharedCompositor<B>) -> Self {
        let slot = Self::default();
        slot.install(compositor);
        slot
    }

    /// Put a compositor into the slot, replacing any previous one.
    pub fn install(&self, compositor: SharedCompositor<B>) {
        *self.inner.borrow_mut() = Some(compositor);
    }

    /// Take the compositor out of the slot.
    pub fn remove(&self) -> Option<SharedCompositor<B>> {
        self.inner.borrow_mut().take()
    }

    pub fn get(&self) -> Option<SharedCompositor<B>> {
        self.inner.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_none()
    }

    /// Run `f` against the compositor if one is installed, usable, and not
    /// already borrowed. Returns `None` when the compositor is transiently
    /// unavailable.
    pub fn with_compositor<R>(&self, f: impl FnOnce(&mut Compositor<B>) -> R) -> Option<R> {
        let shared = self.get()?;
        let mut compositor: RefMut<'_, Compositor<B>> = shared.try_borrow_mut().ok()?;
        if compositor.is_disabled() {
            return None;
        }
        Some(f(&mut compositor))
    }
}
