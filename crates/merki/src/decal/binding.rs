//! # Binding — Keeping a Decal Source and the Compositor in Sync
//!
//! A [`BindingAdapter`] owns the [`DecalRecord`] for one [`DecalSource`] and is
//! the only thing that talks to the compositor on its behalf:
//!
//! ```text
//!   initialize()  ── register record, sync immediately
//!   step()        ── compositor missing?  retry registration
//!                    source changed?      copy values, sync (marks dirty)
//!   force_refresh ── sync now, changed or not
//!   shutdown()    ── unregister
//! ```
//!
//! The compositor is reached through a [`CompositorSlot`] given at
//! construction. An empty slot, a compositor that is mid-borrow, or a disabled
//! compositor all count as "not there right now"; the adapter keeps its record
//! up to date and registers it on the first step where the compositor is
//! back. A compositor that lost the record (for example a freshly installed
//! one) gets it re-registered the same way.

use log::{debug, warn};

use crate::composite::{CompositeBackend, CompositorSlot, SoftwareBackend};

use super::record::{DecalId, DecalRecord};
use super::source::DecalSource;

/// Synchronizes one [`DecalSource`] into a compositor.
pub struct BindingAdapter<B: CompositeBackend = SoftwareBackend> {
    slot: CompositorSlot<B>,
    record: DecalRecord,
    initialized: bool,
    registered: bool,
}

impl<B: CompositeBackend> BindingAdapter<B> {
    pub fn new(slot: CompositorSlot<B>, source: &DecalSource) -> Self {
        let mut record = DecalRecord::new(source.name());
        source.apply_to(&mut record);
        Self {
            slot,
            record,
            initialized: false,
            registered: false,
        }
    }

    /// Register with the compositor and push the current values. Returns
    /// whether the compositor was reachable; if not, [`step`](Self::step)
    /// retries.
    pub fn initialize(&mut self, source: &mut DecalSource) -> bool {
        self.initialized = true;
        let ok = self.force_refresh(source);
        if !ok {
            debug!("decal '{}': compositor not available yet, will retry", self.record.name);
        }
        ok
    }

    /// Per-frame update. Returns whether anything was pushed to the
    /// compositor.
    pub fn step(&mut self, source: &mut DecalSource) -> bool {
        if !self.initialized {
            return false;
        }
        let changed = source.has_changes();
        if changed {
            source.apply_to(&mut self.record);
        }

        let record = &self.record;
        let outcome = self.slot.with_compositor(|c| {
            if !c.contains(record.id()) {
                c.register(record.clone())
            } else if changed {
                c.sync(record)
            } else {
                false
            }
        });

        match outcome {
            Some(pushed) => {
                self.registered = true;
                source.take_changes();
                pushed
            }
            None => {
                if self.registered {
                    debug!("decal '{}': compositor went away, will retry", self.record.name);
                }
                self.registered = false;
                false
            }
        }
    }

    /// Push the source's current values right now, registering if needed.
    pub fn force_refresh(&mut self, source: &mut DecalSource) -> bool {
        source.apply_to(&mut self.record);
        let record = &self.record;
        let outcome = self.slot.with_compositor(|c| {
            if c.contains(record.id()) {
                c.sync(record)
            } else {
                c.register(record.clone())
            }
        });
        self.registered = outcome.unwrap_or(false);
        if self.registered {
            source.take_changes();
        }
        self.registered
    }

    /// Remove the record from the compositor.
    pub fn shutdown(&mut self) {
        let id = self.record.id();
        if self.slot.with_compositor(|c| c.unregister(id)).is_none() && self.registered {
            warn!(
                "decal '{}': compositor unavailable at shutdown, record not removed",
                self.record.name
            );
        }
        self.registered = false;
        self.initialized = false;
    }

    pub fn id(&self) -> DecalId {
        self.record.id()
    }

    /// The adapter's copy of the record.
    pub fn record(&self) -> &DecalRecord {
        &self.record
    }

    /// Whether the last contact with the compositor succeeded.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn slot(&self) -> &CompositorSlot<B> {
        &self.slot
    }
}
