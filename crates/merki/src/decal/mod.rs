//! Decals: the record the compositor draws, the projection math behind it,
//! the editable source the user manipulates, and the adapter that keeps the
//! two in sync.

mod binding;
pub mod projection;
mod record;
mod source;

pub use binding::BindingAdapter;
pub use projection::ProjectionVolume;
pub use record::{BlendMode, DecalId, DecalRecord, DEFAULT_DEPTH, DEFAULT_SIZE};
pub use source::DecalSource;
