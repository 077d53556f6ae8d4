//! Concrete [`SceneAction`](crate::framework::SceneAction) implementations.
//!
//! The composer emits these in a fixed order: close callbacks, unloads, loads,
//! finish-loads, one cross-reference restore, open callbacks, then custom actions.
//! Actions that depend on a load (finish-load, restore, open callbacks) share a
//! [`LoadSlot`] with it and read the handle lazily once the load has run.

pub mod callbacks;
pub mod custom;
pub mod finish_load;
pub mod load;
pub mod references;
pub mod unload;

pub use callbacks::*;
pub use custom::*;
pub use finish_load::*;
pub use load::*;
pub use references::*;
pub use unload::*;

use crate::model::OpenScene;
use std::sync::{Arc, OnceLock};

/// Filled by a load action with the scene it opened.
pub type LoadSlot = Arc<OnceLock<Arc<OpenScene>>>;

pub fn empty_slot() -> LoadSlot {
    Arc::new(OnceLock::new())
}

/// A slot that already holds `scene`, for actions that follow a load done earlier.
pub fn filled_slot(scene: Arc<OpenScene>) -> LoadSlot {
    let slot = empty_slot();
    let _ = slot.set(scene);
    slot
}
