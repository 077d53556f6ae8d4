//! The operation scheduling engine.
//!
//! # Main Components
//!
//! - [`SceneAction`] - One asynchronous step of an operation, tagged with an [`ActionKind`]
//! - [`Composer`] - Turns declared intents into the ordered action list
//! - [`SceneOperation`] - A queued, cancellable run of composed actions
//! - [`OperationQueue`] - Process-wide FIFO that lets one operation run at a time
//! - [`OverrideRegistry`] - Per-scene replacement bodies for load/unload actions
//! - [`Scheduler`] - Owns all of the above plus the provider and the scene manager
//!
//! # Testing
//!
//! See [`mock`] for an in-memory [`SceneProvider`](crate::adapters::SceneProvider).

pub mod action;
pub mod cancel;
pub mod composer;
pub mod error;
pub mod events;
pub mod mock;
pub mod operation;
pub mod overrides;
pub mod phase;
pub mod queue;
pub mod scheduler;

pub use action::*;
pub use cancel::CancellationToken;
pub use composer::*;
pub use error::SceneError;
pub use events::*;
pub use operation::*;
pub use overrides::*;
pub use phase::Phase;
pub use queue::OperationQueue;
pub use scheduler::*;
