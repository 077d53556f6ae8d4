//! # Scene Ops
//!
//! > **A queued, cancellable scene operation scheduler for Tokio.**
//!
//! This crate moves named scenes between closed, loaded and active states. Every change
//! is an **operation**: a list of asynchronous **actions** composed from declared
//! intents (open these, close those, reopen that), executed one at a time through a
//! global FIFO queue, with aggregate progress, loading screens and per-scene overrides.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Intents in, actions out
//! Callers never write action lists by hand. They declare what should be open and what
//! should be closed; the [`Composer`](framework::Composer) turns that into a fixed
//! phase order (close callbacks, unloads, loads, finish-loads, reference restore, open
//! callbacks, custom actions) once the operation reaches the head of the queue, so it
//! always sees the state earlier operations left behind.
//!
//! ### One operation at a time
//! The [`OperationQueue`](framework::OperationQueue) runs queued operations strictly in
//! creation order. Presentation work such as loading screens opts out of the queue so it
//! is never blocked by the operation it decorates.
//!
//! ### Failures stay local
//! Configuration mistakes surface immediately as [`SceneError`](framework::SceneError).
//! Provider failures and failing callbacks are logged and absorbed by the action that
//! hit them; one broken scene cannot stall the queue.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! Actions, the composer, operations, the queue, overrides and the [`Scheduler`](framework::Scheduler)
//! that owns them.
//!
//! ### 2. The Built-in Steps ([`actions`])
//! One [`SceneAction`](framework::SceneAction) per phase plus closures as custom actions.
//!
//! ### 3. The Collaborators ([`adapters`])
//! [`SceneProvider`](adapters::SceneProvider) for the engine and
//! [`LoadingScreenAdapter`](adapters::LoadingScreenAdapter) for loading screens.
//!
//! ### 4. The Orchestrator ([`lifecycle`])
//! [`SceneManager`](lifecycle::SceneManager) tracks live scenes and callbacks;
//! [`SceneSystem`](lifecycle::SceneSystem) is the front door.
//!
//! ### 5. Data ([`model`]) and Runtime ([`runtime`])
//! Scenes, collections and open scene handles; configuration and tracing setup.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with info logs
//! RUST_LOG=info cargo run
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod actions;
pub mod adapters;
pub mod framework;
pub mod lifecycle;
pub mod model;
pub mod runtime;

mod sync;
