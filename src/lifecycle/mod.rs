//! Scene lifecycle: the live scene set and the system that drives it.
//!
//! # Main Components
//!
//! - [`SceneManager`] - Live handles, current collection, active scene and scene callbacks
//! - [`SceneSystem`] - Wires the scheduler together and exposes convenience factories

pub mod manager;
pub mod scene_system;

pub use manager::*;
pub use scene_system::*;
