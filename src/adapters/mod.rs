//! Interfaces to the collaborators the scheduler drives but does not own.
//!
//! - [`SceneProvider`] physically loads, activates and unloads scenes.
//! - [`LoadingScreenAdapter`] wraps an operation's action phases in a loading screen.

pub mod loading_screen;
pub mod provider;

pub use loading_screen::*;
pub use provider::*;
