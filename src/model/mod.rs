//! Pure data structures describing scenes, collections and live scene handles.

pub mod collection;
pub mod open_scene;
pub mod scene;

pub use collection::*;
pub use open_scene::*;
pub use scene::*;
