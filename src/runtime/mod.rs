//! Runtime environment for the scheduler.
//!
//! - [`SchedulerConfig`] - scheduler-wide settings (settle window, priority hints,
//!   default loading screen, sentinel scene)
//! - [`setup_tracing`] - initializes the tracing/logging infrastructure

pub mod config;
pub mod tracing;

pub use config::*;
pub use tracing::*;
