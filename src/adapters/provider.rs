//! # Scene Provider
//!
//! The engine-facing side of the scheduler. Load and unload actions call into a
//! [`SceneProvider`]; the provider reports progress through the [`ProgressReporter`]
//! it is handed and resolves to a [`LoadHandle`] identifying the live scene.
//!
//! Progress convention: `load` reports in `[0.0, 0.9]` while transferring, `activate`
//! covers `[0.9, 1.0]` until the scene is fully live.

use crate::framework::ProgressReporter;
use crate::model::{OpenScene, Scene, SceneId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Opaque token for a scene the provider has loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadHandle {
    scene: SceneId,
    token: u64,
}

impl LoadHandle {
    pub fn new(scene: SceneId, token: u64) -> Self {
        Self { scene, token }
    }

    pub fn scene(&self) -> &SceneId {
        &self.scene
    }

    pub fn token(&self) -> u64 {
        self.token
    }
}

/// Process-wide background loading priority hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum LoadPriority {
    Low,
    BelowNormal,
    #[default]
    Normal,
    High,
}

/// Errors a provider can report. Actions log them and move on.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ProviderError {
    #[error("Scene not found: {0}")]
    NotFound(SceneId),
    #[error("Load failed for {scene}: {reason}")]
    LoadFailed { scene: SceneId, reason: String },
    #[error("Unload failed for {scene}: {reason}")]
    UnloadFailed { scene: SceneId, reason: String },
    #[error("Activation failed for {scene}: {reason}")]
    ActivationFailed { scene: SceneId, reason: String },
    #[error("Load handle for {0} could not be resolved")]
    Unresolved(SceneId),
}

#[async_trait]
pub trait SceneProvider: Send + Sync + 'static {
    /// Begins loading `scene` and resolves once it is loaded but not yet activated.
    async fn load(
        &self,
        scene: &Scene,
        progress: ProgressReporter,
    ) -> Result<LoadHandle, ProviderError>;

    /// Finalizes a loaded scene.
    async fn activate(
        &self,
        handle: &LoadHandle,
        progress: ProgressReporter,
    ) -> Result<(), ProviderError>;

    async fn unload(
        &self,
        handle: &LoadHandle,
        progress: ProgressReporter,
    ) -> Result<(), ProviderError>;

    /// A scene the provider already holds live, e.g. one loaded before the scheduler
    /// existed.
    fn is_already_loaded(&self, _scene: &SceneId) -> Option<LoadHandle> {
        None
    }

    /// Re-links references between the scenes an operation just loaded.
    async fn restore_cross_references(&self, _scenes: &[Arc<OpenScene>]) {}

    /// Frees assets no longer referenced by any open scene.
    async fn release_unused(&self) {}

    fn set_load_priority(&self, _priority: LoadPriority) {}
}
