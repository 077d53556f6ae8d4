//! # Action Overrides
//!
//! External code can replace the body of the load or unload action for a specific
//! scene, e.g. to load it through an alternate provider. The override still reports
//! progress through [`OverrideContext::progress`] and signals completion by resolving.
//!
//! A load override must resolve to the [`LoadHandle`] it produced.
//!
//! ```
//! use scene_ops::framework::{OverrideContext, OverrideKind, OverrideRegistry};
//! use scene_ops::adapters::{LoadHandle, ProviderError};
//!
//! let registry = OverrideRegistry::new();
//! registry.register("dlc/arena", OverrideKind::Load, |ctx: OverrideContext| async move {
//!     ctx.progress.report(1.0);
//!     Ok::<_, ProviderError>(Some(LoadHandle::new(ctx.scene.id().clone(), 42)))
//! });
//! assert!(registry.get(&"dlc/arena".into(), OverrideKind::Load).is_some());
//! ```

use super::action::ProgressReporter;
use crate::adapters::{LoadHandle, ProviderError};
use crate::model::{Scene, SceneId};
use crate::sync::lock;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideKind {
    Load,
    Unload,
}

/// Inputs handed to an override body.
#[derive(Debug, Clone)]
pub struct OverrideContext {
    pub scene: Scene,
    /// The live handle, for unload overrides.
    pub handle: Option<LoadHandle>,
    pub progress: ProgressReporter,
}

#[async_trait]
pub trait ActionOverride: Send + Sync + 'static {
    async fn run(&self, ctx: OverrideContext) -> Result<Option<LoadHandle>, ProviderError>;
}

#[async_trait]
impl<F, Fut> ActionOverride for F
where
    F: Fn(OverrideContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<LoadHandle>, ProviderError>> + Send + 'static,
{
    async fn run(&self, ctx: OverrideContext) -> Result<Option<LoadHandle>, ProviderError> {
        (self)(ctx).await
    }
}

#[derive(Default)]
pub struct OverrideRegistry {
    bodies: Mutex<HashMap<(SceneId, OverrideKind), Arc<dyn ActionOverride>>>,
}

impl OverrideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `body` for `scene`, replacing any previous override of the same kind.
    pub fn register(
        &self,
        scene: impl Into<SceneId>,
        kind: OverrideKind,
        body: impl ActionOverride,
    ) {
        let scene = scene.into();
        debug!(scene = %scene, ?kind, "Override registered");
        lock(&self.bodies).insert((scene, kind), Arc::new(body));
    }

    /// Removes every override registered for `scene`.
    pub fn unregister(&self, scene: &SceneId) -> bool {
        let mut bodies = lock(&self.bodies);
        let before = bodies.len();
        bodies.retain(|(id, _), _| id != scene);
        bodies.len() != before
    }

    pub fn unregister_kind(&self, scene: &SceneId, kind: OverrideKind) -> bool {
        lock(&self.bodies).remove(&(scene.clone(), kind)).is_some()
    }

    pub fn get(&self, scene: &SceneId, kind: OverrideKind) -> Option<Arc<dyn ActionOverride>> {
        lock(&self.bodies).get(&(scene.clone(), kind)).cloned()
    }
}
