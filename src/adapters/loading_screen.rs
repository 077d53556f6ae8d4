//! # Loading Screens
//!
//! A loading screen is an optional stage wrapped around an operation's action phases.
//! The operation opens it before its first action, reports phase changes to it while
//! actions run, and closes it after the completion callbacks.
//!
//! [`SceneLoadingScreens`] is the stock adapter: the screen is just another scene,
//! opened and closed by operations that bypass the queue so they are never blocked by
//! the very operation they decorate.

use crate::framework::{OperationConfig, Phase, SceneOperation, Scheduler};
use crate::model::{OpenScene, Scene};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// A loading screen that is currently shown.
#[derive(Debug, Clone)]
pub struct LoadingScreenHandle {
    scene: Arc<OpenScene>,
}

impl LoadingScreenHandle {
    pub fn new(scene: Arc<OpenScene>) -> Self {
        Self { scene }
    }

    pub fn scene(&self) -> &Arc<OpenScene> {
        &self.scene
    }
}

#[async_trait]
pub trait LoadingScreenAdapter: Send + Sync + 'static {
    /// Shows `scene` on behalf of `parent`; resolves once the screen is fully open.
    async fn open(
        &self,
        scheduler: &Scheduler,
        scene: &Scene,
        parent: &SceneOperation,
    ) -> Option<LoadingScreenHandle>;

    async fn close(&self, scheduler: &Scheduler, screen: LoadingScreenHandle);

    fn phase_changed(&self, _operation: &SceneOperation, _previous: Option<Phase>, _next: Phase) {}

    /// Called when the decorated operation is cancelled. Closes the screen by default.
    async fn cancelled(
        &self,
        scheduler: &Scheduler,
        _operation: &SceneOperation,
        screen: Option<LoadingScreenHandle>,
    ) {
        if let Some(screen) = screen {
            self.close(scheduler, screen).await;
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SceneLoadingScreens;

#[async_trait]
impl LoadingScreenAdapter for SceneLoadingScreens {
    async fn open(
        &self,
        scheduler: &Scheduler,
        scene: &Scene,
        parent: &SceneOperation,
    ) -> Option<LoadingScreenHandle> {
        let config = OperationConfig::presentation().with_open(scene.clone(), false);
        let operation = scheduler.spawn_operation(config);
        if let Err(e) = operation.set_parent(parent) {
            warn!(error = %e, "Loading screen could not be linked to its operation");
        }
        let outcome = operation.wait().await;

        let opened = outcome
            .opened
            .into_iter()
            .find(|open| open.scene_id() == scene.id())
            .or_else(|| scheduler.manager().find_open(scene.id()));
        debug!(scene = %scene.id(), shown = opened.is_some(), "Loading screen opened");
        opened.map(LoadingScreenHandle::new)
    }

    async fn close(&self, scheduler: &Scheduler, screen: LoadingScreenHandle) {
        let config = OperationConfig::presentation().with_close_handle(screen.scene.clone(), true);
        scheduler.spawn_operation(config).wait().await;
        debug!(scene = %screen.scene.scene_id(), "Loading screen closed");
    }
}
