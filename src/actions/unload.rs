use crate::framework::{
    ActionContext, ActionKind, ActionState, OverrideContext, OverrideKind, ProgressReporter,
    SceneAction,
};
use crate::model::{OpenScene, SceneId};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Unloads a live scene and drops it from the manager's open set.
///
/// A provider failure is logged and the scene stays tracked, since the provider still
/// holds it.
pub struct UnloadAction {
    scene: Arc<OpenScene>,
    state: Arc<ActionState>,
}

impl UnloadAction {
    pub fn new(scene: Arc<OpenScene>) -> Self {
        Self {
            scene,
            state: ActionState::new(),
        }
    }
}

#[async_trait]
impl SceneAction for UnloadAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Unload
    }

    fn state(&self) -> &Arc<ActionState> {
        &self.state
    }

    fn scene(&self) -> Option<SceneId> {
        Some(self.scene.scene_id().clone())
    }

    fn should_run(&self, _ctx: &ActionContext) -> bool {
        self.scene.is_open()
    }

    async fn run(&self, ctx: &ActionContext) {
        let Some(handle) = self.scene.handle() else {
            return;
        };
        let scene_id = self.scene.scene_id();
        let progress = ProgressReporter::new(self.state.clone());

        let result = match ctx.overrides().get(scene_id, OverrideKind::Unload) {
            Some(body) => body
                .run(OverrideContext {
                    scene: self.scene.scene().clone(),
                    handle: Some(handle.clone()),
                    progress,
                })
                .await
                .map(|_| ()),
            None => ctx.provider().unload(&handle, progress).await,
        };

        match result {
            Ok(()) => {
                self.scene.clear_handle();
                ctx.manager().untrack(&self.scene);
                info!(scene = %scene_id, "Unloaded");
            }
            Err(e) => warn!(scene = %scene_id, error = %e, "Unload failed"),
        }
    }
}
