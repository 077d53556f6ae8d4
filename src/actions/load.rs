use super::LoadSlot;
use crate::framework::{
    ActionContext, ActionKind, ActionState, OverrideContext, OverrideKind, ProgressReporter,
    SceneAction,
};
use crate::adapters::ProviderError;
use crate::model::{OpenScene, Scene, SceneId};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Loads a scene and binds a fresh [`OpenScene`] into the manager.
///
/// The new handle is left preloaded; the paired
/// [`FinishLoadAction`](super::FinishLoadAction) activates it. Unless forced, a scene
/// that is already open is skipped.
pub struct LoadAction {
    scene: Scene,
    slot: LoadSlot,
    force: bool,
    state: Arc<ActionState>,
}

impl LoadAction {
    pub fn new(scene: Scene, slot: LoadSlot) -> Self {
        Self {
            scene,
            slot,
            force: false,
            state: ActionState::new(),
        }
    }

    /// Loads another instance even if the scene is already open.
    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn slot(&self) -> &LoadSlot {
        &self.slot
    }

    fn bind(&self, ctx: &ActionContext, open: Arc<OpenScene>) {
        ctx.manager().track(open.clone());
        let _ = self.slot.set(open);
    }
}

#[async_trait]
impl SceneAction for LoadAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Load
    }

    fn state(&self) -> &Arc<ActionState> {
        &self.state
    }

    fn scene(&self) -> Option<SceneId> {
        Some(self.scene.id().clone())
    }

    fn should_run(&self, ctx: &ActionContext) -> bool {
        self.force || !ctx.manager().is_open(self.scene.id())
    }

    async fn run(&self, ctx: &ActionContext) {
        let scene_id = self.scene.id();

        if self.force && ctx.manager().is_open(scene_id) {
            debug!(scene = %scene_id, "Forced load of an open scene");
        } else if let Some(handle) = ctx.provider().is_already_loaded(scene_id) {
            debug!(scene = %scene_id, "Adopting scene the provider already holds");
            let open = OpenScene::new(self.scene.clone(), handle);
            open.mark_activated();
            self.bind(ctx, open);
            return;
        }

        let progress = ProgressReporter::new(self.state.clone());
        let result = match ctx.overrides().get(scene_id, OverrideKind::Load) {
            Some(body) => body
                .run(OverrideContext {
                    scene: self.scene.clone(),
                    handle: None,
                    progress,
                })
                .await
                .and_then(|handle| handle.ok_or_else(|| ProviderError::Unresolved(scene_id.clone()))),
            None => ctx.provider().load(&self.scene, progress).await,
        };

        match result {
            Ok(handle) => {
                self.bind(ctx, OpenScene::new(self.scene.clone(), handle));
                info!(scene = %scene_id, "Loaded");
            }
            Err(e) => warn!(scene = %scene_id, error = %e, "Load failed"),
        }
    }
}
