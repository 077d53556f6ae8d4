use super::LoadSlot;
use crate::framework::{ActionContext, ActionKind, ActionState, ProgressReporter, SceneAction};
use crate::model::SceneId;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Activates the scene its paired load action produced.
pub struct FinishLoadAction {
    scene: SceneId,
    slot: LoadSlot,
    state: Arc<ActionState>,
}

impl FinishLoadAction {
    pub fn new(scene: SceneId, slot: LoadSlot) -> Self {
        Self {
            scene,
            slot,
            state: ActionState::new(),
        }
    }
}

#[async_trait]
impl SceneAction for FinishLoadAction {
    fn kind(&self) -> ActionKind {
        ActionKind::FinishLoad
    }

    fn state(&self) -> &Arc<ActionState> {
        &self.state
    }

    fn scene(&self) -> Option<SceneId> {
        Some(self.scene.clone())
    }

    fn should_run(&self, _ctx: &ActionContext) -> bool {
        self.slot
            .get()
            .is_some_and(|open| open.is_open() && open.is_preloaded())
    }

    async fn run(&self, ctx: &ActionContext) {
        let Some(open) = self.slot.get() else {
            return;
        };
        let Some(handle) = open.handle() else {
            return;
        };

        let progress = ProgressReporter::new(self.state.clone());
        match ctx.provider().activate(&handle, progress).await {
            Ok(()) => {
                open.mark_activated();
                debug!(scene = %self.scene, "Activated");
            }
            Err(e) => warn!(scene = %self.scene, error = %e, "Activation failed"),
        }
    }
}
