use super::LoadSlot;
use crate::framework::{ActionContext, ActionKind, ActionState, SceneAction};
use crate::model::OpenScene;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Restores cross-scene references once, after every load of the operation.
pub struct RestoreReferencesAction {
    slots: Vec<LoadSlot>,
    state: Arc<ActionState>,
}

impl RestoreReferencesAction {
    pub fn new(slots: Vec<LoadSlot>) -> Self {
        Self {
            slots,
            state: ActionState::new(),
        }
    }

    fn loaded(&self) -> Vec<Arc<OpenScene>> {
        self.slots
            .iter()
            .filter_map(|slot| slot.get())
            .filter(|open| open.is_open())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SceneAction for RestoreReferencesAction {
    fn kind(&self) -> ActionKind {
        ActionKind::RestoreReferences
    }

    fn state(&self) -> &Arc<ActionState> {
        &self.state
    }

    fn should_run(&self, _ctx: &ActionContext) -> bool {
        !self.loaded().is_empty()
    }

    async fn run(&self, ctx: &ActionContext) {
        let scenes = self.loaded();
        ctx.provider().restore_cross_references(&scenes).await;
        debug!(scenes = scenes.len(), "Cross-scene references restored");
    }
}
