//! Actions that run the per-scene open/close callbacks registered on the manager.

use super::LoadSlot;
use crate::framework::{ActionContext, ActionKind, ActionState, SceneAction};
use crate::model::{OpenScene, SceneId};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Runs close callbacks for a scene that is about to be unloaded.
pub struct CloseCallbackAction {
    scene: Arc<OpenScene>,
    state: Arc<ActionState>,
}

impl CloseCallbackAction {
    pub fn new(scene: Arc<OpenScene>) -> Self {
        Self {
            scene,
            state: ActionState::new(),
        }
    }
}

#[async_trait]
impl SceneAction for CloseCallbackAction {
    fn kind(&self) -> ActionKind {
        ActionKind::CloseCallback
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
        let invoked = ctx.manager().notify_closing(&self.scene, ctx.operation());
        debug!(scene = %self.scene.scene_id(), invoked, "Close callbacks");
    }
}

/// Runs open callbacks for the scene its paired load action produced.
pub struct OpenCallbackAction {
    scene: SceneId,
    slot: LoadSlot,
    state: Arc<ActionState>,
}

impl OpenCallbackAction {
    pub fn new(scene: SceneId, slot: LoadSlot) -> Self {
        Self {
            scene,
            slot,
            state: ActionState::new(),
        }
    }
}

#[async_trait]
impl SceneAction for OpenCallbackAction {
    fn kind(&self) -> ActionKind {
        ActionKind::OpenCallback
    }

    fn state(&self) -> &Arc<ActionState> {
        &self.state
    }

    fn scene(&self) -> Option<SceneId> {
        Some(self.scene.clone())
    }

    fn should_run(&self, _ctx: &ActionContext) -> bool {
        self.slot.get().is_some_and(|open| open.is_open())
    }

    async fn run(&self, ctx: &ActionContext) {
        if let Some(open) = self.slot.get() {
            let invoked = ctx.manager().notify_opened(open, ctx.operation());
            debug!(scene = %self.scene, invoked, "Open callbacks");
        }
    }
}
