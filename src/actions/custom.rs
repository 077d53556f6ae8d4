//! Caller-supplied actions appended after the composed scene actions.

use crate::framework::{
    await_guarded, invoke_guarded, ActionContext, ActionKind, ActionState, BoxFuture,
    CallbackResult, ProgressReporter, SceneAction,
};
use crate::sync::lock;
use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Mutex};

type SyncBody = Box<dyn FnOnce(&ActionContext) -> CallbackResult + Send>;
type AsyncBody = Box<dyn FnOnce(ActionContext, ProgressReporter) -> BoxFuture<CallbackResult> + Send>;

/// Runs a synchronous closure as an action.
pub struct CallbackAction {
    body: Mutex<Option<SyncBody>>,
    state: Arc<ActionState>,
}

impl CallbackAction {
    pub fn new(body: impl FnOnce(&ActionContext) -> CallbackResult + Send + 'static) -> Self {
        Self {
            body: Mutex::new(Some(Box::new(body))),
            state: ActionState::new(),
        }
    }
}

#[async_trait]
impl SceneAction for CallbackAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Custom
    }

    fn state(&self) -> &Arc<ActionState> {
        &self.state
    }

    async fn run(&self, ctx: &ActionContext) {
        let body = lock(&self.body).take();
        if let Some(body) = body {
            invoke_guarded("custom action", || body(ctx));
        }
    }
}

/// Runs an asynchronous body as an action. The body may report its own progress.
pub struct AsyncAction {
    body: Mutex<Option<AsyncBody>>,
    state: Arc<ActionState>,
}

impl AsyncAction {
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(ActionContext, ProgressReporter) -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        Self {
            body: Mutex::new(Some(Box::new(move |ctx, progress| {
                Box::pin(body(ctx, progress)) as BoxFuture<CallbackResult>
            }))),
            state: ActionState::new(),
        }
    }
}

#[async_trait]
impl SceneAction for AsyncAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Custom
    }

    fn state(&self) -> &Arc<ActionState> {
        &self.state
    }

    async fn run(&self, ctx: &ActionContext) {
        let body = lock(&self.body).take();
        if let Some(body) = body {
            let future = body(ctx.clone(), ProgressReporter::new(self.state.clone()));
            await_guarded("custom async action", future).await;
        }
    }
}
