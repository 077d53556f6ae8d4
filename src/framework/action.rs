//! # Actions
//!
//! An action is one atomic, asynchronous step of an operation: run close callbacks,
//! unload a scene, load a scene, and so on. Every action carries an explicit
//! [`ActionKind`] tag, which is all the operation needs to derive its [`Phase`].
//!
//! ## Lifecycle
//!
//! 1. **Pre-check** - [`SceneAction::should_run`]. Returning `false` finishes the action
//!    immediately (status [`ActionStatus::Skipped`]); it still counts as a pipeline step.
//! 2. **Run** - [`SceneAction::run`], raced against the operation's cancellation token.
//! 3. **Done** - resolving `run` completes the action and pins its progress at `1.0`.
//!
//! An action runs at most once. Progress only ever grows.

use super::cancel::CancellationToken;
use super::operation::OperationId;
use super::overrides::OverrideRegistry;
use super::phase::Phase;
use super::scheduler::Scheduler;
use crate::adapters::SceneProvider;
use crate::lifecycle::SceneManager;
use crate::model::{SceneCollection, SceneId};
use crate::sync::lock;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    CloseCallback,
    Unload,
    Load,
    FinishLoad,
    RestoreReferences,
    OpenCallback,
    Custom,
}

impl ActionKind {
    pub fn phase(self) -> Phase {
        match self {
            ActionKind::CloseCallback => Phase::CloseCallbacks,
            ActionKind::Unload => Phase::UnloadScenes,
            ActionKind::Load => Phase::LoadScenes,
            ActionKind::FinishLoad | ActionKind::RestoreReferences => Phase::FinishLoad,
            ActionKind::OpenCallback => Phase::OpenCallbacks,
            ActionKind::Custom => Phase::CustomActions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Pending,
    Running,
    /// Finished during the pre-check without doing any work.
    Skipped,
    Completed,
    /// Interrupted by cancellation.
    Stopped,
}

/// Done-state and progress of a single action.
#[derive(Debug)]
pub struct ActionState {
    status: Mutex<ActionStatus>,
    // f32 bits; non-negative floats order the same way as their bit patterns.
    progress: AtomicU32,
}

impl ActionState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(ActionStatus::Pending),
            progress: AtomicU32::new(0),
        })
    }

    pub fn status(&self) -> ActionStatus {
        *lock(&self.status)
    }

    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::SeqCst))
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status(), ActionStatus::Skipped | ActionStatus::Completed)
    }

    /// Raises progress to `value`; lower values are ignored.
    pub fn report(&self, value: f32) {
        self.progress
            .fetch_max(unit_interval(value).to_bits(), Ordering::SeqCst);
    }

    pub(crate) fn set_status(&self, status: ActionStatus) {
        *lock(&self.status) = status;
    }

    pub(crate) fn complete(&self) {
        self.report(1.0);
        self.set_status(ActionStatus::Completed);
    }

    pub(crate) fn skip(&self) {
        self.report(1.0);
        self.set_status(ActionStatus::Skipped);
    }
}

/// Clamps to `[0, 1]` with NaN and negative zero mapped to `+0.0`, so the bit pattern
/// can be compared with `fetch_max`.
pub(crate) fn unit_interval(value: f32) -> f32 {
    if value.is_nan() || value <= 0.0 {
        0.0
    } else {
        value.min(1.0)
    }
}

/// Handed to providers and override bodies so they can report progress for the action
/// they are serving.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    state: Arc<ActionState>,
}

impl ProgressReporter {
    pub fn new(state: Arc<ActionState>) -> Self {
        Self { state }
    }

    /// A reporter not attached to any action.
    pub fn detached() -> Self {
        Self::new(ActionState::new())
    }

    pub fn report(&self, value: f32) {
        self.state.report(value);
    }

    pub fn progress(&self) -> f32 {
        self.state.progress()
    }
}

/// What an action may query about the operation it belongs to.
#[derive(Clone)]
pub struct ActionContext {
    scheduler: Scheduler,
    operation: OperationId,
    collection: Option<Arc<SceneCollection>>,
    cancel: CancellationToken,
}

impl ActionContext {
    pub(crate) fn new(
        scheduler: Scheduler,
        operation: OperationId,
        collection: Option<Arc<SceneCollection>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            scheduler,
            operation,
            collection,
            cancel,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn manager(&self) -> &SceneManager {
        self.scheduler.manager()
    }

    pub fn provider(&self) -> &dyn SceneProvider {
        self.scheduler.provider()
    }

    pub fn overrides(&self) -> &OverrideRegistry {
        self.scheduler.overrides()
    }

    pub fn operation(&self) -> OperationId {
        self.operation
    }

    pub fn collection(&self) -> Option<&Arc<SceneCollection>> {
        self.collection.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Snapshot of one composed action, for inspection and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub kind: ActionKind,
    pub scene: Option<SceneId>,
    pub status: ActionStatus,
    pub progress: f32,
}

#[async_trait]
pub trait SceneAction: Send + Sync + 'static {
    fn kind(&self) -> ActionKind;

    fn state(&self) -> &Arc<ActionState>;

    /// The scene this action works on, if any.
    fn scene(&self) -> Option<SceneId> {
        None
    }

    /// Pre-check run right before [`SceneAction::run`].
    fn should_run(&self, _ctx: &ActionContext) -> bool {
        true
    }

    async fn run(&self, ctx: &ActionContext);

    fn progress(&self) -> f32 {
        self.state().progress()
    }

    fn is_done(&self) -> bool {
        self.state().is_done()
    }

    fn record(&self) -> ActionRecord {
        let state = self.state();
        ActionRecord {
            kind: self.kind(),
            scene: self.scene(),
            status: state.status(),
            progress: state.progress(),
        }
    }
}

/// Drives one action to completion, stopping it if the operation is cancelled.
pub(crate) async fn execute(action: &dyn SceneAction, ctx: &ActionContext) -> ActionStatus {
    let state = action.state();
    if state.status() != ActionStatus::Pending {
        warn!(kind = ?action.kind(), "Action already ran");
        return state.status();
    }

    if !action.should_run(ctx) {
        debug!(kind = ?action.kind(), scene = ?action.scene(), "Skipped");
        state.skip();
        return ActionStatus::Skipped;
    }

    state.set_status(ActionStatus::Running);
    tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => {
            state.set_status(ActionStatus::Stopped);
            ActionStatus::Stopped
        }
        _ = action.run(ctx) => {
            state.complete();
            ActionStatus::Completed
        }
    }
}
