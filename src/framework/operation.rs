//! # Scene Operations
//!
//! A [`SceneOperation`] is a queued, cancellable run of composed actions. It is created
//! by the [`Scheduler`], configured fluently during a short settle window, and then
//! driven by its own tokio task:
//!
//! 1. settle, then lock the configuration
//! 2. wait for the head of the queue (unless it bypasses the queue)
//! 3. compose the action list
//! 4. open the loading screen, if any
//! 5. apply the load priority hint (queue head only)
//! 6. collection will-close / will-open events
//! 7. run every action in order
//! 8. pick the active scene
//! 9. run caller callbacks
//! 10. release unused assets
//! 11. run completion callbacks
//! 12. collection closed / opened events
//! 13. close the loading screen
//! 14. dequeue
//!
//! Cancellation is checked between steps and raced against each running action. A
//! cancelled operation resets the priority hint, tells its loading screen, runs its
//! `on_cancel` callbacks and leaves the queue without running the remaining steps.
//! Caller callbacks already started always run to completion first.
//!
//! ```ignore
//! let op = scheduler.operation();
//! op.open(Scene::new("levels/arena"))?
//!     .close(&menu)?
//!     .on_complete(|_| {
//!         tracing::info!("Arena ready");
//!         Ok(())
//!     })?;
//! let outcome = op.wait().await;
//! ```

use super::action::{
    execute, unit_interval, ActionContext, ActionRecord, ActionStatus, ProgressReporter,
    SceneAction,
};
use super::cancel::CancellationToken;
use super::composer::{CloseIntent, CloseTarget, ComposedPlan, Composer, Intents, OpenIntent};
use super::error::SceneError;
use super::events::{await_guarded, invoke_guarded, BoxFuture, CallbackResult, CollectionEventKind};
use super::phase::Phase;
use super::scheduler::Scheduler;
use crate::actions::{AsyncAction, CallbackAction, LoadSlot};
use crate::adapters::{LoadPriority, LoadingScreenHandle};
use crate::model::{LoadingScreenUsage, OpenBehavior, OpenScene, Scene, SceneCollection, SceneId};
use crate::sync::lock;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, info_span, Instrument};

static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl OperationId {
    fn next() -> Self {
        Self(NEXT_OPERATION_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// Which loading screen an operation shows.
#[derive(Debug, Clone, Default)]
pub enum LoadingScreenChoice {
    /// Whatever the associated collection asks for; none without a collection.
    #[default]
    Auto,
    Disabled,
    Scene(Scene),
}

/// How an operation changes the manager's current collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionTransition {
    /// The associated collection becomes current.
    Open,
    /// The current collection is cleared.
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub status: OperationStatus,
    /// Scenes this operation loaded, in load order.
    pub opened: Vec<Arc<OpenScene>>,
    /// Scenes this operation unloaded.
    pub closed: Vec<Arc<OpenScene>>,
}

impl OperationOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == OperationStatus::Completed
    }
}

type OperationCallback = Box<dyn FnOnce(&SceneOperation) -> CallbackResult + Send>;
type AsyncOperationCallback = Box<dyn FnOnce(SceneOperation) -> BoxFuture<CallbackResult> + Send>;

enum PostCallback {
    Sync(OperationCallback),
    Async(AsyncOperationCallback),
}

/// Everything an operation is told before it starts. Locked after the settle window.
#[derive(Default)]
pub struct OperationConfig {
    intents: Intents,
    collection: Option<Arc<SceneCollection>>,
    transition: Option<CollectionTransition>,
    loading_screen: LoadingScreenChoice,
    actions: Vec<Arc<dyn SceneAction>>,
    callbacks: Vec<PostCallback>,
    on_complete: Vec<OperationCallback>,
    on_cancel: Vec<OperationCallback>,
    bypass: bool,
    presentation: bool,
    release_unused: Option<bool>,
    load_priority: Option<LoadPriority>,
    focus: Option<SceneId>,
}

impl OperationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bypassing operation for presentation scenes such as loading screens. It never
    /// shows a loading screen itself, never changes the active scene and never
    /// releases unused assets.
    pub fn presentation() -> Self {
        Self {
            bypass: true,
            presentation: true,
            loading_screen: LoadingScreenChoice::Disabled,
            release_unused: Some(false),
            ..Self::default()
        }
    }

    pub fn bypass(mut self) -> Self {
        self.bypass = true;
        self
    }

    pub fn with_open(mut self, scene: Scene, force: bool) -> Self {
        self.intents.open.push(OpenIntent { scene, force });
        self
    }

    pub fn with_close(mut self, target: CloseTarget, force: bool) -> Self {
        self.intents.close.push(CloseIntent { target, force });
        self
    }

    pub fn with_close_handle(self, scene: Arc<OpenScene>, force: bool) -> Self {
        self.with_close(CloseTarget::Handle(scene), force)
    }

    pub fn with_reopen(mut self, scene: Arc<OpenScene>) -> Self {
        self.intents.reopen.push(scene);
        self
    }

    pub fn with_activate(mut self, scene: Arc<OpenScene>) -> Self {
        self.intents.activate.push(scene);
        self
    }

    pub fn with_collection(mut self, collection: Arc<SceneCollection>) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn with_transition(mut self, transition: CollectionTransition) -> Self {
        self.transition = Some(transition);
        self
    }

    pub fn with_loading_screen(mut self, choice: LoadingScreenChoice) -> Self {
        self.loading_screen = choice;
        self
    }

    pub fn preload(mut self) -> Self {
        self.intents.preload = true;
        self
    }

    pub fn with_release_unused(mut self, release: bool) -> Self {
        self.release_unused = Some(release);
        self
    }

    pub fn with_focus(mut self, scene: impl Into<SceneId>) -> Self {
        self.focus = Some(scene.into());
        self
    }

    pub(crate) fn is_bypass(&self) -> bool {
        self.bypass
    }
}

/// Returned by a checkpoint that observed cancellation.
struct Cancelled;

/// Per-run bookkeeping that outlives the composed plan.
#[derive(Default)]
struct RunState {
    loads: Vec<LoadSlot>,
    closes: Vec<Arc<OpenScene>>,
    screen: Option<LoadingScreenHandle>,
    applied_priority: bool,
}

impl RunState {
    fn opened(&self) -> Vec<Arc<OpenScene>> {
        self.loads.iter().filter_map(|slot| slot.get().cloned()).collect()
    }

    fn closed(&self) -> Vec<Arc<OpenScene>> {
        self.closes.iter().filter(|s| !s.is_open()).cloned().collect()
    }
}

struct Inner {
    id: OperationId,
    scheduler: Scheduler,
    config: Mutex<OperationConfig>,
    locked: AtomicBool,
    cancel: CancellationToken,
    phase: Mutex<Option<Phase>>,
    actions: Mutex<Vec<Arc<dyn SceneAction>>>,
    children: Mutex<Vec<SceneOperation>>,
    // f32 bits of the highest progress reported so far
    progress_mark: AtomicU32,
    outcome: watch::Sender<Option<OperationOutcome>>,
}

/// Handle to a scheduled operation. Cheap to clone.
#[derive(Clone)]
pub struct SceneOperation {
    inner: Arc<Inner>,
}

impl SceneOperation {
    pub(crate) fn new(scheduler: Scheduler, config: OperationConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: OperationId::next(),
                scheduler,
                config: Mutex::new(config),
                locked: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                phase: Mutex::new(None),
                actions: Mutex::new(Vec::new()),
                children: Mutex::new(Vec::new()),
                progress_mark: AtomicU32::new(0),
                outcome: watch::Sender::new(None),
            }),
        }
    }

    pub fn id(&self) -> OperationId {
        self.inner.id
    }

    fn configure(
        &self,
        apply: impl FnOnce(&mut OperationConfig) -> Result<(), SceneError>,
    ) -> Result<&Self, SceneError> {
        let mut config = lock(&self.inner.config);
        if self.inner.locked.load(Ordering::SeqCst) {
            return Err(SceneError::OperationLocked(self.id()));
        }
        apply(&mut config)?;
        Ok(self)
    }

    fn set(&self, apply: impl FnOnce(&mut OperationConfig)) -> Result<&Self, SceneError> {
        self.configure(|config| {
            apply(config);
            Ok(())
        })
    }

    // -------------------------------------------------------------------------
    // Intents
    // -------------------------------------------------------------------------

    pub fn open(&self, scene: Scene) -> Result<&Self, SceneError> {
        self.push_open(scene, false)
    }

    /// Opens `scene` even if it is already open or excluded by the collection.
    pub fn open_forced(&self, scene: Scene) -> Result<&Self, SceneError> {
        self.push_open(scene, true)
    }

    fn push_open(&self, scene: Scene, force: bool) -> Result<&Self, SceneError> {
        self.configure(|config| {
            let intent = OpenIntent { scene, force };
            if config.collection.is_some() {
                check_collection_open(&intent)?;
            }
            config.intents.open.push(intent);
            Ok(())
        })
    }

    pub fn close(&self, scene: &Arc<OpenScene>) -> Result<&Self, SceneError> {
        self.push_close(CloseTarget::Handle(scene.clone()), scene.scene_id(), false)
    }

    /// Closes `scene` regardless of its close behavior.
    pub fn close_forced(&self, scene: &Arc<OpenScene>) -> Result<&Self, SceneError> {
        self.push_close(CloseTarget::Handle(scene.clone()), scene.scene_id(), true)
    }

    /// Closes every open instance of `scene`, resolved when the operation starts.
    pub fn close_scene(&self, scene: impl Into<SceneId>) -> Result<&Self, SceneError> {
        let scene = scene.into();
        self.push_close(CloseTarget::Scene(scene.clone()), &scene, false)
    }

    pub fn close_all(&self) -> Result<&Self, SceneError> {
        self.set(|config| {
            config.intents.close.push(CloseIntent {
                target: CloseTarget::AllOpen,
                force: false,
            })
        })
    }

    fn push_close(
        &self,
        target: CloseTarget,
        scene: &SceneId,
        force: bool,
    ) -> Result<&Self, SceneError> {
        if self.inner.scheduler.config().sentinel_scene.as_ref() == Some(scene) {
            return Err(SceneError::NotPermitted {
                scene: scene.clone(),
                reason: "the sentinel scene is never closed".into(),
            });
        }
        self.set(|config| config.intents.close.push(CloseIntent { target, force }))
    }

    pub fn reopen(&self, scene: &Arc<OpenScene>) -> Result<&Self, SceneError> {
        let handle = scene.clone();
        self.set(|config| config.intents.reopen.push(handle))
    }

    /// Activates a scene left preloaded by an earlier operation.
    pub fn activate(&self, scene: &Arc<OpenScene>) -> Result<&Self, SceneError> {
        let handle = scene.clone();
        self.set(|config| config.intents.activate.push(handle))
    }

    /// Loads without activating. Open callbacks run once the scenes are activated.
    pub fn preload(&self) -> Result<&Self, SceneError> {
        self.set(|config| config.intents.preload = true)
    }

    // -------------------------------------------------------------------------
    // Options
    // -------------------------------------------------------------------------

    /// Associates a collection. Fails without changing anything if an earlier
    /// unforced open names a scene excluded from collection opens.
    pub fn with_collection(&self, collection: Arc<SceneCollection>) -> Result<&Self, SceneError> {
        self.configure(|config| {
            config.intents.open.iter().try_for_each(check_collection_open)?;
            config.collection = Some(collection);
            Ok(())
        })
    }

    pub fn with_loading_screen(&self, choice: LoadingScreenChoice) -> Result<&Self, SceneError> {
        self.set(|config| config.loading_screen = choice)
    }

    /// Runs outside the queue, alongside whatever operation is at its head.
    pub fn ignore_queue(&self) -> Result<&Self, SceneError> {
        self.set(|config| config.bypass = true)
    }

    /// Overrides whether unused assets are released afterwards. Defaults to `true` for
    /// operations associated with a collection.
    pub fn release_unused(&self, release: bool) -> Result<&Self, SceneError> {
        self.set(|config| config.release_unused = Some(release))
    }

    pub fn with_load_priority(&self, priority: LoadPriority) -> Result<&Self, SceneError> {
        self.set(|config| config.load_priority = Some(priority))
    }

    /// The scene to make active once the actions have run.
    pub fn focus(&self, scene: impl Into<SceneId>) -> Result<&Self, SceneError> {
        let scene = scene.into();
        self.set(|config| config.focus = Some(scene))
    }

    // -------------------------------------------------------------------------
    // Custom actions and callbacks
    // -------------------------------------------------------------------------

    /// Appends a raw action after the composed ones.
    pub fn with_action(&self, action: impl SceneAction) -> Result<&Self, SceneError> {
        let action: Arc<dyn SceneAction> = Arc::new(action);
        self.set(|config| config.actions.push(action))
    }

    pub fn with_callback_action(
        &self,
        body: impl FnOnce(&ActionContext) -> CallbackResult + Send + 'static,
    ) -> Result<&Self, SceneError> {
        self.with_action(CallbackAction::new(body))
    }

    pub fn with_async_action<F, Fut>(&self, body: F) -> Result<&Self, SceneError>
    where
        F: FnOnce(ActionContext, ProgressReporter) -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.with_action(AsyncAction::new(body))
    }

    /// Runs after the actions and the active scene update, outside the action list.
    pub fn with_callback(
        &self,
        callback: impl FnOnce(&SceneOperation) -> CallbackResult + Send + 'static,
    ) -> Result<&Self, SceneError> {
        self.set(|config| config.callbacks.push(PostCallback::Sync(Box::new(callback))))
    }

    pub fn with_async_callback<F, Fut>(&self, callback: F) -> Result<&Self, SceneError>
    where
        F: FnOnce(SceneOperation) -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        let callback: AsyncOperationCallback =
            Box::new(move |op| Box::pin(callback(op)) as BoxFuture<CallbackResult>);
        self.set(|config| config.callbacks.push(PostCallback::Async(callback)))
    }

    pub fn on_complete(
        &self,
        callback: impl FnOnce(&SceneOperation) -> CallbackResult + Send + 'static,
    ) -> Result<&Self, SceneError> {
        self.set(|config| config.on_complete.push(Box::new(callback)))
    }

    pub fn on_cancel(
        &self,
        callback: impl FnOnce(&SceneOperation) -> CallbackResult + Send + 'static,
    ) -> Result<&Self, SceneError> {
        self.set(|config| config.on_cancel.push(Box::new(callback)))
    }

    // -------------------------------------------------------------------------
    // Linking
    // -------------------------------------------------------------------------

    /// Registers this operation as a child of `parent`, for progress reporting only.
    pub fn set_parent(&self, parent: &SceneOperation) -> Result<(), SceneError> {
        if parent.id() == self.id() || self.has_descendant(parent.id()) {
            return Err(SceneError::InvalidParent(self.id()));
        }
        let mut children = lock(&parent.inner.children);
        if !children.iter().any(|child| child.id() == self.id()) {
            children.push(self.clone());
        }
        Ok(())
    }

    fn has_descendant(&self, id: OperationId) -> bool {
        let children = lock(&self.inner.children).clone();
        children
            .iter()
            .any(|child| child.id() == id || child.has_descendant(id))
    }

    pub fn children(&self) -> Vec<SceneOperation> {
        lock(&self.inner.children).clone()
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    pub fn cancel(&self) {
        if self.inner.cancel.cancel() {
            info!(operation = %self.id(), "Cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// `true` once the settle window has passed and configuration is locked.
    pub fn is_locked(&self) -> bool {
        self.inner.locked.load(Ordering::SeqCst)
    }

    /// The phase of the action currently (or last) executing.
    pub fn phase(&self) -> Option<Phase> {
        *lock(&self.inner.phase)
    }

    pub fn is_done(&self) -> bool {
        self.inner.outcome.borrow().is_some()
    }

    pub fn outcome(&self) -> Option<OperationOutcome> {
        self.inner.outcome.borrow().clone()
    }

    /// The composed actions. Empty until the operation reaches the head of the queue.
    pub fn plan(&self) -> Vec<ActionRecord> {
        lock(&self.inner.actions)
            .iter()
            .map(|action| action.record())
            .collect()
    }

    /// Aggregate progress in `[0, 1]`. Never decreases.
    ///
    /// Own actions count as `sum / (n - 1)` when there are several (the last action
    /// usually finishes instantly). Child operations contribute their average; when
    /// both are present the two halves are weighted equally.
    pub fn progress(&self) -> f32 {
        let own: Vec<f32> = lock(&self.inner.actions)
            .iter()
            .map(|action| action.progress())
            .collect();
        let own = match own.len() {
            0 => None,
            1 => Some(own[0]),
            n => Some(own.iter().sum::<f32>() / (n - 1) as f32),
        };

        let children = self.children();
        let delegated = (!children.is_empty()).then(|| {
            children.iter().map(|child| child.progress()).sum::<f32>() / children.len() as f32
        });

        let raw = match (own, delegated) {
            (Some(own), Some(delegated)) => (own + delegated) / 2.0,
            (Some(value), None) | (None, Some(value)) => value,
            (None, None) => 0.0,
        };
        self.raise_progress(raw)
    }

    fn raise_progress(&self, value: f32) -> f32 {
        let value = unit_interval(value);
        let previous = self
            .inner
            .progress_mark
            .fetch_max(value.to_bits(), Ordering::SeqCst);
        f32::from_bits(previous).max(value)
    }

    /// Resolves once the operation has completed or been cancelled.
    pub async fn wait(&self) -> OperationOutcome {
        let mut changes = self.inner.outcome.subscribe();
        loop {
            if let Some(outcome) = changes.borrow_and_update().clone() {
                return outcome;
            }
            if changes.changed().await.is_err() {
                return OperationOutcome {
                    status: OperationStatus::Cancelled,
                    opened: Vec::new(),
                    closed: Vec::new(),
                };
            }
        }
    }

    // -------------------------------------------------------------------------
    // Run
    // -------------------------------------------------------------------------

    pub(crate) async fn run(self) {
        let span = info_span!("scene_operation", operation = %self.id());
        self.drive().instrument(span).await;
    }

    async fn drive(&self) {
        let scheduler = self.inner.scheduler.clone();
        settle(scheduler.config().settle_delay()).await;

        let mut config = self.lock_config();
        let mut run = RunState::default();
        let status = match self.steps(&scheduler, &mut config, &mut run).await {
            Ok(()) => OperationStatus::Completed,
            Err(Cancelled) => {
                self.abort(&scheduler, &mut config, &mut run).await;
                OperationStatus::Cancelled
            }
        };
        self.finish(&scheduler, status, &run);
    }

    fn lock_config(&self) -> OperationConfig {
        let mut config = lock(&self.inner.config);
        self.inner.locked.store(true, Ordering::SeqCst);
        std::mem::take(&mut *config)
    }

    fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    async fn steps(
        &self,
        scheduler: &Scheduler,
        config: &mut OperationConfig,
        run: &mut RunState,
    ) -> Result<(), Cancelled> {
        let queue = scheduler.queue();
        if config.bypass {
            if queue.bypass(self.clone()) {
                scheduler.queue_drained();
            }
        } else if !queue.wait_for_head(self.id(), &self.inner.cancel).await {
            return Err(Cancelled);
        }
        info!(bypass = config.bypass, "Started");

        self.checkpoint()?;
        let plan = self.compose(scheduler, config);
        *lock(&self.inner.actions) = plan.actions.clone();
        run.loads = plan.loads;
        run.closes = plan.closes;

        self.checkpoint()?;
        if let Some(scene) = self.loading_screen_scene(scheduler, config) {
            if let Some(adapter) = scheduler.loading_screens() {
                run.screen = adapter.open(scheduler, &scene, self).await;
            }
        }

        self.checkpoint()?;
        if !config.bypass && queue.is_head(self.id()) {
            let priority = config
                .load_priority
                .unwrap_or(scheduler.config().operation_priority);
            scheduler.provider().set_load_priority(priority);
            run.applied_priority = true;
        }

        let manager = scheduler.manager();
        let previous = manager.current_collection();
        if config.transition.is_some() {
            if let Some(previous) = &previous {
                manager.emit_collection(CollectionEventKind::WillClose, previous.clone());
            }
            if let (Some(CollectionTransition::Open), Some(next)) =
                (config.transition, &config.collection)
            {
                manager.emit_collection(CollectionEventKind::WillOpen, next.clone());
            }
        }

        let ctx = ActionContext::new(
            scheduler.clone(),
            self.id(),
            config.collection.clone(),
            self.inner.cancel.clone(),
        );
        for action in &plan.actions {
            self.checkpoint()?;
            self.enter_phase(scheduler, run, action.kind().phase());
            if execute(action.as_ref(), &ctx).await == ActionStatus::Stopped {
                return Err(Cancelled);
            }
        }

        self.checkpoint()?;
        if !config.presentation {
            self.update_active_scene(scheduler, config, &run.opened());
        }

        for callback in std::mem::take(&mut config.callbacks) {
            self.checkpoint()?;
            match callback {
                PostCallback::Sync(callback) => {
                    invoke_guarded("operation callback", || callback(self));
                }
                PostCallback::Async(callback) => {
                    await_guarded("operation callback", callback(self.clone())).await;
                }
            }
        }

        self.checkpoint()?;
        if config.release_unused.unwrap_or(config.collection.is_some()) {
            debug!("Releasing unused assets");
            scheduler.provider().release_unused().await;
        }

        for callback in std::mem::take(&mut config.on_complete) {
            self.checkpoint()?;
            invoke_guarded("on_complete", || callback(self));
        }

        self.checkpoint()?;
        match (config.transition, &config.collection) {
            (Some(CollectionTransition::Open), Some(next)) => {
                manager.set_current_collection(Some(next.clone()));
                if let Some(previous) = previous {
                    manager.emit_collection(CollectionEventKind::Closed, previous);
                }
                manager.emit_collection(CollectionEventKind::Opened, next.clone());
            }
            (Some(CollectionTransition::Close), _) => {
                manager.set_current_collection(None);
                if let Some(previous) = previous {
                    manager.emit_collection(CollectionEventKind::Closed, previous);
                }
            }
            _ => {}
        }

        self.checkpoint()?;
        if let Some(screen) = run.screen.take() {
            if let Some(adapter) = scheduler.loading_screens() {
                adapter.close(scheduler, screen).await;
            }
        }

        Ok(())
    }

    fn compose(&self, scheduler: &Scheduler, config: &mut OperationConfig) -> ComposedPlan {
        let manager = scheduler.manager();
        let open_scenes = manager.open_scenes();
        let current = manager.current_collection();
        let plan = Composer::new(&open_scenes)
            .with_sentinel(scheduler.config().sentinel_scene.as_ref())
            .with_collection(config.collection.as_deref())
            .with_current_collection(current.as_deref())
            .compose(&config.intents, std::mem::take(&mut config.actions));
        debug!(
            actions = plan.actions.len(),
            loads = plan.loads.len(),
            closes = plan.closes.len(),
            "Composed"
        );
        plan
    }

    fn loading_screen_scene(&self, scheduler: &Scheduler, config: &OperationConfig) -> Option<Scene> {
        if config.presentation {
            return None;
        }
        match &config.loading_screen {
            LoadingScreenChoice::Disabled => None,
            LoadingScreenChoice::Scene(scene) => Some(scene.clone()),
            LoadingScreenChoice::Auto => match config.collection.as_ref()?.loading_screen() {
                LoadingScreenUsage::DontUse => None,
                LoadingScreenUsage::UseDefault => scheduler.config().default_loading_screen.clone(),
                LoadingScreenUsage::Override(scene) => Some(scene.clone()),
            },
        }
    }

    fn enter_phase(&self, scheduler: &Scheduler, run: &RunState, next: Phase) {
        let previous = {
            let mut phase = lock(&self.inner.phase);
            let previous = *phase;
            if previous == Some(next) {
                return;
            }
            *phase = Some(next);
            previous
        };
        debug!(?previous, phase = %next, "Phase changed");
        if run.screen.is_some() {
            if let Some(adapter) = scheduler.loading_screens() {
                adapter.phase_changed(self, previous, next);
            }
        }
    }

    /// Focus or the collection's declared active scene, if it is open and activated;
    /// otherwise the first scene this operation opened. Operations without either
    /// only repair a missing active scene.
    fn update_active_scene(
        &self,
        scheduler: &Scheduler,
        config: &OperationConfig,
        opened: &[Arc<OpenScene>],
    ) {
        let manager = scheduler.manager();
        let declared = config.focus.clone().or_else(|| {
            config
                .collection
                .as_ref()
                .and_then(|collection| collection.active_scene().cloned())
        });
        let current = manager.active_scene().filter(|scene| scene.is_open());
        if declared.is_none() && config.collection.is_none() && current.is_some() {
            return;
        }

        let target = declared
            .as_ref()
            .and_then(|id| manager.find_open(id))
            .filter(|scene| !scene.is_preloaded())
            .or_else(|| opened.iter().find(|scene| !scene.is_preloaded()).cloned())
            .or(current)
            .or_else(|| {
                manager
                    .open_scenes()
                    .into_iter()
                    .find(|scene| !scene.is_preloaded())
            });
        manager.set_active_scene(target);
    }

    async fn abort(&self, scheduler: &Scheduler, config: &mut OperationConfig, run: &mut RunState) {
        info!(phase = ?self.phase(), "Cancelled");
        if run.applied_priority {
            scheduler
                .provider()
                .set_load_priority(scheduler.config().default_priority);
        }
        // Give up the head now; the operation stays tracked as running until finish.
        if scheduler.queue().bypass(self.clone()) {
            scheduler.queue_drained();
        }
        if let Some(screen) = run.screen.take() {
            if let Some(adapter) = scheduler.loading_screens() {
                adapter.cancelled(scheduler, self, Some(screen)).await;
            }
        }
        for callback in std::mem::take(&mut config.on_cancel) {
            invoke_guarded("on_cancel", || callback(self));
        }
    }

    fn finish(&self, scheduler: &Scheduler, status: OperationStatus, run: &RunState) {
        scheduler.release(self.id());
        if status == OperationStatus::Completed {
            self.raise_progress(1.0);
        }
        let outcome = OperationOutcome {
            status,
            opened: run.opened(),
            closed: run.closed(),
        };
        info!(
            ?status,
            opened = outcome.opened.len(),
            closed = outcome.closed.len(),
            "Done"
        );
        self.inner.outcome.send_replace(Some(outcome));
    }
}

fn check_collection_open(intent: &OpenIntent) -> Result<(), SceneError> {
    if !intent.force && intent.scene.open_behavior() == OpenBehavior::DoNotOpenInCollection {
        return Err(SceneError::NotPermitted {
            scene: intent.scene.id().clone(),
            reason: "excluded from collection opens".into(),
        });
    }
    Ok(())
}

async fn settle(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}

impl fmt::Debug for SceneOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneOperation")
            .field("id", &self.id())
            .field("phase", &self.phase())
            .field("cancelled", &self.is_cancelled())
            .field("done", &self.is_done())
            .finish()
    }
}
