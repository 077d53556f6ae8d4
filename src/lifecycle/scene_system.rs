use crate::adapters::SceneProvider;
use crate::framework::{
    CloseTarget, CollectionTransition, OperationConfig, OverrideRegistry, SceneError,
    SceneOperation, Scheduler,
};
use crate::lifecycle::SceneManager;
use crate::model::{OpenScene, Scene, SceneCollection, SceneId, StartupOption};
use crate::runtime::SchedulerConfig;
use std::sync::Arc;
use tracing::info;

/// The entry point for applications.
///
/// `SceneSystem` is responsible for:
/// - **Wiring**: building the [`Scheduler`] with its provider, manager, queue, override
///   registry and loading screen adapter
/// - **Convenience factories**: one call per common operation (`open`, `close`,
///   `open_collection`, ...), each returning the spawned [`SceneOperation`]
/// - **Shutdown**: cancelling whatever is pending and waiting for the queue to drain
///
/// Every factory returns immediately; the returned operation can still be configured
/// during its settle window and awaited with [`SceneOperation::wait`].
///
/// # Example
///
/// ```ignore
/// let system = SceneSystem::new(Arc::new(MockProvider::new()));
///
/// let menu = Arc::new(SceneCollection::new("menu").with_scene(Scene::new("ui/main_menu")));
/// system.open_collection(menu).wait().await;
///
/// system.shutdown().await;
/// ```
pub struct SceneSystem {
    scheduler: Scheduler,
}

impl SceneSystem {
    /// Builds a system with [`SchedulerConfig::from_env`].
    pub fn new(provider: Arc<dyn SceneProvider>) -> Self {
        Self::with_config(provider, SchedulerConfig::from_env())
    }

    pub fn with_config(provider: Arc<dyn SceneProvider>, config: SchedulerConfig) -> Self {
        Self::from_scheduler(Scheduler::builder(provider).config(config).build())
    }

    pub fn from_scheduler(scheduler: Scheduler) -> Self {
        info!(
            settle_ms = scheduler.config().settle_delay_ms,
            sentinel = ?scheduler.config().sentinel_scene,
            "Scene system started"
        );
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn manager(&self) -> &SceneManager {
        self.scheduler.manager()
    }

    pub fn overrides(&self) -> &OverrideRegistry {
        self.scheduler.overrides()
    }

    /// A blank queued operation to configure by hand.
    pub fn operation(&self) -> SceneOperation {
        self.scheduler.operation()
    }

    pub fn open(&self, scene: Scene) -> SceneOperation {
        self.open_all([scene])
    }

    pub fn open_all(&self, scenes: impl IntoIterator<Item = Scene>) -> SceneOperation {
        let config = scenes
            .into_iter()
            .fold(OperationConfig::new(), |config, scene| config.with_open(scene, false));
        self.scheduler.spawn_operation(config)
    }

    /// Closes every open instance of `scene`.
    pub fn close(&self, scene: impl Into<SceneId>) -> Result<SceneOperation, SceneError> {
        let scene = scene.into();
        self.check_closable(&scene)?;
        let config = OperationConfig::new().with_close(CloseTarget::Scene(scene), false);
        Ok(self.scheduler.spawn_operation(config))
    }

    pub fn close_handle(&self, scene: &Arc<OpenScene>) -> Result<SceneOperation, SceneError> {
        self.check_closable(scene.scene_id())?;
        let config = OperationConfig::new().with_close_handle(scene.clone(), false);
        Ok(self.scheduler.spawn_operation(config))
    }

    fn check_closable(&self, scene: &SceneId) -> Result<(), SceneError> {
        if self.scheduler.config().sentinel_scene.as_ref() == Some(scene) {
            return Err(SceneError::NotPermitted {
                scene: scene.clone(),
                reason: "the sentinel scene is never closed".into(),
            });
        }
        Ok(())
    }

    pub fn reopen(&self, scene: &Arc<OpenScene>) -> SceneOperation {
        self.scheduler
            .spawn_operation(OperationConfig::new().with_reopen(scene.clone()))
    }

    /// Loads `scene` without activating it.
    pub fn preload(&self, scene: Scene) -> SceneOperation {
        self.scheduler
            .spawn_operation(OperationConfig::new().with_open(scene, false).preload())
    }

    pub fn activate(&self, scene: &Arc<OpenScene>) -> SceneOperation {
        self.scheduler
            .spawn_operation(OperationConfig::new().with_activate(scene.clone()))
    }

    /// Closes everything the next collection does not keep and opens its scenes. The
    /// collection becomes current once the operation completes.
    pub fn open_collection(&self, collection: Arc<SceneCollection>) -> SceneOperation {
        let config = collection
            .scenes()
            .iter()
            .fold(
                OperationConfig::new().with_close(CloseTarget::AllOpen, false),
                |config, scene| config.with_open(scene.clone(), false),
            )
            .with_collection(collection.clone())
            .with_transition(CollectionTransition::Open);
        info!(collection = collection.name(), "Opening collection");
        self.scheduler.spawn_operation(config)
    }

    /// Closes the scenes of the current collection (resolved when the operation starts)
    /// and clears it.
    pub fn close_collection(&self) -> SceneOperation {
        let config = OperationConfig::new()
            .with_close(CloseTarget::CurrentCollection, false)
            .with_transition(CollectionTransition::Close)
            .with_release_unused(true);
        self.scheduler.spawn_operation(config)
    }

    /// Opens the first collection flagged [`StartupOption::Open`], else the first one
    /// left on [`StartupOption::Auto`].
    pub fn start_up(&self, collections: &[Arc<SceneCollection>]) -> Option<SceneOperation> {
        let pick = |option: StartupOption| {
            collections
                .iter()
                .find(|collection| collection.startup() == option)
        };
        let collection = pick(StartupOption::Open).or_else(|| pick(StartupOption::Auto))?;
        info!(collection = collection.name(), "Startup collection");
        Some(self.open_collection(collection.clone()))
    }

    pub async fn wait_idle(&self) {
        self.scheduler.wait_idle().await;
    }

    /// Cancels every queued and running operation and waits for the queue to drain.
    pub async fn shutdown(self) {
        info!(pending = self.scheduler.queue().len(), "Shutting down scene system...");
        self.scheduler.cancel_all();
        self.scheduler.wait_idle().await;
        info!("Scene system shutdown complete.");
    }
}
