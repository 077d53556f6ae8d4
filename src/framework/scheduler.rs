//! # Scheduler
//!
//! The single owner of the queue, the scene manager, the provider, the override
//! registry and the loading screen adapter. Construct one per process and clone it
//! wherever operations are created; clones share everything.

use super::operation::{OperationConfig, OperationId, SceneOperation};
use super::overrides::OverrideRegistry;
use super::queue::OperationQueue;
use crate::adapters::{LoadingScreenAdapter, SceneLoadingScreens, SceneProvider};
use crate::lifecycle::SceneManager;
use crate::runtime::SchedulerConfig;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

struct SchedulerInner {
    config: SchedulerConfig,
    manager: SceneManager,
    queue: OperationQueue,
    provider: Arc<dyn SceneProvider>,
    overrides: OverrideRegistry,
    loading_screens: Option<Arc<dyn LoadingScreenAdapter>>,
}

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

pub struct SchedulerBuilder {
    provider: Arc<dyn SceneProvider>,
    config: SchedulerConfig,
    loading_screens: Option<Arc<dyn LoadingScreenAdapter>>,
}

impl SchedulerBuilder {
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn loading_screens(mut self, adapter: Arc<dyn LoadingScreenAdapter>) -> Self {
        self.loading_screens = Some(adapter);
        self
    }

    /// Operations never show a loading screen.
    pub fn without_loading_screens(mut self) -> Self {
        self.loading_screens = None;
        self
    }

    pub fn build(self) -> Scheduler {
        Scheduler {
            inner: Arc::new(SchedulerInner {
                config: self.config,
                manager: SceneManager::new(),
                queue: OperationQueue::new(),
                provider: self.provider,
                overrides: OverrideRegistry::new(),
                loading_screens: self.loading_screens,
            }),
        }
    }
}

impl Scheduler {
    /// Starts from the default config and the [`SceneLoadingScreens`] adapter.
    pub fn builder(provider: Arc<dyn SceneProvider>) -> SchedulerBuilder {
        SchedulerBuilder {
            provider,
            config: SchedulerConfig::default(),
            loading_screens: Some(Arc::new(SceneLoadingScreens)),
        }
    }

    pub fn new(provider: Arc<dyn SceneProvider>) -> Self {
        Self::builder(provider).build()
    }

    /// Creates a queued operation. It starts once the settle window has passed and
    /// every earlier queued operation has finished.
    pub fn operation(&self) -> SceneOperation {
        self.spawn_operation(OperationConfig::new())
    }

    /// Creates an operation that skips the queue.
    pub fn bypass_operation(&self) -> SceneOperation {
        self.spawn_operation(OperationConfig::new().bypass())
    }

    /// Creates an operation from a prepared config and starts its task.
    ///
    /// Queued operations enter the FIFO here, so their order is creation order.
    pub fn spawn_operation(&self, config: OperationConfig) -> SceneOperation {
        let bypass = config.is_bypass();
        let operation = SceneOperation::new(self.clone(), config);
        if !bypass {
            self.inner.queue.enqueue(operation.clone());
        }
        debug!(operation = %operation.id(), bypass, "Spawned");
        tokio::spawn(operation.clone().run());
        operation
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn manager(&self) -> &SceneManager {
        &self.inner.manager
    }

    pub fn queue(&self) -> &OperationQueue {
        &self.inner.queue
    }

    pub fn provider(&self) -> &dyn SceneProvider {
        self.inner.provider.as_ref()
    }

    pub fn overrides(&self) -> &OverrideRegistry {
        &self.inner.overrides
    }

    pub fn loading_screens(&self) -> Option<&Arc<dyn LoadingScreenAdapter>> {
        self.inner.loading_screens.as_ref()
    }

    /// `true` while anything is queued or running.
    pub fn is_busy(&self) -> bool {
        self.inner.queue.is_busy()
    }

    pub async fn wait_idle(&self) {
        self.inner.queue.wait_idle().await;
    }

    /// Cancels every queued and running operation.
    pub fn cancel_all(&self) {
        for operation in self.inner.queue.snapshot() {
            operation.cancel();
        }
    }

    /// Removes a finished operation from the queue.
    pub(crate) fn release(&self, id: OperationId) {
        if self.inner.queue.dequeue(id) {
            self.queue_drained();
        }
    }

    /// Restores the default priority hint and notifies queue-empty subscribers.
    pub(crate) fn queue_drained(&self) {
        self.provider()
            .set_load_priority(self.inner.config.default_priority);
        self.inner.queue.emit_empty();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("queued", &self.inner.queue.len())
            .field("open_scenes", &self.inner.manager.open_scenes().len())
            .finish()
    }
}
