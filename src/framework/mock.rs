//! # Mock Provider
//!
//! An in-memory [`SceneProvider`] for testing operations without a real engine.
//!
//! Every call is recorded as a [`ProviderCall`], so tests can assert on exactly what
//! the scheduler asked for and in which order. Failures, latency and scenes that are
//! "already loaded" outside the scheduler can be injected up front.
//!
//! # Example
//! ```ignore
//! let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(5)));
//! let scheduler = Scheduler::new(provider.clone());
//!
//! scheduler.operation().open(Scene::new("a"))?;
//! scheduler.wait_idle().await;
//!
//! assert_eq!(provider.loads(), vec![SceneId::new("a")]);
//! ```

use crate::adapters::{LoadHandle, LoadPriority, ProviderError, SceneProvider};
use crate::framework::ProgressReporter;
use crate::model::{OpenScene, Scene, SceneId};
use crate::sync::lock;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One call made against the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Load(SceneId),
    Activate(SceneId),
    Unload(SceneId),
    Restore(Vec<SceneId>),
    ReleaseUnused,
    SetPriority(LoadPriority),
}

#[derive(Default)]
pub struct MockProvider {
    calls: Mutex<Vec<ProviderCall>>,
    delay: Option<Duration>,
    failing_loads: HashSet<SceneId>,
    failing_unloads: HashSet<SceneId>,
    preloaded: Mutex<HashMap<SceneId, LoadHandle>>,
    next_token: AtomicU64,
    priority: Mutex<LoadPriority>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every load, activate and unload takes at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_load(mut self, scene: impl Into<SceneId>) -> Self {
        self.failing_loads.insert(scene.into());
        self
    }

    pub fn fail_unload(mut self, scene: impl Into<SceneId>) -> Self {
        self.failing_unloads.insert(scene.into());
        self
    }

    /// Pretends `scene` was loaded before the scheduler existed.
    pub fn preloaded(self, scene: impl Into<SceneId>) -> Self {
        let scene = scene.into();
        let handle = LoadHandle::new(scene.clone(), self.token());
        lock(&self.preloaded).insert(scene, handle);
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.calls).clone()
    }

    pub fn loads(&self) -> Vec<SceneId> {
        self.filter(|call| match call {
            ProviderCall::Load(scene) => Some(scene.clone()),
            _ => None,
        })
    }

    pub fn unloads(&self) -> Vec<SceneId> {
        self.filter(|call| match call {
            ProviderCall::Unload(scene) => Some(scene.clone()),
            _ => None,
        })
    }

    pub fn activations(&self) -> Vec<SceneId> {
        self.filter(|call| match call {
            ProviderCall::Activate(scene) => Some(scene.clone()),
            _ => None,
        })
    }

    /// The last priority hint applied.
    pub fn priority(&self) -> LoadPriority {
        *lock(&self.priority)
    }

    fn filter<T>(&self, pick: impl Fn(&ProviderCall) -> Option<T>) -> Vec<T> {
        lock(&self.calls).iter().filter_map(pick).collect()
    }

    fn record(&self, call: ProviderCall) {
        lock(&self.calls).push(call);
    }

    fn token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn work(&self, progress: &ProgressReporter, from: f32, to: f32) {
        if let Some(delay) = self.delay {
            let half = delay / 2;
            tokio::time::sleep(half).await;
            progress.report(from + (to - from) / 2.0);
            tokio::time::sleep(delay - half).await;
        }
        progress.report(to);
    }
}

#[async_trait]
impl SceneProvider for MockProvider {
    async fn load(
        &self,
        scene: &Scene,
        progress: ProgressReporter,
    ) -> Result<LoadHandle, ProviderError> {
        self.record(ProviderCall::Load(scene.id().clone()));
        self.work(&progress, 0.0, 0.9).await;
        if self.failing_loads.contains(scene.id()) {
            return Err(ProviderError::LoadFailed {
                scene: scene.id().clone(),
                reason: "injected failure".into(),
            });
        }
        Ok(LoadHandle::new(scene.id().clone(), self.token()))
    }

    async fn activate(
        &self,
        handle: &LoadHandle,
        progress: ProgressReporter,
    ) -> Result<(), ProviderError> {
        self.record(ProviderCall::Activate(handle.scene().clone()));
        self.work(&progress, 0.9, 1.0).await;
        Ok(())
    }

    async fn unload(
        &self,
        handle: &LoadHandle,
        progress: ProgressReporter,
    ) -> Result<(), ProviderError> {
        self.record(ProviderCall::Unload(handle.scene().clone()));
        self.work(&progress, 0.0, 1.0).await;
        lock(&self.preloaded).remove(handle.scene());
        if self.failing_unloads.contains(handle.scene()) {
            return Err(ProviderError::UnloadFailed {
                scene: handle.scene().clone(),
                reason: "injected failure".into(),
            });
        }
        Ok(())
    }

    fn is_already_loaded(&self, scene: &SceneId) -> Option<LoadHandle> {
        lock(&self.preloaded).remove(scene)
    }

    async fn restore_cross_references(&self, scenes: &[Arc<OpenScene>]) {
        let ids = scenes.iter().map(|s| s.scene_id().clone()).collect();
        self.record(ProviderCall::Restore(ids));
    }

    async fn release_unused(&self) {
        self.record(ProviderCall::ReleaseUnused);
    }

    fn set_load_priority(&self, priority: LoadPriority) {
        *lock(&self.priority) = priority;
        self.record(ProviderCall::SetPriority(priority));
    }
}
