//! # Scene Manager
//!
//! Owns the live set of [`OpenScene`]s, the current collection, the active scene and
//! every scene-level callback list. Only load and unload actions mutate the live set;
//! the queue guarantees two operations never do so for the same scenes at once.

use crate::framework::{
    ActiveSceneChanged, CallbackResult, CollectionEvent, CollectionEventKind, OperationId,
    SceneEvent, Subscribers, SubscriptionId,
};
use crate::model::{OpenScene, SceneCollection, SceneId};
use crate::sync::lock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

type SceneSubscribers = Arc<Subscribers<SceneEvent>>;

#[derive(Default)]
pub struct SceneManager {
    open: Mutex<Vec<Arc<OpenScene>>>,
    current_collection: Mutex<Option<Arc<SceneCollection>>>,
    active: Mutex<Option<Arc<OpenScene>>>,
    open_callbacks: Mutex<HashMap<SceneId, SceneSubscribers>>,
    close_callbacks: Mutex<HashMap<SceneId, SceneSubscribers>>,
    scene_opened: Subscribers<SceneEvent>,
    scene_closing: Subscribers<SceneEvent>,
    collection_events: Subscribers<CollectionEvent>,
    active_changed: Subscribers<ActiveSceneChanged>,
}

impl SceneManager {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Live set
    // -------------------------------------------------------------------------

    pub(crate) fn track(&self, scene: Arc<OpenScene>) {
        let mut open = lock(&self.open);
        if !open.iter().any(|existing| existing.id() == scene.id()) {
            debug!(scene = %scene.scene_id(), handle = scene.id(), "Tracked");
            open.push(scene);
        }
    }

    pub(crate) fn untrack(&self, scene: &Arc<OpenScene>) {
        lock(&self.open).retain(|existing| existing.id() != scene.id());
        let was_active = lock(&self.active)
            .as_ref()
            .is_some_and(|active| active.id() == scene.id());
        if was_active {
            self.set_active_scene(None);
        }
    }

    /// `true` if any live handle exists for `scene`.
    pub fn is_open(&self, scene: &SceneId) -> bool {
        self.find_open(scene).is_some()
    }

    pub fn find_open(&self, scene: &SceneId) -> Option<Arc<OpenScene>> {
        lock(&self.open)
            .iter()
            .find(|open| open.scene_id() == scene && open.is_open())
            .cloned()
    }

    /// Snapshot of the live set, in load order.
    pub fn open_scenes(&self) -> Vec<Arc<OpenScene>> {
        lock(&self.open)
            .iter()
            .filter(|open| open.is_open())
            .cloned()
            .collect()
    }

    // -------------------------------------------------------------------------
    // Collection & active scene
    // -------------------------------------------------------------------------

    pub fn current_collection(&self) -> Option<Arc<SceneCollection>> {
        lock(&self.current_collection).clone()
    }

    pub(crate) fn set_current_collection(&self, collection: Option<Arc<SceneCollection>>) {
        info!(collection = ?collection.as_ref().map(|c| c.name()), "Current collection");
        *lock(&self.current_collection) = collection;
    }

    pub(crate) fn emit_collection(&self, kind: CollectionEventKind, collection: Arc<SceneCollection>) {
        debug!(?kind, collection = collection.name(), "Collection event");
        self.collection_events
            .emit(&CollectionEvent { kind, collection }, "collection event");
    }

    pub fn active_scene(&self) -> Option<Arc<OpenScene>> {
        lock(&self.active).clone()
    }

    /// Changes the active scene; fires [`ActiveSceneChanged`] only on an actual change.
    pub fn set_active_scene(&self, next: Option<Arc<OpenScene>>) -> bool {
        let previous = {
            let mut active = lock(&self.active);
            let same = match (active.as_ref(), next.as_ref()) {
                (Some(a), Some(b)) => a.id() == b.id(),
                (None, None) => true,
                _ => false,
            };
            if same {
                return false;
            }
            std::mem::replace(&mut *active, next.clone())
        };
        info!(scene = ?next.as_ref().map(|s| s.scene_id().to_string()), "Active scene");
        self.active_changed
            .emit(&ActiveSceneChanged { previous, next }, "active scene changed");
        true
    }

    // -------------------------------------------------------------------------
    // Callbacks
    // -------------------------------------------------------------------------

    /// Runs once when `scene` is next opened, or every time if `persistent`.
    pub fn on_scene_open(
        &self,
        scene: impl Into<SceneId>,
        persistent: bool,
        handler: impl Fn(&SceneEvent) -> CallbackResult + Send + Sync + 'static,
    ) -> SubscriptionId {
        Self::list(&self.open_callbacks, scene.into()).insert(handler, persistent)
    }

    /// Runs once when `scene` is next about to close, or every time if `persistent`.
    pub fn on_scene_close(
        &self,
        scene: impl Into<SceneId>,
        persistent: bool,
        handler: impl Fn(&SceneEvent) -> CallbackResult + Send + Sync + 'static,
    ) -> SubscriptionId {
        Self::list(&self.close_callbacks, scene.into()).insert(handler, persistent)
    }

    pub fn remove_scene_callback(&self, scene: &SceneId, id: SubscriptionId) -> bool {
        [&self.open_callbacks, &self.close_callbacks]
            .into_iter()
            .any(|map| lock(map).get(scene).is_some_and(|list| list.unsubscribe(id)))
    }

    /// Fires for every scene opened by any operation.
    pub fn scene_opened(&self) -> &Subscribers<SceneEvent> {
        &self.scene_opened
    }

    /// Fires for every scene about to be closed by any operation.
    pub fn scene_closing(&self) -> &Subscribers<SceneEvent> {
        &self.scene_closing
    }

    pub fn collection_events(&self) -> &Subscribers<CollectionEvent> {
        &self.collection_events
    }

    pub fn active_scene_changed(&self) -> &Subscribers<ActiveSceneChanged> {
        &self.active_changed
    }

    fn list(map: &Mutex<HashMap<SceneId, SceneSubscribers>>, scene: SceneId) -> SceneSubscribers {
        lock(map).entry(scene).or_default().clone()
    }

    fn existing(map: &Mutex<HashMap<SceneId, SceneSubscribers>>, scene: &SceneId) -> Option<SceneSubscribers> {
        lock(map).get(scene).cloned()
    }

    /// Runs close callbacks for `scene`. Returns how many succeeded.
    pub(crate) fn notify_closing(&self, scene: &Arc<OpenScene>, operation: OperationId) -> usize {
        let event = SceneEvent {
            scene: scene.clone(),
            operation,
        };
        let scoped = Self::existing(&self.close_callbacks, scene.scene_id())
            .map_or(0, |list| list.emit(&event, "scene close"));
        scoped + self.scene_closing.emit(&event, "scene close")
    }

    /// Runs open callbacks for `scene`. Returns how many succeeded.
    pub(crate) fn notify_opened(&self, scene: &Arc<OpenScene>, operation: OperationId) -> usize {
        let event = SceneEvent {
            scene: scene.clone(),
            operation,
        };
        let scoped = Self::existing(&self.open_callbacks, scene.scene_id())
            .map_or(0, |list| list.emit(&event, "scene open"));
        scoped + self.scene_opened.emit(&event, "scene open")
    }
}
