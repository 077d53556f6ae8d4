//! Runtime binding between a [`Scene`] and its live load handle.

use super::scene::{Scene, SceneId};
use crate::adapters::LoadHandle;
use crate::sync::lock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static NEXT_OPEN_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// A scene that has been loaded by an operation.
///
/// Created by a load action when it completes; the handle is cleared by the unload
/// action that closes it. A handle is never revived: reopening a scene produces a fresh
/// `OpenScene` with a new [`OpenScene::id`].
pub struct OpenScene {
    id: u64,
    scene: Scene,
    handle: Mutex<Option<LoadHandle>>,
    preloaded: AtomicBool,
}

impl OpenScene {
    /// A freshly loaded scene, still waiting for activation.
    pub(crate) fn new(scene: Scene, handle: LoadHandle) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_OPEN_SCENE_ID.fetch_add(1, Ordering::SeqCst),
            scene,
            handle: Mutex::new(Some(handle)),
            preloaded: AtomicBool::new(true),
        })
    }

    /// Unique for the lifetime of the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_id(&self) -> &SceneId {
        self.scene.id()
    }

    pub fn handle(&self) -> Option<LoadHandle> {
        lock(&self.handle).clone()
    }

    /// `true` until the unload action for this handle completes.
    pub fn is_open(&self) -> bool {
        lock(&self.handle).is_some()
    }

    /// Loaded but not yet activated.
    pub fn is_preloaded(&self) -> bool {
        self.preloaded.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_activated(&self) {
        self.preloaded.store(false, Ordering::SeqCst);
    }

    pub(crate) fn clear_handle(&self) -> Option<LoadHandle> {
        self.preloaded.store(false, Ordering::SeqCst);
        lock(&self.handle).take()
    }
}

impl fmt::Debug for OpenScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenScene")
            .field("id", &self.id)
            .field("scene", self.scene.id())
            .field("open", &self.is_open())
            .field("preloaded", &self.is_preloaded())
            .finish()
    }
}
