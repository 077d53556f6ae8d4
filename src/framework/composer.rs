//! # Action Composer
//!
//! Turns an operation's declared intents into its ordered action list. Composition
//! runs when the operation reaches the head of the queue, so "already open" reflects
//! everything earlier operations did.
//!
//! ## Policy
//!
//! [`Composer::should_open`] and [`Composer::should_close`] decide which intents become
//! actions. Scenes that this same operation closes count as not open when deciding
//! whether to open them, so opening a collection that shares a normally-closing scene
//! with the previous one reloads it instead of dropping it.
//!
//! ## Ordering
//!
//! 1. close callbacks, one per effective close
//! 2. unloads, one per effective close
//! 3. loads, one per effective open
//! 4. finish-loads, one per load
//! 5. a single cross-reference restore, if anything loads
//! 6. open callbacks, one per load
//! 7. custom actions, in registration order
//!
//! Reopen intents feed both the close and the open side, so a reopen is exactly one
//! close-then-load sequence.

use super::action::SceneAction;
use crate::actions::{
    empty_slot, filled_slot, CloseCallbackAction, FinishLoadAction, LoadAction, LoadSlot,
    OpenCallbackAction, RestoreReferencesAction, UnloadAction,
};
use crate::model::{CloseBehavior, OpenBehavior, OpenScene, Scene, SceneCollection, SceneId};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct OpenIntent {
    pub scene: Scene,
    pub force: bool,
}

/// What a close intent refers to. Everything but [`CloseTarget::Handle`] is resolved
/// against the open set at composition time.
#[derive(Debug, Clone)]
pub enum CloseTarget {
    Handle(Arc<OpenScene>),
    Scene(SceneId),
    AllOpen,
    CurrentCollection,
}

#[derive(Debug, Clone)]
pub struct CloseIntent {
    pub target: CloseTarget,
    pub force: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Intents {
    pub open: Vec<OpenIntent>,
    pub close: Vec<CloseIntent>,
    pub reopen: Vec<Arc<OpenScene>>,
    /// Preloaded scenes to activate.
    pub activate: Vec<Arc<OpenScene>>,
    /// Load without activating.
    pub preload: bool,
}

impl Intents {
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
            && self.close.is_empty()
            && self.reopen.is_empty()
            && self.activate.is_empty()
    }
}

/// The composed action list plus the bookkeeping the operation needs afterwards.
pub struct ComposedPlan {
    pub actions: Vec<Arc<dyn SceneAction>>,
    /// One slot per load action, in load order.
    pub loads: Vec<LoadSlot>,
    pub closes: Vec<Arc<OpenScene>>,
}

pub struct Composer<'a> {
    open_scenes: &'a [Arc<OpenScene>],
    sentinel: Option<&'a SceneId>,
    collection: Option<&'a SceneCollection>,
    current_collection: Option<&'a SceneCollection>,
}

impl<'a> Composer<'a> {
    pub fn new(open_scenes: &'a [Arc<OpenScene>]) -> Self {
        Self {
            open_scenes,
            sentinel: None,
            collection: None,
            current_collection: None,
        }
    }

    /// The reserved scene that is never closed.
    pub fn with_sentinel(mut self, sentinel: Option<&'a SceneId>) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// The collection the operation is associated with.
    pub fn with_collection(mut self, collection: Option<&'a SceneCollection>) -> Self {
        self.collection = collection;
        self
    }

    /// The manager's current collection, for [`CloseTarget::CurrentCollection`].
    pub fn with_current_collection(mut self, collection: Option<&'a SceneCollection>) -> Self {
        self.current_collection = collection;
        self
    }

    fn is_open(&self, scene: &SceneId) -> bool {
        self.open_scenes
            .iter()
            .any(|open| open.scene_id() == scene && open.is_open())
    }

    pub fn should_open(&self, intent: &OpenIntent) -> bool {
        self.should_open_unless_closing(intent, &HashSet::new())
    }

    fn should_open_unless_closing(&self, intent: &OpenIntent, closing: &HashSet<SceneId>) -> bool {
        let id = intent.scene.id();
        if self.is_open(id) && !closing.contains(id) && !intent.force {
            return false;
        }
        if intent.force {
            return true;
        }
        match self.collection {
            None => true,
            Some(_) => intent.scene.open_behavior() != OpenBehavior::DoNotOpenInCollection,
        }
    }

    pub fn should_close(&self, scene: &OpenScene, force: bool) -> bool {
        if !scene.is_open() {
            return false;
        }
        if self.sentinel == Some(scene.scene_id()) {
            return false;
        }
        if force {
            return true;
        }
        match scene.scene().close_behavior() {
            CloseBehavior::Close => true,
            CloseBehavior::KeepOpenAlways => false,
            CloseBehavior::KeepOpenIfNextAlsoContains => !self
                .collection
                .is_some_and(|next| next.contains(scene.scene_id())),
        }
    }

    /// Expands close intents to concrete handles, in intent order.
    pub fn resolve_close(&self, intents: &[CloseIntent]) -> Vec<(Arc<OpenScene>, bool)> {
        let live = || self.open_scenes.iter().filter(|open| open.is_open());
        let mut resolved = Vec::new();
        for intent in intents {
            match &intent.target {
                CloseTarget::Handle(handle) => resolved.push((handle.clone(), intent.force)),
                CloseTarget::Scene(id) => resolved.extend(
                    live()
                        .filter(|open| open.scene_id() == id)
                        .map(|open| (open.clone(), intent.force)),
                ),
                CloseTarget::AllOpen => {
                    resolved.extend(live().map(|open| (open.clone(), intent.force)))
                }
                CloseTarget::CurrentCollection => {
                    if let Some(current) = self.current_collection {
                        resolved.extend(
                            live()
                                .filter(|open| current.contains(open.scene_id()))
                                .map(|open| (open.clone(), intent.force)),
                        );
                    }
                }
            }
        }
        resolved
    }

    /// Deduplicated `(close, open)` sets after policy filtering.
    pub fn effective(&self, intents: &Intents) -> (Vec<Arc<OpenScene>>, Vec<OpenIntent>) {
        let mut close: Vec<Arc<OpenScene>> = Vec::new();
        let mut seen_handles = HashSet::new();
        for (handle, force) in self.resolve_close(&intents.close) {
            if self.should_close(&handle, force) && seen_handles.insert(handle.id()) {
                close.push(handle);
            }
        }
        for handle in &intents.reopen {
            if seen_handles.insert(handle.id()) {
                close.push(handle.clone());
            }
        }

        let closing: HashSet<SceneId> = close.iter().map(|h| h.scene_id().clone()).collect();
        let mut open = Vec::new();
        let mut seen_scenes = HashSet::new();
        for intent in &intents.open {
            if self.should_open_unless_closing(intent, &closing)
                && seen_scenes.insert(intent.scene.id().clone())
            {
                open.push(intent.clone());
            }
        }
        for handle in &intents.reopen {
            if seen_scenes.insert(handle.scene_id().clone()) {
                open.push(OpenIntent {
                    scene: handle.scene().clone(),
                    force: false,
                });
            }
        }

        (close, open)
    }

    pub fn compose(&self, intents: &Intents, custom: Vec<Arc<dyn SceneAction>>) -> ComposedPlan {
        let (close, open) = self.effective(intents);
        let mut actions: Vec<Arc<dyn SceneAction>> = Vec::new();

        for handle in &close {
            actions.push(Arc::new(CloseCallbackAction::new(handle.clone())));
        }
        for handle in &close {
            actions.push(Arc::new(UnloadAction::new(handle.clone())));
        }

        let loads: Vec<(SceneId, LoadSlot)> = open
            .into_iter()
            .map(|OpenIntent { scene, force }| {
                let slot = empty_slot();
                let id = scene.id().clone();
                actions.push(Arc::new(LoadAction::new(scene, slot.clone()).forced(force)));
                (id, slot)
            })
            .collect();

        let closing: HashSet<u64> = close.iter().map(|h| h.id()).collect();
        let mut seen = HashSet::new();
        let activations: Vec<(SceneId, LoadSlot)> = intents
            .activate
            .iter()
            .filter(|h| !closing.contains(&h.id()) && seen.insert(h.id()))
            .map(|h| (h.scene_id().clone(), filled_slot(h.clone())))
            .collect();

        let finishing: Vec<&(SceneId, LoadSlot)> = if intents.preload {
            activations.iter().collect()
        } else {
            loads.iter().chain(activations.iter()).collect()
        };

        for (id, slot) in &finishing {
            actions.push(Arc::new(FinishLoadAction::new(id.clone(), slot.clone())));
        }
        if !loads.is_empty() && !intents.preload {
            let slots = loads.iter().map(|(_, slot)| slot.clone()).collect();
            actions.push(Arc::new(RestoreReferencesAction::new(slots)));
        }
        for (id, slot) in &finishing {
            actions.push(Arc::new(OpenCallbackAction::new(id.clone(), slot.clone())));
        }

        actions.extend(custom);

        ComposedPlan {
            actions,
            loads: loads.into_iter().map(|(_, slot)| slot).collect(),
            closes: close,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LoadHandle;
    use crate::framework::ActionKind;

    fn open(scene: Scene) -> Arc<OpenScene> {
        let handle = LoadHandle::new(scene.id().clone(), 1);
        OpenScene::new(scene, handle)
    }

    fn kinds(plan: &ComposedPlan) -> Vec<(ActionKind, Option<String>)> {
        plan.actions
            .iter()
            .map(|a| (a.kind(), a.scene().map(|s| s.to_string())))
            .collect()
    }

    fn open_intent(scene: &Scene) -> OpenIntent {
        OpenIntent {
            scene: scene.clone(),
            force: false,
        }
    }

    #[test]
    fn test_should_open_policy() {
        let a = Scene::new("a");
        let hidden = Scene::new("hidden").with_open_behavior(OpenBehavior::DoNotOpenInCollection);
        let live = vec![open(a.clone())];
        let collection = SceneCollection::new("c").with_scene(hidden.clone());

        let standalone = Composer::new(&live);
        assert!(!standalone.should_open(&open_intent(&a)));
        assert!(standalone.should_open(&OpenIntent { scene: a.clone(), force: true }));
        assert!(standalone.should_open(&open_intent(&hidden)));

        let in_collection = Composer::new(&live).with_collection(Some(&collection));
        assert!(!in_collection.should_open(&open_intent(&hidden)));
        assert!(in_collection.should_open(&OpenIntent { scene: hidden, force: true }));
    }

    #[test]
    fn test_should_close_policy() {
        let plain = open(Scene::new("plain"));
        let pinned = open(Scene::new("pinned").with_close_behavior(CloseBehavior::KeepOpenAlways));
        let shared = open(
            Scene::new("shared").with_close_behavior(CloseBehavior::KeepOpenIfNextAlsoContains),
        );
        let sentinel = open(Scene::new("persistent"));
        let live = vec![plain.clone(), pinned.clone(), shared.clone(), sentinel.clone()];
        let next = SceneCollection::new("next").with_scene(shared.scene().clone());

        let composer = Composer::new(&live)
            .with_sentinel(Some(sentinel.scene_id()))
            .with_collection(Some(&next));
        assert!(composer.should_close(&plain, false));
        assert!(!composer.should_close(&pinned, false));
        assert!(composer.should_close(&pinned, true));
        assert!(!composer.should_close(&shared, false));
        assert!(!composer.should_close(&sentinel, true));

        let standalone = Composer::new(&live);
        assert!(standalone.should_close(&shared, false));
    }

    #[test]
    fn test_closing_a_closed_handle_produces_nothing() {
        let handle = open(Scene::new("gone"));
        handle.clear_handle();
        let live: Vec<Arc<OpenScene>> = Vec::new();
        let intents = Intents {
            close: vec![
                CloseIntent { target: CloseTarget::Handle(handle.clone()), force: false },
                CloseIntent { target: CloseTarget::Handle(handle), force: true },
            ],
            ..Default::default()
        };

        let plan = Composer::new(&live).compose(&intents, Vec::new());
        assert!(plan.actions.is_empty());
    }

    #[test]
    fn test_open_only_plan_order() {
        let a = Scene::new("a");
        let live: Vec<Arc<OpenScene>> = Vec::new();
        let intents = Intents {
            open: vec![open_intent(&a)],
            ..Default::default()
        };

        let plan = Composer::new(&live).compose(&intents, Vec::new());
        assert_eq!(
            kinds(&plan),
            vec![
                (ActionKind::Load, Some("a".into())),
                (ActionKind::FinishLoad, Some("a".into())),
                (ActionKind::RestoreReferences, None),
                (ActionKind::OpenCallback, Some("a".into())),
            ]
        );
    }

    #[test]
    fn test_reopen_is_a_single_close_then_load_sequence() {
        let a = open(Scene::new("a"));
        let live = vec![a.clone()];
        let intents = Intents {
            close: vec![CloseIntent { target: CloseTarget::Handle(a.clone()), force: false }],
            open: vec![open_intent(a.scene())],
            reopen: vec![a.clone()],
            ..Default::default()
        };

        let plan = Composer::new(&live).compose(&intents, Vec::new());
        let scene_kinds: Vec<ActionKind> = plan
            .actions
            .iter()
            .filter(|a| a.scene().is_some())
            .map(|a| a.kind())
            .collect();
        assert_eq!(
            scene_kinds,
            vec![
                ActionKind::CloseCallback,
                ActionKind::Unload,
                ActionKind::Load,
                ActionKind::FinishLoad,
                ActionKind::OpenCallback,
            ]
        );
    }

    #[test]
    fn test_collection_switch_keeps_shared_scene() {
        let x = open(Scene::new("x"));
        let y_scene = Scene::new("y").with_close_behavior(CloseBehavior::KeepOpenIfNextAlsoContains);
        let y = open(y_scene.clone());
        let z = Scene::new("z");
        let live = vec![x.clone(), y.clone()];
        let next = SceneCollection::new("d").with_scenes([y_scene.clone(), z.clone()]);

        let intents = Intents {
            close: vec![CloseIntent { target: CloseTarget::AllOpen, force: false }],
            open: vec![open_intent(&y_scene), open_intent(&z)],
            ..Default::default()
        };
        let composer = Composer::new(&live).with_collection(Some(&next));
        let (close, open) = composer.effective(&intents);

        assert_eq!(close.len(), 1);
        assert_eq!(close[0].scene_id().as_str(), "x");
        assert_eq!(open, vec![open_intent(&z)]);
    }

    #[test]
    fn test_preload_emits_loads_only() {
        let a = Scene::new("a");
        let live: Vec<Arc<OpenScene>> = Vec::new();
        let intents = Intents {
            open: vec![open_intent(&a)],
            preload: true,
            ..Default::default()
        };

        let plan = Composer::new(&live).compose(&intents, Vec::new());
        assert_eq!(kinds(&plan), vec![(ActionKind::Load, Some("a".into()))]);
    }
}
