mod common;

use async_trait::async_trait;
use common::{scene_steps, system};
use scene_ops::adapters::{LoadingScreenAdapter, LoadingScreenHandle, SceneLoadingScreens};
use scene_ops::framework::mock::{MockProvider, ProviderCall};
use scene_ops::framework::{
    ActionKind, CollectionEventKind, LoadingScreenChoice, OperationStatus, Phase, SceneError,
    SceneOperation, Scheduler,
};
use scene_ops::lifecycle::SceneSystem;
use scene_ops::model::{
    CloseBehavior, LoadingScreenUsage, OpenBehavior, Scene, SceneCollection, SceneId,
    StartupOption,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn shared(id: &str) -> Scene {
    Scene::new(id).with_close_behavior(CloseBehavior::KeepOpenIfNextAlsoContains)
}

/// C = [X, Y] is current; opening D = [Y, Z] closes X only and loads Z only. Y keeps
/// its handle.
#[tokio::test]
async fn test_collection_switch_keeps_shared_scene() {
    let (system, provider) = system();
    let c = Arc::new(SceneCollection::new("c").with_scenes([Scene::new("x"), shared("y")]));
    let d = Arc::new(SceneCollection::new("d").with_scenes([shared("y"), Scene::new("z")]));

    system.open_collection(c).wait().await;
    let y_before = system.manager().find_open(&"y".into()).unwrap();

    let switch = system.open_collection(d.clone());
    let outcome = switch.wait().await;

    assert!(outcome.is_completed());
    let steps = scene_steps(&switch);
    let unloads: Vec<&str> = steps
        .iter()
        .filter(|(kind, _)| *kind == ActionKind::Unload)
        .map(|(_, scene)| scene.as_str())
        .collect();
    let loads: Vec<&str> = steps
        .iter()
        .filter(|(kind, _)| *kind == ActionKind::Load)
        .map(|(_, scene)| scene.as_str())
        .collect();
    assert_eq!(unloads, vec!["x"]);
    assert_eq!(loads, vec!["z"]);

    let y_after = system.manager().find_open(&"y".into()).unwrap();
    assert_eq!(y_before.id(), y_after.id());
    assert_eq!(provider.unloads(), vec![SceneId::new("x")]);
    assert_eq!(system.manager().current_collection().as_deref(), Some(&*d));
    assert!(provider.calls().contains(&ProviderCall::ReleaseUnused));
}

#[tokio::test]
async fn test_collection_events_fire_in_order() {
    let (system, _provider) = system();
    let events = Arc::new(Mutex::new(Vec::new()));
    let log = events.clone();
    system.manager().collection_events().subscribe(move |event| {
        log.lock()
            .unwrap()
            .push((event.kind, event.collection.name().to_string()));
        Ok(())
    });

    let c = Arc::new(SceneCollection::new("c").with_scene(Scene::new("x")));
    let d = Arc::new(SceneCollection::new("d").with_scene(Scene::new("z")));
    system.open_collection(c).wait().await;
    system.open_collection(d).wait().await;
    system.close_collection().wait().await;

    use CollectionEventKind::*;
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            (WillOpen, "c".to_string()),
            (Opened, "c".to_string()),
            (WillClose, "c".to_string()),
            (WillOpen, "d".to_string()),
            (Closed, "c".to_string()),
            (Opened, "d".to_string()),
            (WillClose, "d".to_string()),
            (Closed, "d".to_string()),
        ]
    );
    assert!(system.manager().current_collection().is_none());
    assert!(system.manager().open_scenes().is_empty());
}

#[tokio::test]
async fn test_collection_skips_scenes_excluded_from_collection_opens() {
    let (system, provider) = system();
    let hidden = Scene::new("hidden").with_open_behavior(OpenBehavior::DoNotOpenInCollection);
    let collection = Arc::new(
        SceneCollection::new("c").with_scenes([Scene::new("visible"), hidden.clone()]),
    );

    system.open_collection(collection.clone()).wait().await;
    assert_eq!(provider.loads(), vec![SceneId::new("visible")]);

    let op = system.operation();
    op.with_collection(collection).unwrap();
    assert!(matches!(
        op.open(hidden.clone()),
        Err(SceneError::NotPermitted { .. })
    ));
    op.open_forced(hidden).unwrap();
    op.wait().await;
    assert!(system.manager().is_open(&"hidden".into()));
}

#[tokio::test]
async fn test_declared_active_scene_becomes_active() {
    let (system, _provider) = system();
    let collection = Arc::new(
        SceneCollection::new("level")
            .with_scenes([Scene::new("lighting"), Scene::new("gameplay")])
            .with_active_scene("gameplay"),
    );
    let changes = Arc::new(Mutex::new(Vec::new()));
    let log = changes.clone();
    system.manager().active_scene_changed().subscribe(move |change| {
        log.lock()
            .unwrap()
            .push(change.next.as_ref().map(|s| s.scene_id().to_string()));
        Ok(())
    });

    system.open_collection(collection).wait().await;

    let active = system.manager().active_scene().unwrap();
    assert_eq!(active.scene_id().as_str(), "gameplay");
    assert_eq!(*changes.lock().unwrap(), vec![Some("gameplay".to_string())]);
}

#[tokio::test]
async fn test_first_opened_scene_is_active_without_declaration() {
    let (system, _provider) = system();
    system
        .open_all([Scene::new("first"), Scene::new("second")])
        .wait()
        .await;
    assert_eq!(
        system.manager().active_scene().unwrap().scene_id().as_str(),
        "first"
    );

    // An active scene that is still open is left alone...
    system.open(Scene::new("third")).wait().await;
    assert_eq!(
        system.manager().active_scene().unwrap().scene_id().as_str(),
        "first"
    );

    // ...unless the operation asks for focus.
    let op = system.operation();
    op.focus("third").unwrap();
    op.wait().await;
    assert_eq!(
        system.manager().active_scene().unwrap().scene_id().as_str(),
        "third"
    );
}

#[tokio::test]
async fn test_start_up_prefers_explicit_open() {
    let (system, _provider) = system();
    let auto = Arc::new(SceneCollection::new("auto").with_scene(Scene::new("a")));
    let never = Arc::new(
        SceneCollection::new("never")
            .with_scene(Scene::new("n"))
            .with_startup(StartupOption::DoNotOpen),
    );
    let explicit = Arc::new(
        SceneCollection::new("explicit")
            .with_scene(Scene::new("e"))
            .with_startup(StartupOption::Open),
    );

    let op = system
        .start_up(&[auto.clone(), never.clone(), explicit])
        .unwrap();
    op.wait().await;
    assert_eq!(
        system.manager().current_collection().unwrap().name(),
        "explicit"
    );

    let (fallback, _provider) = common::system();
    fallback.start_up(&[never.clone(), auto]).unwrap().wait().await;
    assert_eq!(
        fallback.manager().current_collection().unwrap().name(),
        "auto"
    );

    let (nothing, _provider) = common::system();
    assert!(nothing.start_up(&[never]).is_none());
}

/// Delegates to the stock adapter and records what the operation tells it.
#[derive(Default)]
struct RecordingScreens {
    phases: Mutex<Vec<Phase>>,
    cancelled: AtomicBool,
}

#[async_trait]
impl LoadingScreenAdapter for RecordingScreens {
    async fn open(
        &self,
        scheduler: &Scheduler,
        scene: &Scene,
        parent: &SceneOperation,
    ) -> Option<LoadingScreenHandle> {
        SceneLoadingScreens.open(scheduler, scene, parent).await
    }

    async fn close(&self, scheduler: &Scheduler, screen: LoadingScreenHandle) {
        SceneLoadingScreens.close(scheduler, screen).await
    }

    fn phase_changed(&self, _operation: &SceneOperation, _previous: Option<Phase>, next: Phase) {
        self.phases.lock().unwrap().push(next);
    }

    async fn cancelled(
        &self,
        scheduler: &Scheduler,
        _operation: &SceneOperation,
        screen: Option<LoadingScreenHandle>,
    ) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(screen) = screen {
            self.close(scheduler, screen).await;
        }
    }
}

fn recording_system(provider: MockProvider) -> (SceneSystem, Arc<MockProvider>, Arc<RecordingScreens>) {
    let provider = Arc::new(provider);
    let screens = Arc::new(RecordingScreens::default());
    let scheduler = Scheduler::builder(provider.clone())
        .config(common::config())
        .loading_screens(screens.clone())
        .build();
    (SceneSystem::from_scheduler(scheduler), provider, screens)
}

#[tokio::test]
async fn test_loading_screen_wraps_the_operation() {
    let (system, provider, screens) = recording_system(MockProvider::new());
    let collection = Arc::new(
        SceneCollection::new("level")
            .with_scene(Scene::new("arena"))
            .with_loading_screen(LoadingScreenUsage::Override(Scene::new("loading"))),
    );

    let op = system.open_collection(collection);
    let outcome = op.wait().await;

    assert!(outcome.is_completed());
    assert_eq!(
        provider.loads(),
        vec![SceneId::new("loading"), SceneId::new("arena")]
    );
    assert_eq!(provider.unloads(), vec![SceneId::new("loading")]);
    assert_eq!(
        *screens.phases.lock().unwrap(),
        vec![Phase::LoadScenes, Phase::FinishLoad, Phase::OpenCallbacks]
    );
    assert_eq!(op.children().len(), 1);
    assert!(!system.manager().is_open(&"loading".into()));
    assert_eq!(
        system.manager().active_scene().unwrap().scene_id().as_str(),
        "arena"
    );
}

#[tokio::test]
async fn test_default_loading_screen_comes_from_config() {
    let provider = Arc::new(MockProvider::new());
    let config = common::config().with_default_loading_screen(Scene::new("fade"));
    let system = SceneSystem::with_config(provider.clone(), config);
    let plain = Arc::new(SceneCollection::new("plain").with_scene(Scene::new("a")));
    let bare = Arc::new(
        SceneCollection::new("bare")
            .with_scene(Scene::new("b"))
            .with_loading_screen(LoadingScreenUsage::DontUse),
    );

    system.open_collection(plain).wait().await;
    assert!(provider.loads().contains(&SceneId::new("fade")));

    system.open_collection(bare).wait().await;
    let fades = provider
        .loads()
        .into_iter()
        .filter(|scene| scene.as_str() == "fade")
        .count();
    assert_eq!(fades, 1);
}

#[tokio::test]
async fn test_cancelled_operation_closes_its_loading_screen() {
    let (system, provider, screens) =
        recording_system(MockProvider::new().with_delay(Duration::from_millis(100)));
    let op = system.operation();
    op.open(Scene::new("big"))
        .unwrap()
        .with_loading_screen(LoadingScreenChoice::Scene(Scene::new("loading")))
        .unwrap();

    // The first phase change happens once the screen is up; "big" is then loading.
    while op.phase().is_none() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(op.phase(), Some(Phase::LoadScenes));
    op.cancel();
    let outcome = op.wait().await;

    assert_eq!(outcome.status, OperationStatus::Cancelled);
    assert!(screens.cancelled.load(Ordering::SeqCst));
    assert!(provider.unloads().contains(&SceneId::new("loading")));
    assert!(!system.manager().is_open(&"loading".into()));
    assert!(!system.manager().is_open(&"big".into()));
}

/// Holds the screen open after cancellation until released.
#[derive(Default)]
struct GatedScreens {
    release: tokio::sync::Notify,
}

#[async_trait]
impl LoadingScreenAdapter for GatedScreens {
    async fn open(
        &self,
        scheduler: &Scheduler,
        scene: &Scene,
        parent: &SceneOperation,
    ) -> Option<LoadingScreenHandle> {
        SceneLoadingScreens.open(scheduler, scene, parent).await
    }

    async fn close(&self, scheduler: &Scheduler, screen: LoadingScreenHandle) {
        SceneLoadingScreens.close(scheduler, screen).await
    }

    async fn cancelled(
        &self,
        scheduler: &Scheduler,
        _operation: &SceneOperation,
        screen: Option<LoadingScreenHandle>,
    ) {
        self.release.notified().await;
        if let Some(screen) = screen {
            self.close(scheduler, screen).await;
        }
    }
}

/// The next queued operation starts as soon as the head is cancelled, without waiting
/// for the head's loading screen to close.
#[tokio::test]
async fn test_cancelled_head_frees_the_queue_before_its_screen_closes() {
    let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(100)));
    let screens = Arc::new(GatedScreens::default());
    let scheduler = Scheduler::builder(provider.clone())
        .config(common::config())
        .loading_screens(screens.clone())
        .build();
    let system = SceneSystem::from_scheduler(scheduler);

    let head = system.operation();
    head.open(Scene::new("big"))
        .unwrap()
        .with_loading_screen(LoadingScreenChoice::Scene(Scene::new("loading")))
        .unwrap();
    let next = system.open(Scene::new("small"));

    while head.phase().is_none() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    head.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(2), next.wait())
        .await
        .expect("queue should advance while the screen is still up");
    assert!(outcome.is_completed());
    assert!(!head.is_done());
    assert!(system.scheduler().is_busy());
    assert!(system.manager().is_open(&"loading".into()));

    screens.release.notify_one();
    assert_eq!(head.wait().await.status, OperationStatus::Cancelled);
    assert!(!system.manager().is_open(&"loading".into()));
    system.wait_idle().await;
}
