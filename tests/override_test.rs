mod common;

use common::{scene_steps, system, system_with};
use scene_ops::adapters::{LoadHandle, ProviderError};
use scene_ops::framework::mock::{MockProvider, ProviderCall};
use scene_ops::framework::{ActionKind, ActionStatus, OverrideContext, OverrideKind};
use scene_ops::model::{Scene, SceneId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A load override replaces the provider call and supplies its own handle.
#[tokio::test]
async fn test_load_override_supplies_the_handle() {
    let (system, provider) = system();
    system
        .overrides()
        .register("dlc/arena", OverrideKind::Load, |ctx: OverrideContext| async move {
            ctx.progress.report(0.5);
            Ok::<_, ProviderError>(Some(LoadHandle::new(ctx.scene.id().clone(), 42)))
        });

    let outcome = system.open(Scene::new("dlc/arena")).wait().await;

    assert!(outcome.is_completed());
    assert!(provider.loads().is_empty());
    let open = system.manager().find_open(&"dlc/arena".into()).unwrap();
    assert_eq!(open.handle().unwrap().token(), 42);
    assert_eq!(provider.activations(), vec![SceneId::new("dlc/arena")]);
}

/// A load override that completes without a handle leaves the scene closed.
#[tokio::test]
async fn test_load_override_without_handle_is_absorbed() {
    let (system, _provider) = system();
    system
        .overrides()
        .register("ghost", OverrideKind::Load, |_ctx: OverrideContext| async move {
            Ok::<_, ProviderError>(None)
        });

    let op = system.open(Scene::new("ghost"));
    assert!(op.wait().await.is_completed());
    assert!(!system.manager().is_open(&"ghost".into()));
    let finish = op
        .plan()
        .into_iter()
        .find(|record| record.kind == ActionKind::FinishLoad)
        .unwrap();
    assert_eq!(finish.status, ActionStatus::Skipped);
}

#[tokio::test]
async fn test_unload_override_and_unregister() {
    let (system, provider) = system();
    let unloads = Arc::new(AtomicUsize::new(0));
    let counter = unloads.clone();
    system
        .overrides()
        .register("a", OverrideKind::Unload, move |ctx: OverrideContext| {
            let counter = counter.clone();
            async move {
                assert!(ctx.handle.is_some());
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ProviderError>(None)
            }
        });

    system.open(Scene::new("a")).wait().await;
    system.close("a").unwrap().wait().await;
    assert_eq!(unloads.load(Ordering::SeqCst), 1);
    assert!(provider.unloads().is_empty());
    assert!(!system.manager().is_open(&"a".into()));

    system.overrides().unregister(&"a".into());
    system.open(Scene::new("a")).wait().await;
    system.close("a").unwrap().wait().await;
    assert_eq!(unloads.load(Ordering::SeqCst), 1);
    assert_eq!(provider.unloads(), vec![SceneId::new("a")]);
}

/// A failing load is logged and skipped; the queue keeps going.
#[tokio::test]
async fn test_failed_load_does_not_stall_the_queue() {
    let (system, _provider) = system_with(MockProvider::new().fail_load("broken"));

    let broken = system.open_all([Scene::new("broken"), Scene::new("fine")]);
    let next = system.open(Scene::new("after"));

    assert!(broken.wait().await.is_completed());
    assert!(next.wait().await.is_completed());
    assert!(!system.manager().is_open(&"broken".into()));
    assert!(system.manager().is_open(&"fine".into()));
    assert!(system.manager().is_open(&"after".into()));
}

#[tokio::test]
async fn test_failed_unload_keeps_scene_tracked() {
    let (system, _provider) = system_with(MockProvider::new().fail_unload("sticky"));
    system.open(Scene::new("sticky")).wait().await;

    let outcome = system.close("sticky").unwrap().wait().await;

    assert!(outcome.is_completed());
    assert!(outcome.closed.is_empty());
    assert!(system.manager().is_open(&"sticky".into()));
}

/// A scene the provider already holds is adopted instead of loaded twice.
#[tokio::test]
async fn test_externally_loaded_scene_is_adopted() {
    let (system, provider) = system_with(MockProvider::new().preloaded("boot"));

    let outcome = system.open(Scene::new("boot")).wait().await;

    assert!(provider.loads().is_empty());
    assert!(provider.activations().is_empty());
    assert_eq!(outcome.opened.len(), 1);
    assert!(!outcome.opened[0].is_preloaded());
    assert!(system.manager().is_open(&"boot".into()));
}

#[tokio::test]
async fn test_preload_then_activate() {
    let (system, provider) = system();
    let opened = Arc::new(AtomicUsize::new(0));
    let counter = opened.clone();
    system.manager().on_scene_open("level", false, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let preload = system.preload(Scene::new("level"));
    let outcome = preload.wait().await;
    assert_eq!(
        scene_steps(&preload),
        vec![(ActionKind::Load, "level".to_string())]
    );
    let level = outcome.opened[0].clone();
    assert!(level.is_preloaded());
    assert!(provider.activations().is_empty());
    assert_eq!(opened.load(Ordering::SeqCst), 0);

    let activate = system.activate(&level);
    activate.wait().await;
    assert_eq!(
        scene_steps(&activate),
        vec![
            (ActionKind::FinishLoad, "level".to_string()),
            (ActionKind::OpenCallback, "level".to_string()),
        ]
    );
    assert!(!level.is_preloaded());
    assert_eq!(provider.activations(), vec![SceneId::new("level")]);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
}

/// A panicking or failing open callback does not keep other listeners or the
/// operation from finishing.
#[tokio::test]
async fn test_faulty_scene_callbacks_are_isolated() {
    let (system, _provider) = system();
    let reached = Arc::new(AtomicUsize::new(0));

    system
        .manager()
        .on_scene_open("a", true, |_| panic!("listener bug"));
    system
        .manager()
        .on_scene_open("a", true, |_| Err("listener error".into()));
    let counter = reached.clone();
    system.manager().scene_opened().subscribe(move |event| {
        assert_eq!(event.scene.scene_id().as_str(), "a");
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let outcome = system.open(Scene::new("a")).wait().await;
    assert!(outcome.is_completed());
    assert_eq!(reached.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_custom_actions_run_after_composed_ones() {
    let (system, provider) = system();
    let op = system.operation();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    op.open(Scene::new("a"))
        .unwrap()
        .with_callback_action(move |ctx| {
            assert!(ctx.manager().is_open(&"a".into()));
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap()
        .release_unused(true)
        .unwrap();

    op.wait().await;
    let kinds: Vec<ActionKind> = op.plan().iter().map(|r| r.kind).collect();
    assert_eq!(kinds.last(), Some(&ActionKind::Custom));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(provider.calls().last(), Some(&ProviderCall::SetPriority(Default::default())));
    assert!(provider.calls().contains(&ProviderCall::ReleaseUnused));
}
