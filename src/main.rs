//! # Scene Ops Demo
//!
//! Runs a small session against the in-memory [`MockProvider`]:
//! 1.  Start up with the menu collection.
//! 2.  Switch to the arena collection behind a loading screen. The shared HUD scene is
//!     kept open.
//! 3.  Reopen the arena and shut down.
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

use scene_ops::framework::mock::MockProvider;
use scene_ops::lifecycle::SceneSystem;
use scene_ops::model::{CloseBehavior, LoadingScreenUsage, Scene, SceneCollection, StartupOption};
use scene_ops::runtime::{setup_tracing, SchedulerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(20)));
    let config = SchedulerConfig::from_env().with_sentinel("core/persistent");
    let system = SceneSystem::with_config(provider.clone(), config);

    system.manager().active_scene_changed().subscribe(|change| {
        info!(
            next = ?change.next.as_ref().map(|s| s.scene_id().to_string()),
            "Active scene changed"
        );
        Ok(())
    });

    let hud = Scene::new("ui/hud.scene")
        .with_close_behavior(CloseBehavior::KeepOpenIfNextAlsoContains);
    let menu = Arc::new(
        SceneCollection::new("menu")
            .with_scenes([Scene::new("ui/main_menu.scene"), hud.clone()])
            .with_startup(StartupOption::Open),
    );
    let arena = Arc::new(
        SceneCollection::new("arena")
            .with_scenes([Scene::new("levels/arena.scene"), hud])
            .with_active_scene("levels/arena.scene")
            .with_loading_screen(LoadingScreenUsage::Override(Scene::new("ui/loading.scene"))),
    );

    let startup = system
        .start_up(&[menu, arena.clone()])
        .ok_or("no startup collection")?;
    startup
        .wait()
        .instrument(tracing::info_span!("startup"))
        .await;

    let switch = system.open_collection(arena);
    let watcher = {
        let switch = switch.clone();
        tokio::spawn(async move {
            while !switch.is_done() {
                info!(progress = %format!("{:.0}%", switch.progress() * 100.0), "Switching");
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        })
    };
    let outcome = switch.wait().await;
    watcher.await.map_err(|e| e.to_string())?;
    info!(
        opened = outcome.opened.len(),
        closed = outcome.closed.len(),
        "Arena ready"
    );

    if let Some(level) = system.manager().find_open(&"levels/arena.scene".into()) {
        system.reopen(&level).wait().await;
    }

    info!(calls = provider.calls().len(), "Provider calls");
    system.shutdown().await;
    Ok(())
}
