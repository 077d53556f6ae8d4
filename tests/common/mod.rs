#![allow(dead_code)]

use scene_ops::framework::mock::MockProvider;
use scene_ops::framework::{ActionKind, SceneOperation};
use scene_ops::lifecycle::SceneSystem;
use scene_ops::runtime::SchedulerConfig;
use std::sync::Arc;
use std::time::Duration;

/// Zero settle window so tests do not sleep before every operation.
pub fn config() -> SchedulerConfig {
    SchedulerConfig::default().with_settle_delay(Duration::ZERO)
}

pub fn system() -> (SceneSystem, Arc<MockProvider>) {
    system_with(MockProvider::new())
}

pub fn system_with(provider: MockProvider) -> (SceneSystem, Arc<MockProvider>) {
    let provider = Arc::new(provider);
    let system = SceneSystem::with_config(provider.clone(), config());
    (system, provider)
}

/// The composed plan without the scene-less reference restore step.
pub fn scene_steps(operation: &SceneOperation) -> Vec<(ActionKind, String)> {
    operation
        .plan()
        .into_iter()
        .filter_map(|record| Some((record.kind, record.scene?.to_string())))
        .collect()
}
