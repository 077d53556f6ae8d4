//! Scheduler-wide settings.
//!
//! Everything here is in-memory. [`SchedulerConfig::from_env`] overlays a couple of
//! environment variables on top of the defaults, which is handy for the demo binary and
//! for tests that want a zero settle window.

use crate::adapters::LoadPriority;
use crate::model::{Scene, SceneId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

pub const SETTLE_MS_ENV: &str = "SCENE_OPS_SETTLE_MS";
pub const SENTINEL_ENV: &str = "SCENE_OPS_SENTINEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Window after creation during which an operation may still be configured.
    pub settle_delay_ms: u64,
    /// Load priority restored whenever the queue drains or an operation cancels.
    pub default_priority: LoadPriority,
    /// Load priority applied by the operation at the head of the queue.
    pub operation_priority: LoadPriority,
    /// Loading screen for collections that ask for the default one.
    pub default_loading_screen: Option<Scene>,
    /// Scene that is never closed.
    pub sentinel_scene: Option<SceneId>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 10,
            default_priority: LoadPriority::Normal,
            operation_priority: LoadPriority::High,
            default_loading_screen: None,
            sentinel_scene: None,
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(SETTLE_MS_ENV) {
            match raw.parse() {
                Ok(ms) => config.settle_delay_ms = ms,
                Err(e) => warn!(var = SETTLE_MS_ENV, value = %raw, error = %e, "Ignoring invalid value"),
            }
        }
        if let Ok(sentinel) = std::env::var(SENTINEL_ENV) {
            if !sentinel.is_empty() {
                config.sentinel_scene = Some(SceneId::new(sentinel));
            }
        }
        config
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_sentinel(mut self, scene: impl Into<SceneId>) -> Self {
        self.sentinel_scene = Some(scene.into());
        self
    }

    pub fn with_default_loading_screen(mut self, scene: Scene) -> Self {
        self.default_loading_screen = Some(scene);
        self
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.settle_delay(), Duration::from_millis(10));
        assert_eq!(config.default_priority, LoadPriority::Normal);
        assert_eq!(config.operation_priority, LoadPriority::High);
        assert!(config.sentinel_scene.is_none());
    }

    #[test]
    fn test_builders() {
        let config = SchedulerConfig::default()
            .with_settle_delay(Duration::ZERO)
            .with_sentinel("persistent");
        assert_eq!(config.settle_delay_ms, 0);
        assert_eq!(config.sentinel_scene, Some(SceneId::new("persistent")));
    }
}
