//! Ordered, named groups of scenes with shared open/close policy.

use super::scene::{Scene, SceneId};
use serde::{Deserialize, Serialize};

/// How a collection's operations pick a loading screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadingScreenUsage {
    DontUse,
    /// Use the scheduler-wide default loading screen, if one is configured.
    #[default]
    UseDefault,
    Override(Scene),
}

/// Whether a collection is opened by [`SceneSystem::start_up`](crate::lifecycle::SceneSystem::start_up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StartupOption {
    /// Opened at startup when no collection is explicitly flagged [`StartupOption::Open`].
    #[default]
    Auto,
    Open,
    DoNotOpen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneCollection {
    name: String,
    scenes: Vec<Scene>,
    #[serde(default)]
    active_scene: Option<SceneId>,
    #[serde(default)]
    loading_screen: LoadingScreenUsage,
    #[serde(default)]
    startup: StartupOption,
}

impl SceneCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scenes: Vec::new(),
            active_scene: None,
            loading_screen: LoadingScreenUsage::default(),
            startup: StartupOption::default(),
        }
    }

    /// Appends a scene. Duplicates (by identity) are ignored.
    pub fn with_scene(mut self, scene: Scene) -> Self {
        if !self.contains(scene.id()) {
            self.scenes.push(scene);
        }
        self
    }

    pub fn with_scenes(self, scenes: impl IntoIterator<Item = Scene>) -> Self {
        scenes.into_iter().fold(self, Self::with_scene)
    }

    pub fn with_active_scene(mut self, scene: impl Into<SceneId>) -> Self {
        self.active_scene = Some(scene.into());
        self
    }

    pub fn with_loading_screen(mut self, usage: LoadingScreenUsage) -> Self {
        self.loading_screen = usage;
        self
    }

    pub fn with_startup(mut self, startup: StartupOption) -> Self {
        self.startup = startup;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn contains(&self, scene: &SceneId) -> bool {
        self.scenes.iter().any(|s| s.id() == scene)
    }

    /// The declared active scene.
    pub fn active_scene(&self) -> Option<&SceneId> {
        self.active_scene.as_ref()
    }

    pub fn loading_screen(&self) -> &LoadingScreenUsage {
        &self.loading_screen
    }

    pub fn startup(&self) -> StartupOption {
        self.startup
    }
}

impl PartialEq for SceneCollection {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for SceneCollection {}
