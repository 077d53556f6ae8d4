/// A named, uniquely keyed loadable unit.
///
/// # Identity
/// Two `Scene` values are equal when their [`SceneId`] is equal. The display name can
/// change (see [`Scene::rename`]) without affecting equality, hashing, or any handle
/// already bound to the scene.
///
/// # Policy
/// Each scene carries the tags the composer consults when deciding whether an intent
/// turns into an action:
/// - [`CloseBehavior`] for close intents
/// - [`OpenBehavior`] for open intents issued inside a collection
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable identity of a scene (typically its asset path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SceneId {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// What happens to an open scene when a close intent targets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CloseBehavior {
    /// Close normally.
    #[default]
    Close,
    /// Stay open when the collection being opened also contains this scene.
    KeepOpenIfNextAlsoContains,
    /// Never closed unless the intent is forced.
    KeepOpenAlways,
}

/// Whether a scene opens as part of its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenBehavior {
    #[default]
    OpenNormally,
    /// Skipped when the owning collection opens; can still be opened standalone or forced.
    DoNotOpenInCollection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    id: SceneId,
    name: String,
    #[serde(default)]
    close_behavior: CloseBehavior,
    #[serde(default)]
    open_behavior: OpenBehavior,
}

impl Scene {
    /// Creates a scene whose display name is the last path segment of `id`.
    ///
    /// ```
    /// use scene_ops::model::Scene;
    ///
    /// let scene = Scene::new("levels/forest.scene");
    /// assert_eq!(scene.name(), "forest");
    /// ```
    pub fn new(id: impl Into<SceneId>) -> Self {
        let id = id.into();
        let name = id
            .as_str()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            name,
            close_behavior: CloseBehavior::default(),
            open_behavior: OpenBehavior::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_close_behavior(mut self, behavior: CloseBehavior) -> Self {
        self.close_behavior = behavior;
        self
    }

    pub fn with_open_behavior(mut self, behavior: OpenBehavior) -> Self {
        self.open_behavior = behavior;
        self
    }

    pub fn id(&self) -> &SceneId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn close_behavior(&self) -> CloseBehavior {
        self.close_behavior
    }

    pub fn open_behavior(&self) -> OpenBehavior {
        self.open_behavior
    }

    /// Changes the display name. Identity is untouched.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl PartialEq for Scene {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Scene {}

impl Hash for Scene {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_is_by_identity() {
        let a = Scene::new("maps/a.scene");
        let mut renamed = a.clone();
        renamed.rename("Something Else");

        assert_eq!(a, renamed);
        let set: HashSet<Scene> = [a, renamed].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_name_from_path() {
        assert_eq!(Scene::new("a/b/menu.unity").name(), "menu");
        assert_eq!(Scene::new("plain").name(), "plain");
    }
}
