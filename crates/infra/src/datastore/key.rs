use serde::{Deserialize, Serialize};

use patchlog_core::{EntityId, ModelName};

/// Hierarchical store key, e.g. `/model/user/42`.
///
/// Keys are always clean: a single leading `/`, no trailing `/`, no empty
/// segments. The root key is `/`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Build a key from a path, normalizing separators.
    pub fn new(path: impl AsRef<str>) -> Self {
        let mut clean = String::with_capacity(path.as_ref().len() + 1);
        for segment in path.as_ref().split('/').filter(|s| !s.is_empty()) {
            clean.push('/');
            clean.push_str(segment);
        }
        if clean.is_empty() {
            clean.push('/');
        }
        Self(clean)
    }

    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Append `segment` (itself normalized) below this key.
    pub fn child_string(&self, segment: impl AsRef<str>) -> Self {
        if self.is_root() {
            Self::new(segment)
        } else {
            Self::new(format!("{}/{}", self.0, segment.as_ref()))
        }
    }

    /// Storage key of one entity: `self / model / entity_id`.
    pub fn entity(&self, model_name: &ModelName, entity_id: &EntityId) -> Self {
        self.child_string(model_name).child_string(entity_id)
    }

    /// Whether `other` lies strictly below this key.
    pub fn is_ancestor_of(&self, other: &Key) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        other
            .0
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Key {
    fn default() -> Self {
        Self::root()
    }
}

impl core::fmt::Display for Key {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Key> for String {
    fn from(value: Key) -> Self {
        value.0
    }
}
