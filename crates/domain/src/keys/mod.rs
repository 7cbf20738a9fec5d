//! Hierarchical, case-insensitive key store.
//!
//! Keys are `/`-delimited paths. Lookups fold case, so `Foo/Bar` and
//! `foo/bar` address the same entry; the entry keeps the spelling of the
//! last write. Alongside the flat map the store maintains a trie of path
//! segments used for autocomplete.

mod paths;

use std::collections::BTreeMap;

use common::{Page, QueryRange};
use event_store::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use paths::{KeyCompletion, KeyPathNode};

/// Path separator of the key namespace.
pub const PATH_SEPARATOR: char = '/';

/// Folds a path for case-insensitive comparison.
pub(crate) fn fold(path: &str) -> String {
    path.to_lowercase()
}

/// One change inside a key-mutation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ConfigKeyAction {
    /// Inserts or replaces a key.
    Set {
        path: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },

    /// Removes a key. Removing a missing key is a no-op.
    Delete { path: String },
}

impl ConfigKeyAction {
    /// Creates a `Set` action without type or description.
    pub fn set(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            path: path.into(),
            value: value.into(),
            value_type: None,
            description: None,
        }
    }

    /// Creates a fully described `Set` action.
    pub fn set_described(
        path: impl Into<String>,
        value: impl Into<String>,
        value_type: Option<String>,
        description: Option<String>,
    ) -> Self {
        Self::Set {
            path: path.into(),
            value: value.into(),
            value_type,
            description,
        }
    }

    /// Creates a `Delete` action.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::Delete { path: path.into() }
    }

    /// Returns the path this action targets.
    pub fn path(&self) -> &str {
        match self {
            Self::Set { path, .. } | Self::Delete { path } => path,
        }
    }
}

/// Errors raised when validating key actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// A modification must change at least one key.
    #[error("No key actions given")]
    EmptyActions,

    /// A key path is empty or whitespace.
    #[error("Key path at position {index} is empty")]
    BlankPath { index: usize },
}

/// Validates a list of actions before it is turned into an event.
pub fn validate_actions(actions: &[ConfigKeyAction], allow_empty: bool) -> Result<(), KeyError> {
    if actions.is_empty() && !allow_empty {
        return Err(KeyError::EmptyActions);
    }

    if let Some(index) = actions
        .iter()
        .position(|action| action.path().trim_matches(PATH_SEPARATOR).trim().is_empty())
    {
        return Err(KeyError::BlankPath { index });
    }

    Ok(())
}

/// A stored configuration key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigKey {
    /// Path as spelled by the last write.
    pub path: String,

    pub value: String,

    #[serde(default)]
    pub value_type: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Version of the event that last wrote this key.
    pub version: Version,
}

/// Selection applied to a key store before paging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySelection {
    /// Only keys whose stored path starts with this prefix (case-sensitive).
    pub filter: Option<String>,

    /// Prefix stripped, with one following separator, from returned paths.
    pub remove_root: Option<String>,

    /// A key whose path equals this value sorts first.
    pub prefer_exact_match: Option<String>,
}

impl KeySelection {
    /// Selects every key.
    pub fn all() -> Self {
        Self::default()
    }

    /// Sets the path prefix filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the root stripped from returned paths.
    pub fn with_remove_root(mut self, root: impl Into<String>) -> Self {
        self.remove_root = Some(root.into());
        self
    }

    /// Sets the path that is preferred as first result.
    pub fn with_prefer_exact_match(mut self, path: impl Into<String>) -> Self {
        self.prefer_exact_match = Some(path.into());
        self
    }

    fn strip_root(&self, path: &str) -> String {
        let Some(root) = self.remove_root.as_deref().filter(|r| !r.is_empty()) else {
            return path.to_string();
        };
        match path.strip_prefix(root) {
            Some(rest) => rest
                .strip_prefix(PATH_SEPARATOR)
                .unwrap_or(rest)
                .to_string(),
            None => path.to_string(),
        }
    }
}

/// Keys of one aggregate together with their path trie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStore {
    /// Case-folded path to key.
    keys: BTreeMap<String, ConfigKey>,

    /// Trie mirroring the key namespace.
    key_paths: KeyPathNode,
}

impl KeyStore {
    /// Creates an empty key store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Looks a key up by path, ignoring case.
    pub fn get(&self, path: &str) -> Option<&ConfigKey> {
        self.keys.get(&fold(path))
    }

    /// Iterates over all keys in folded-path order.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigKey> {
        self.keys.values()
    }

    /// Root of the path trie.
    pub fn key_paths(&self) -> &KeyPathNode {
        &self.key_paths
    }

    /// Applies actions in order, stamping written keys with `version`.
    pub fn apply_actions(&mut self, actions: &[ConfigKeyAction], version: Version) {
        for action in actions {
            match action {
                ConfigKeyAction::Set {
                    path,
                    value,
                    value_type,
                    description,
                } => self.set(ConfigKey {
                    path: path.clone(),
                    value: value.clone(),
                    value_type: value_type.clone(),
                    description: description.clone(),
                    version,
                }),
                ConfigKeyAction::Delete { path } => self.delete(path),
            }
        }
    }

    /// Replaces the whole key set with the result of `actions`.
    pub fn import(&mut self, actions: &[ConfigKeyAction], version: Version) {
        self.clear();
        self.apply_actions(actions, version);
    }

    /// Inserts or replaces a key.
    pub fn set(&mut self, key: ConfigKey) {
        self.key_paths.insert(&key.path);
        self.keys.insert(fold(&key.path), key);
    }

    /// Removes a key and its trie leaf.
    pub fn delete(&mut self, path: &str) {
        if self.keys.remove(&fold(path)).is_some() {
            self.key_paths.remove_leaf(path);
        }
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.key_paths = KeyPathNode::default();
    }

    /// Returns `Set` actions that recreate every key, ordered by path.
    pub fn to_actions(&self) -> Vec<ConfigKeyAction> {
        self.keys
            .values()
            .map(|key| {
                ConfigKeyAction::set_described(
                    key.path.clone(),
                    key.value.clone(),
                    key.value_type.clone(),
                    key.description.clone(),
                )
            })
            .collect()
    }

    /// Selects, orders and pages keys.
    ///
    /// Keys are filtered by prefix on the stored path, ordered ordinally by
    /// that path with an exact match of `prefer_exact_match` first, and then
    /// paged. Returned paths have `remove_root` stripped.
    pub fn select(&self, selection: &KeySelection, range: QueryRange) -> Page<ConfigKey> {
        let mut matching: Vec<&ConfigKey> = self
            .keys
            .values()
            .filter(|key| match selection.filter.as_deref() {
                Some(prefix) => key.path.starts_with(prefix),
                None => true,
            })
            .collect();

        let exact = selection.prefer_exact_match.as_deref();
        matching.sort_by(|a, b| {
            let a_exact = Some(a.path.as_str()) == exact;
            let b_exact = Some(b.path.as_str()) == exact;
            b_exact.cmp(&a_exact).then_with(|| a.path.cmp(&b.path))
        });

        range.apply(matching).map(|key| ConfigKey {
            path: selection.strip_root(&key.path),
            ..key.clone()
        })
    }

    /// Autocompletes a partial path against the key trie.
    pub fn complete(&self, partial_path: &str, range: QueryRange) -> Page<KeyCompletion> {
        range.apply(self.key_paths.complete(partial_path))
    }
}
