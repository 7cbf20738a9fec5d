//! Environment aggregate implementation.

use std::collections::HashSet;

use common::{EnvironmentIdentifier, LayerIdentifier};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::keys::{ConfigKeyAction, KeyStore, validate_actions};

use super::{EnvironmentError, EnvironmentEvent};

/// A deployment target with its own keys and an ordered stack of layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEnvironment {
    identifier: EnvironmentIdentifier,

    #[serde(default)]
    version: Version,

    created: bool,
    deleted: bool,
    is_default: bool,

    /// Assigned layers in overlay order.
    layers: Vec<LayerIdentifier>,

    keys: KeyStore,
}

impl Aggregate for ConfigEnvironment {
    type Id = EnvironmentIdentifier;
    type Event = EnvironmentEvent;
    type Error = EnvironmentError;

    fn aggregate_type() -> &'static str {
        "ConfigEnvironment"
    }

    fn for_identifier(identifier: EnvironmentIdentifier) -> Self {
        Self {
            identifier,
            version: Version::initial(),
            created: false,
            deleted: false,
            is_default: false,
            layers: Vec::new(),
            keys: KeyStore::new(),
        }
    }

    fn identifier(&self) -> &EnvironmentIdentifier {
        &self.identifier
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: EnvironmentEvent) {
        match event {
            EnvironmentEvent::EnvironmentCreated(data) => {
                self.created = true;
                self.deleted = false;
                self.is_default = data.is_default;
                self.layers.clear();
                self.keys.clear();
            }
            EnvironmentEvent::EnvironmentDeleted(_) => {
                self.deleted = true;
                self.layers.clear();
                self.keys.clear();
            }
            EnvironmentEvent::EnvironmentLayersModified(data) => self.layers = data.layers,
            EnvironmentEvent::EnvironmentKeysImported(data) => {
                self.keys.import(&data.actions, self.version)
            }
            EnvironmentEvent::EnvironmentKeysModified(data) => {
                self.keys.apply_actions(&data.actions, self.version)
            }
        }
    }
}

// Query methods
impl ConfigEnvironment {
    /// Returns true if the environment was created and not deleted.
    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Assigned layers in overlay order.
    pub fn layers(&self) -> &[LayerIdentifier] {
        &self.layers
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }
}

// Command methods (return events)
impl ConfigEnvironment {
    pub fn create(&self) -> Result<Vec<EnvironmentEvent>, EnvironmentError> {
        self.create_with(false)
    }

    /// Creates the environment flagged as default.
    pub fn create_default(&self) -> Result<Vec<EnvironmentEvent>, EnvironmentError> {
        self.create_with(true)
    }

    fn create_with(&self, is_default: bool) -> Result<Vec<EnvironmentEvent>, EnvironmentError> {
        if self.exists() {
            return Err(EnvironmentError::AlreadyExists(self.identifier.clone()));
        }
        Ok(vec![EnvironmentEvent::created(
            self.identifier.clone(),
            is_default,
        )])
    }

    pub fn delete(&self) -> Result<Vec<EnvironmentEvent>, EnvironmentError> {
        self.ensure_exists()?;
        if self.is_default {
            return Err(EnvironmentError::CannotDeleteDefault(
                self.identifier.clone(),
            ));
        }
        Ok(vec![EnvironmentEvent::deleted(self.identifier.clone())])
    }

    /// Replaces the assigned layers.
    ///
    /// Whether the layers exist is checked by the caller, which has access
    /// to the layer list.
    pub fn assign_layers(
        &self,
        layers: Vec<LayerIdentifier>,
    ) -> Result<Vec<EnvironmentEvent>, EnvironmentError> {
        self.ensure_exists()?;

        let mut seen = HashSet::new();
        if let Some(duplicate) = layers.iter().find(|layer| !seen.insert(*layer)) {
            return Err(EnvironmentError::DuplicateLayer((*duplicate).clone()));
        }

        if layers == self.layers {
            return Ok(vec![]);
        }
        Ok(vec![EnvironmentEvent::layers_modified(
            self.identifier.clone(),
            layers,
        )])
    }

    /// Replaces all keys of the environment.
    pub fn import_keys(
        &self,
        actions: Vec<ConfigKeyAction>,
    ) -> Result<Vec<EnvironmentEvent>, EnvironmentError> {
        self.ensure_exists()?;
        validate_actions(&actions, true)?;
        Ok(vec![EnvironmentEvent::keys_imported(
            self.identifier.clone(),
            actions,
        )])
    }

    pub fn modify_keys(
        &self,
        actions: Vec<ConfigKeyAction>,
    ) -> Result<Vec<EnvironmentEvent>, EnvironmentError> {
        self.ensure_exists()?;
        validate_actions(&actions, false)?;
        Ok(vec![EnvironmentEvent::keys_modified(
            self.identifier.clone(),
            actions,
        )])
    }

    fn ensure_exists(&self) -> Result<(), EnvironmentError> {
        if !self.exists() {
            return Err(EnvironmentError::NotFound(self.identifier.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ReplayedEvent;
    use chrono::Utc;

    fn replay(env: &mut ConfigEnvironment, events: Vec<EnvironmentEvent>) {
        for event in events {
            let next = env.version().next();
            env.apply_replayed(ReplayedEvent::new(event, next, Utc::now()))
                .unwrap();
        }
    }

    fn created_env() -> ConfigEnvironment {
        let mut env = ConfigEnvironment::for_identifier(EnvironmentIdentifier::new("Foo", "Bar"));
        let events = env.create().unwrap();
        replay(&mut env, events);
        env
    }

    #[test]
    fn test_create_environment() {
        let env = created_env();
        assert!(env.exists());
        assert!(!env.is_default());
        assert!(matches!(
            env.create(),
            Err(EnvironmentError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_default_environment_cannot_be_deleted() {
        let mut env = ConfigEnvironment::for_identifier(EnvironmentIdentifier::new("Foo", "Default"));
        let events = env.create_default().unwrap();
        replay(&mut env, events);

        assert!(env.is_default());
        assert!(matches!(
            env.delete(),
            Err(EnvironmentError::CannotDeleteDefault(_))
        ));
    }

    #[test]
    fn test_assign_layers() {
        let mut env = created_env();
        let layers = vec![LayerIdentifier::new("Base"), LayerIdentifier::new("Override")];
        let events = env.assign_layers(layers.clone()).unwrap();
        replay(&mut env, events);
        assert_eq!(env.layers(), layers.as_slice());

        // Same assignment again records nothing
        assert!(env.assign_layers(layers).unwrap().is_empty());
    }

    #[test]
    fn test_assign_duplicate_layer_fails() {
        let env = created_env();
        let result = env.assign_layers(vec![
            LayerIdentifier::new("Base"),
            LayerIdentifier::new("Base"),
        ]);
        assert!(matches!(result, Err(EnvironmentError::DuplicateLayer(_))));
    }

    #[test]
    fn test_import_then_modify_keys() {
        let mut env = created_env();
        let events = env
            .import_keys(vec![
                ConfigKeyAction::set("Foo", "FooValue"),
                ConfigKeyAction::set("Bar", "BarValue"),
            ])
            .unwrap();
        replay(&mut env, events);
        let events = env
            .modify_keys(vec![
                ConfigKeyAction::delete("bar"),
                ConfigKeyAction::set("Baz", "BazValue"),
            ])
            .unwrap();
        replay(&mut env, events);

        let paths: Vec<_> = env.keys().iter().map(|k| k.path.as_str()).collect();
        assert_eq!(paths, vec!["Baz", "Foo"]);
        assert_eq!(env.keys().get("Foo").unwrap().version, Version::new(2));
        assert_eq!(env.keys().get("Baz").unwrap().version, Version::new(3));
    }

    #[test]
    fn test_deleted_environment_rejects_commands() {
        let mut env = created_env();
        let events = env.delete().unwrap();
        replay(&mut env, events);

        assert!(!env.exists());
        assert!(matches!(
            env.modify_keys(vec![ConfigKeyAction::set("A", "1")]),
            Err(EnvironmentError::NotFound(_))
        ));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut env = created_env();
        let events = env
            .assign_layers(vec![LayerIdentifier::new("Base")])
            .unwrap();
        replay(&mut env, events);
        let events = env
            .import_keys(vec![ConfigKeyAction::set("Foo/Bar", "1")])
            .unwrap();
        replay(&mut env, events);

        let restored =
            ConfigEnvironment::restore_snapshot(&env.create_snapshot().unwrap()).unwrap();
        assert_eq!(restored, env);
    }
}
