//! Layer aggregate implementation.

use common::LayerIdentifier;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::keys::{ConfigKeyAction, KeyStore, validate_actions};

use super::{LayerError, LayerEvent};

/// A named set of keys that environments stack in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentLayer {
    identifier: LayerIdentifier,

    #[serde(default)]
    version: Version,

    created: bool,
    deleted: bool,
    keys: KeyStore,
}

impl Aggregate for EnvironmentLayer {
    type Id = LayerIdentifier;
    type Event = LayerEvent;
    type Error = LayerError;

    fn aggregate_type() -> &'static str {
        "EnvironmentLayer"
    }

    fn for_identifier(identifier: LayerIdentifier) -> Self {
        Self {
            identifier,
            version: Version::initial(),
            created: false,
            deleted: false,
            keys: KeyStore::new(),
        }
    }

    fn identifier(&self) -> &LayerIdentifier {
        &self.identifier
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: LayerEvent) {
        match event {
            LayerEvent::LayerCreated(_) => {
                self.created = true;
                self.deleted = false;
                self.keys.clear();
            }
            LayerEvent::LayerDeleted(_) => {
                self.deleted = true;
                self.keys.clear();
            }
            LayerEvent::LayerKeysImported(data) => self.keys.import(&data.actions, self.version),
            LayerEvent::LayerKeysModified(data) => {
                self.keys.apply_actions(&data.actions, self.version)
            }
        }
    }
}

// Query methods
impl EnvironmentLayer {
    /// Returns true if the layer was created and not deleted.
    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }
}

// Command methods (return events)
impl EnvironmentLayer {
    pub fn create(&self) -> Result<Vec<LayerEvent>, LayerError> {
        if self.exists() {
            return Err(LayerError::AlreadyExists(self.identifier.clone()));
        }
        Ok(vec![LayerEvent::created(self.identifier.clone())])
    }

    pub fn delete(&self) -> Result<Vec<LayerEvent>, LayerError> {
        self.ensure_exists()?;
        Ok(vec![LayerEvent::deleted(self.identifier.clone())])
    }

    /// Replaces all keys of the layer.
    pub fn import_keys(&self, actions: Vec<ConfigKeyAction>) -> Result<Vec<LayerEvent>, LayerError> {
        self.ensure_exists()?;
        validate_actions(&actions, true)?;
        Ok(vec![LayerEvent::keys_imported(
            self.identifier.clone(),
            actions,
        )])
    }

    pub fn modify_keys(&self, actions: Vec<ConfigKeyAction>) -> Result<Vec<LayerEvent>, LayerError> {
        self.ensure_exists()?;
        validate_actions(&actions, false)?;
        Ok(vec![LayerEvent::keys_modified(
            self.identifier.clone(),
            actions,
        )])
    }

    fn ensure_exists(&self) -> Result<(), LayerError> {
        if !self.exists() {
            return Err(LayerError::NotFound(self.identifier.clone()));
        }
        Ok(())
    }
}
