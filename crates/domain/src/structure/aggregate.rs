//! Structure aggregate implementation.

use std::collections::BTreeMap;

use common::StructureIdentifier;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::keys::{ConfigKeyAction, KeyStore, validate_actions};

use super::{StructureError, StructureEvent};

fn set_actions(values: &BTreeMap<String, String>) -> Vec<ConfigKeyAction> {
    values
        .iter()
        .map(|(path, value)| ConfigKeyAction::set(path.as_str(), value.as_str()))
        .collect()
}

/// The keys a configuration of one structure version consists of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigStructure {
    identifier: StructureIdentifier,

    #[serde(default)]
    version: Version,

    created: bool,
    deleted: bool,
    keys: KeyStore,
    variables: KeyStore,
}

impl Aggregate for ConfigStructure {
    type Id = StructureIdentifier;
    type Event = StructureEvent;
    type Error = StructureError;

    fn aggregate_type() -> &'static str {
        "ConfigStructure"
    }

    fn for_identifier(identifier: StructureIdentifier) -> Self {
        Self {
            identifier,
            version: Version::initial(),
            created: false,
            deleted: false,
            keys: KeyStore::new(),
            variables: KeyStore::new(),
        }
    }

    fn identifier(&self) -> &StructureIdentifier {
        &self.identifier
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: StructureEvent) {
        match event {
            StructureEvent::StructureCreated(data) => {
                self.created = true;
                self.deleted = false;
                self.keys.import(&set_actions(&data.keys), self.version);
                self.variables
                    .import(&set_actions(&data.variables), self.version);
            }
            StructureEvent::StructureDeleted(_) => {
                self.deleted = true;
                self.keys.clear();
                self.variables.clear();
            }
            StructureEvent::StructureVariablesModified(data) => {
                self.variables.apply_actions(&data.actions, self.version)
            }
        }
    }
}

// Query methods
impl ConfigStructure {
    /// Returns true if the structure was created and not deleted.
    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    pub fn variables(&self) -> &KeyStore {
        &self.variables
    }
}

// Command methods (return events)
impl ConfigStructure {
    pub fn create(
        &self,
        keys: BTreeMap<String, String>,
        variables: BTreeMap<String, String>,
    ) -> Result<Vec<StructureEvent>, StructureError> {
        if self.exists() {
            return Err(StructureError::AlreadyExists(self.identifier.clone()));
        }
        validate_actions(&set_actions(&keys), true)?;
        validate_actions(&set_actions(&variables), true)?;

        Ok(vec![StructureEvent::created(
            self.identifier.clone(),
            keys,
            variables,
        )])
    }

    pub fn delete(&self) -> Result<Vec<StructureEvent>, StructureError> {
        self.ensure_exists()?;
        Ok(vec![StructureEvent::deleted(self.identifier.clone())])
    }

    pub fn modify_variables(
        &self,
        actions: Vec<ConfigKeyAction>,
    ) -> Result<Vec<StructureEvent>, StructureError> {
        self.ensure_exists()?;
        validate_actions(&actions, false)?;
        Ok(vec![StructureEvent::variables_modified(
            self.identifier.clone(),
            actions,
        )])
    }

    fn ensure_exists(&self) -> Result<(), StructureError> {
        if !self.exists() {
            return Err(StructureError::NotFound(self.identifier.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ReplayedEvent;
    use crate::keys::KeyError;
    use chrono::Utc;

    fn replay(structure: &mut ConfigStructure, events: Vec<StructureEvent>) {
        for event in events {
            let next = structure.version().next();
            structure
                .apply_replayed(ReplayedEvent::new(event, next, Utc::now()))
                .unwrap();
        }
    }

    fn created_structure() -> ConfigStructure {
        let mut structure = ConfigStructure::for_identifier(StructureIdentifier::new("App", 1));
        let keys = BTreeMap::from([
            ("Db/Host".to_string(), "{{host}}".to_string()),
            ("Db/Port".to_string(), "5432".to_string()),
        ]);
        let variables = BTreeMap::from([("host".to_string(), "localhost".to_string())]);
        let events = structure.create(keys, variables).unwrap();
        replay(&mut structure, events);
        structure
    }

    #[test]
    fn test_create_structure() {
        let structure = created_structure();
        assert!(structure.exists());
        assert_eq!(structure.keys().len(), 2);
        assert!(structure.keys().key_paths().find("db").unwrap().has_children());
        assert_eq!(structure.variables().get("HOST").unwrap().value, "localhost");
    }

    #[test]
    fn test_create_rejects_blank_key() {
        let structure = ConfigStructure::for_identifier(StructureIdentifier::new("App", 2));
        let keys = BTreeMap::from([("/".to_string(), "x".to_string())]);
        assert!(matches!(
            structure.create(keys, BTreeMap::new()),
            Err(StructureError::Keys(KeyError::BlankPath { .. }))
        ));
    }

    #[test]
    fn test_modify_variables() {
        let mut structure = created_structure();
        let events = structure
            .modify_variables(vec![
                ConfigKeyAction::set("Host", "db.internal"),
                ConfigKeyAction::set("user", "admin"),
            ])
            .unwrap();
        replay(&mut structure, events);

        assert_eq!(structure.variables().len(), 2);
        assert_eq!(structure.variables().get("host").unwrap().value, "db.internal");
        assert_eq!(structure.variables().get("host").unwrap().path, "Host");
    }

    #[test]
    fn test_delete_structure() {
        let mut structure = created_structure();
        let events = structure.delete().unwrap();
        replay(&mut structure, events);
        assert!(!structure.exists());
        assert!(matches!(
            structure.delete(),
            Err(StructureError::NotFound(_))
        ));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let structure = created_structure();
        let restored =
            ConfigStructure::restore_snapshot(&structure.create_snapshot().unwrap()).unwrap();
        assert_eq!(restored, structure);
    }
}
