//! Structure domain events.

use std::collections::BTreeMap;

use common::StructureIdentifier;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::keys::ConfigKeyAction;
use crate::list::{ListChange, ListedEvent};

/// Events that can occur on a structure aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StructureEvent {
    StructureCreated(StructureCreatedData),
    StructureDeleted(StructureDeletedData),
    StructureVariablesModified(StructureVariablesModifiedData),
}

impl DomainEvent for StructureEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StructureEvent::StructureCreated(_) => "StructureCreated",
            StructureEvent::StructureDeleted(_) => "StructureDeleted",
            StructureEvent::StructureVariablesModified(_) => "StructureVariablesModified",
        }
    }
}

impl ListedEvent for StructureEvent {
    type Item = StructureIdentifier;

    const SOURCE_TYPE: &'static str = "ConfigStructure";
    const LIST_TYPE: &'static str = "StructureList";
    const EVENT_TYPES: &'static [&'static str] = &["StructureCreated", "StructureDeleted"];

    fn list_change(self) -> Option<ListChange<StructureIdentifier>> {
        match self {
            StructureEvent::StructureCreated(data) => Some(ListChange::Added(data.identifier)),
            StructureEvent::StructureDeleted(data) => Some(ListChange::Removed(data.identifier)),
            StructureEvent::StructureVariablesModified(_) => None,
        }
    }
}

/// Data for StructureCreated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureCreatedData {
    pub identifier: StructureIdentifier,

    /// Key paths with their default values.
    pub keys: BTreeMap<String, String>,

    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureDeletedData {
    pub identifier: StructureIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureVariablesModifiedData {
    pub identifier: StructureIdentifier,
    pub actions: Vec<ConfigKeyAction>,
}

impl StructureEvent {
    pub fn created(
        identifier: StructureIdentifier,
        keys: BTreeMap<String, String>,
        variables: BTreeMap<String, String>,
    ) -> Self {
        StructureEvent::StructureCreated(StructureCreatedData {
            identifier,
            keys,
            variables,
        })
    }

    pub fn deleted(identifier: StructureIdentifier) -> Self {
        StructureEvent::StructureDeleted(StructureDeletedData { identifier })
    }

    pub fn variables_modified(
        identifier: StructureIdentifier,
        actions: Vec<ConfigKeyAction>,
    ) -> Self {
        StructureEvent::StructureVariablesModified(StructureVariablesModifiedData {
            identifier,
            actions,
        })
    }
}
