//! Environment domain events.

use common::{EnvironmentIdentifier, LayerIdentifier};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::keys::ConfigKeyAction;
use crate::list::{ListChange, ListedEvent};

/// Events that can occur on an environment aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EnvironmentEvent {
    EnvironmentCreated(EnvironmentCreatedData),
    EnvironmentDeleted(EnvironmentDeletedData),

    /// The ordered list of assigned layers was replaced.
    EnvironmentLayersModified(EnvironmentLayersModifiedData),

    /// The whole key set was replaced.
    EnvironmentKeysImported(EnvironmentKeysData),

    /// Individual keys were set or deleted.
    EnvironmentKeysModified(EnvironmentKeysData),
}

impl DomainEvent for EnvironmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            EnvironmentEvent::EnvironmentCreated(_) => "EnvironmentCreated",
            EnvironmentEvent::EnvironmentDeleted(_) => "EnvironmentDeleted",
            EnvironmentEvent::EnvironmentLayersModified(_) => "EnvironmentLayersModified",
            EnvironmentEvent::EnvironmentKeysImported(_) => "EnvironmentKeysImported",
            EnvironmentEvent::EnvironmentKeysModified(_) => "EnvironmentKeysModified",
        }
    }
}

impl ListedEvent for EnvironmentEvent {
    type Item = EnvironmentIdentifier;

    const SOURCE_TYPE: &'static str = "ConfigEnvironment";
    const LIST_TYPE: &'static str = "EnvironmentList";
    const EVENT_TYPES: &'static [&'static str] = &["EnvironmentCreated", "EnvironmentDeleted"];

    fn list_change(self) -> Option<ListChange<EnvironmentIdentifier>> {
        match self {
            EnvironmentEvent::EnvironmentCreated(data) => Some(ListChange::Added(data.identifier)),
            EnvironmentEvent::EnvironmentDeleted(data) => {
                Some(ListChange::Removed(data.identifier))
            }
            _ => None,
        }
    }
}

/// Data for EnvironmentCreated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentCreatedData {
    pub identifier: EnvironmentIdentifier,

    /// Default environments exist for every category and cannot be deleted.
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDeletedData {
    pub identifier: EnvironmentIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentLayersModifiedData {
    pub identifier: EnvironmentIdentifier,

    /// Layers in overlay order; later layers win.
    pub layers: Vec<LayerIdentifier>,
}

/// Data for EnvironmentKeysImported and EnvironmentKeysModified events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentKeysData {
    pub identifier: EnvironmentIdentifier,
    pub actions: Vec<ConfigKeyAction>,
}

impl EnvironmentEvent {
    pub fn created(identifier: EnvironmentIdentifier, is_default: bool) -> Self {
        EnvironmentEvent::EnvironmentCreated(EnvironmentCreatedData {
            identifier,
            is_default,
        })
    }

    pub fn deleted(identifier: EnvironmentIdentifier) -> Self {
        EnvironmentEvent::EnvironmentDeleted(EnvironmentDeletedData { identifier })
    }

    pub fn layers_modified(identifier: EnvironmentIdentifier, layers: Vec<LayerIdentifier>) -> Self {
        EnvironmentEvent::EnvironmentLayersModified(EnvironmentLayersModifiedData {
            identifier,
            layers,
        })
    }

    pub fn keys_imported(identifier: EnvironmentIdentifier, actions: Vec<ConfigKeyAction>) -> Self {
        EnvironmentEvent::EnvironmentKeysImported(EnvironmentKeysData {
            identifier,
            actions,
        })
    }

    pub fn keys_modified(identifier: EnvironmentIdentifier, actions: Vec<ConfigKeyAction>) -> Self {
        EnvironmentEvent::EnvironmentKeysModified(EnvironmentKeysData {
            identifier,
            actions,
        })
    }

    /// Returns the environment this event applies to.
    pub fn identifier(&self) -> &EnvironmentIdentifier {
        match self {
            EnvironmentEvent::EnvironmentCreated(data) => &data.identifier,
            EnvironmentEvent::EnvironmentDeleted(data) => &data.identifier,
            EnvironmentEvent::EnvironmentLayersModified(data) => &data.identifier,
            EnvironmentEvent::EnvironmentKeysImported(data)
            | EnvironmentEvent::EnvironmentKeysModified(data) => &data.identifier,
        }
    }
}
