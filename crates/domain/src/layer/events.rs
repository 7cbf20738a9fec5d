//! Layer domain events.

use common::LayerIdentifier;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::keys::ConfigKeyAction;
use crate::list::{ListChange, ListedEvent};

/// Events that can occur on a layer aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LayerEvent {
    LayerCreated(LayerCreatedData),
    LayerDeleted(LayerDeletedData),

    /// The whole key set was replaced.
    LayerKeysImported(LayerKeysData),

    /// Individual keys were set or deleted.
    LayerKeysModified(LayerKeysData),
}

impl DomainEvent for LayerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LayerEvent::LayerCreated(_) => "LayerCreated",
            LayerEvent::LayerDeleted(_) => "LayerDeleted",
            LayerEvent::LayerKeysImported(_) => "LayerKeysImported",
            LayerEvent::LayerKeysModified(_) => "LayerKeysModified",
        }
    }
}

impl ListedEvent for LayerEvent {
    type Item = LayerIdentifier;

    const SOURCE_TYPE: &'static str = "EnvironmentLayer";
    const LIST_TYPE: &'static str = "LayerList";
    const EVENT_TYPES: &'static [&'static str] = &["LayerCreated", "LayerDeleted"];

    fn list_change(self) -> Option<ListChange<LayerIdentifier>> {
        match self {
            LayerEvent::LayerCreated(data) => Some(ListChange::Added(data.identifier)),
            LayerEvent::LayerDeleted(data) => Some(ListChange::Removed(data.identifier)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerCreatedData {
    pub identifier: LayerIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDeletedData {
    pub identifier: LayerIdentifier,
}

/// Data for LayerKeysImported and LayerKeysModified events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerKeysData {
    pub identifier: LayerIdentifier,

    /// Applied in order.
    pub actions: Vec<ConfigKeyAction>,
}

impl LayerEvent {
    pub fn created(identifier: LayerIdentifier) -> Self {
        LayerEvent::LayerCreated(LayerCreatedData { identifier })
    }

    pub fn deleted(identifier: LayerIdentifier) -> Self {
        LayerEvent::LayerDeleted(LayerDeletedData { identifier })
    }

    pub fn keys_imported(identifier: LayerIdentifier, actions: Vec<ConfigKeyAction>) -> Self {
        LayerEvent::LayerKeysImported(LayerKeysData {
            identifier,
            actions,
        })
    }

    pub fn keys_modified(identifier: LayerIdentifier, actions: Vec<ConfigKeyAction>) -> Self {
        LayerEvent::LayerKeysModified(LayerKeysData {
            identifier,
            actions,
        })
    }

    /// Returns the layer this event applies to.
    pub fn identifier(&self) -> &LayerIdentifier {
        match self {
            LayerEvent::LayerCreated(data) => &data.identifier,
            LayerEvent::LayerDeleted(data) => &data.identifier,
            LayerEvent::LayerKeysImported(data) | LayerEvent::LayerKeysModified(data) => {
                &data.identifier
            }
        }
    }
}
