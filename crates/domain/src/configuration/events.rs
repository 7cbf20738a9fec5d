//! Configuration domain events.

use chrono::{DateTime, Utc};
use common::{ConfigurationIdentifier, LayerIdentifier};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::keys::ConfigKeyAction;
use crate::list::{ListChange, ListedEvent};

/// Events that can occur on a configuration aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ConfigurationEvent {
    ConfigurationBuilt(ConfigurationBuiltData),
}

impl DomainEvent for ConfigurationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ConfigurationEvent::ConfigurationBuilt(_) => "ConfigurationBuilt",
        }
    }
}

impl ListedEvent for ConfigurationEvent {
    type Item = ConfigurationIdentifier;

    const SOURCE_TYPE: &'static str = "PreparedConfiguration";
    const LIST_TYPE: &'static str = "ConfigurationList";
    const EVENT_TYPES: &'static [&'static str] = &["ConfigurationBuilt"];

    fn list_change(self) -> Option<ListChange<ConfigurationIdentifier>> {
        match self {
            ConfigurationEvent::ConfigurationBuilt(data) => Some(ListChange::Added(data.identifier)),
        }
    }
}

/// Data for ConfigurationBuilt event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationBuiltData {
    pub identifier: ConfigurationIdentifier,

    /// The compiled keys.
    pub keys: Vec<ConfigKeyAction>,

    /// Layers that contributed, in overlay order.
    pub used_layers: Vec<LayerIdentifier>,

    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,

    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
}

impl ConfigurationEvent {
    pub fn built(data: ConfigurationBuiltData) -> Self {
        ConfigurationEvent::ConfigurationBuilt(data)
    }
}
