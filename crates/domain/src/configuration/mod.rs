//! Prepared configurations compiled from an environment and a structure.

mod aggregate;
mod compile;
mod events;

use chrono::{DateTime, Utc};
use common::{ConfigurationIdentifier, EnvironmentIdentifier, StructureIdentifier};
use thiserror::Error;

use crate::list::ObjectList;

pub use aggregate::PreparedConfiguration;
pub use compile::compile_keys;
pub use events::{ConfigurationBuiltData, ConfigurationEvent};

/// All built configurations.
pub type ConfigurationList = ObjectList<ConfigurationEvent>;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Configuration {0} was already built")]
    AlreadyBuilt(ConfigurationIdentifier),

    #[error("Environment {0} not found")]
    EnvironmentNotFound(EnvironmentIdentifier),

    #[error("Structure {0} not found")]
    StructureNotFound(StructureIdentifier),

    #[error("Invalid validity window: {valid_from} is after {valid_to}")]
    InvalidValidity {
        valid_from: DateTime<Utc>,
        valid_to: DateTime<Utc>,
    },
}
