//! Configuration environments.

mod aggregate;
mod events;

use common::{EnvironmentIdentifier, LayerIdentifier};
use thiserror::Error;

use crate::keys::KeyError;
use crate::list::ObjectList;

pub use aggregate::ConfigEnvironment;
pub use events::{
    EnvironmentCreatedData, EnvironmentDeletedData, EnvironmentEvent, EnvironmentKeysData,
    EnvironmentLayersModifiedData,
};

/// All live environments.
pub type EnvironmentList = ObjectList<EnvironmentEvent>;

/// Errors that can occur during environment operations.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("Environment {0} already exists")]
    AlreadyExists(EnvironmentIdentifier),

    #[error("Environment {0} not found")]
    NotFound(EnvironmentIdentifier),

    /// Default environments cannot be deleted.
    #[error("Environment {0} is a default environment and cannot be deleted")]
    CannotDeleteDefault(EnvironmentIdentifier),

    #[error("Layer {0} is assigned more than once")]
    DuplicateLayer(LayerIdentifier),

    #[error("Layer {0} does not exist")]
    UnknownLayer(LayerIdentifier),

    #[error(transparent)]
    Keys(#[from] KeyError),
}
