//! Environment layers: named, reusable sets of keys.

mod aggregate;
mod events;

use common::LayerIdentifier;
use thiserror::Error;

use crate::keys::KeyError;
use crate::list::ObjectList;

pub use aggregate::EnvironmentLayer;
pub use events::{LayerCreatedData, LayerDeletedData, LayerEvent, LayerKeysData};

/// All live layers.
pub type LayerList = ObjectList<LayerEvent>;

/// Errors that can occur during layer operations.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("Layer {0} already exists")]
    AlreadyExists(LayerIdentifier),

    #[error("Layer {0} not found")]
    NotFound(LayerIdentifier),

    #[error(transparent)]
    Keys(#[from] KeyError),
}
