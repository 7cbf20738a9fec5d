//! Configuration structures: versioned key templates with variables.

mod aggregate;
mod events;

use common::StructureIdentifier;
use thiserror::Error;

use crate::keys::KeyError;
use crate::list::ObjectList;

pub use aggregate::ConfigStructure;
pub use events::{
    StructureCreatedData, StructureDeletedData, StructureEvent, StructureVariablesModifiedData,
};

/// All live structures.
pub type StructureList = ObjectList<StructureEvent>;

/// Errors that can occur during structure operations.
#[derive(Debug, Error)]
pub enum StructureError {
    #[error("Structure {0} already exists")]
    AlreadyExists(StructureIdentifier),

    #[error("Structure {0} not found")]
    NotFound(StructureIdentifier),

    #[error(transparent)]
    Keys(#[from] KeyError),
}
