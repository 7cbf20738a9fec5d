//! Shared types for the configuration store: typed aggregate identifiers
//! and paging primitives.

pub mod paging;
pub mod types;

pub use paging::{Page, QueryRange};
pub use types::{
    ConfigurationIdentifier, EnvironmentIdentifier, Identifier, LayerIdentifier, ListScope,
    StructureIdentifier,
};
