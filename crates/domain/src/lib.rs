//! Domain layer of the configuration store.
//!
//! This crate provides:
//! - the Aggregate and DomainEvent traits and the two-phase [`Recorder`]
//! - the hierarchical, case-insensitive [`KeyStore`]
//! - the environment, layer, structure and configuration aggregates and
//!   the lists enumerating them

pub mod aggregate;
pub mod configuration;
pub mod environment;
pub mod error;
pub mod keys;
pub mod layer;
pub mod list;
pub mod recorder;
pub mod structure;

pub use aggregate::{Aggregate, DomainEvent, ReplayedEvent};
pub use configuration::{
    ConfigurationError, ConfigurationEvent, ConfigurationList, PreparedConfiguration,
    compile_keys,
};
pub use environment::{ConfigEnvironment, EnvironmentError, EnvironmentEvent, EnvironmentList};
pub use error::DomainError;
pub use keys::{
    ConfigKey, ConfigKeyAction, KeyCompletion, KeyError, KeyPathNode, KeySelection, KeyStore,
};
pub use layer::{EnvironmentLayer, LayerError, LayerEvent, LayerList};
pub use list::{ListChange, ListedEvent, ObjectList};
pub use recorder::Recorder;
pub use structure::{ConfigStructure, StructureError, StructureEvent, StructureList};
