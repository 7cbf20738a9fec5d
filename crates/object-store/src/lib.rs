//! Domain object store for the configuration service.
//!
//! [`DomainObjectStore`] reconstructs aggregates from three sources: an
//! in-process cache, the snapshot store and the event log. Reads always
//! finish with a catch-up replay from the log, so the cache and snapshots
//! only shorten the replay and never make a read stale.
//!
//! On top of it sit the [`KeyQueryService`] and [`CommandService`], and the
//! [`SnapshotService`] which persists snapshots whenever one of its
//! registered triggers fires.

pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod queries;
pub mod snapshots;
pub mod store;
pub mod triggers;

pub use cache::ObjectCache;
pub use commands::CommandService;
pub use config::ObjectStoreConfig;
pub use error::{ObjectStoreError, Result};
pub use queries::{KeyOwner, KeyQuery, KeyQueryService};
pub use snapshots::SnapshotService;
pub use store::DomainObjectStore;
pub use triggers::{
    NumberThresholdSnapshotTrigger, OnDemandSnapshotTrigger, ScheduledSnapshotTrigger,
    SnapshotTrigger,
};
