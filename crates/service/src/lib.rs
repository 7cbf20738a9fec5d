//! Process wiring for the event-sourced configuration store.
//!
//! Selects the event log and snapshot backends from [`Config`], builds the
//! domain object store with its command and query services, and registers
//! the snapshot triggers the process runs with.

pub mod config;
pub mod error;

use std::sync::Arc;

use event_store::{EventStore, InMemoryEventStore, PostgresEventStore};
use object_store::{
    CommandService, DomainObjectStore, KeyQueryService, NumberThresholdSnapshotTrigger,
    OnDemandSnapshotTrigger, ScheduledSnapshotTrigger, SnapshotService,
};

pub use config::Config;
pub use error::{Result, ServiceError};

/// The assembled services of one process.
pub struct App {
    pub store: Arc<DomainObjectStore>,
    pub commands: CommandService,
    pub queries: KeyQueryService,
    pub snapshots: Arc<SnapshotService>,
    pub on_demand: Arc<OnDemandSnapshotTrigger>,
}

/// Connects the configured backends and builds the services.
///
/// The scheduled, threshold and on-demand snapshot triggers are registered
/// but the snapshot service is not started.
pub async fn build_app(config: &Config) -> Result<App> {
    let events = open_event_log(config).await?;
    let snapshot_store = config.snapshot_store()?.connect().await?;

    let store = Arc::new(DomainObjectStore::new(
        events.clone(),
        snapshot_store.clone(),
        config.object_store(),
    ));

    let snapshots = Arc::new(SnapshotService::new(store.clone()));
    let on_demand = Arc::new(OnDemandSnapshotTrigger::new());
    snapshots
        .register(Arc::new(ScheduledSnapshotTrigger::new(
            config.snapshot_interval,
        )))
        .await;
    snapshots
        .register(Arc::new(NumberThresholdSnapshotTrigger::new(
            events,
            snapshot_store,
            config.snapshot_threshold,
            config.snapshot_poll_interval,
        )))
        .await;
    snapshots.register(on_demand.clone()).await;

    Ok(App {
        commands: CommandService::new(store.clone()),
        queries: KeyQueryService::new(store.clone()),
        store,
        snapshots,
        on_demand,
    })
}

async fn open_event_log(config: &Config) -> Result<Arc<dyn EventStore>> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresEventStore::connect(url).await?;
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL event log");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping the event log in memory");
            Ok(Arc::new(InMemoryEventStore::new()))
        }
    }
}
