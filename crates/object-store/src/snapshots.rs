//! Snapshot creation and the trigger loop driving it.

use std::sync::Arc;

use common::Identifier;
use domain::{
    Aggregate, ConfigEnvironment, ConfigStructure, ConfigurationList, EnvironmentLayer,
    EnvironmentList, LayerList, PreparedConfiguration, StructureList,
};
use event_store::{DomainObjectSnapshot, Version};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::store::DomainObjectStore;
use crate::triggers::SnapshotTrigger;

/// Writes snapshots of every live aggregate whenever a trigger fires.
///
/// Triggers run in generations. Each generation starts every registered
/// trigger under a child token of the shutdown token; the first trigger to
/// fire ends the generation, which stops all of them, and after the
/// snapshot run a new generation starts with the triggers registered at
/// that time.
pub struct SnapshotService {
    store: Arc<DomainObjectStore>,
    triggers: Mutex<Vec<Arc<dyn SnapshotTrigger>>>,
}

impl SnapshotService {
    pub fn new(store: Arc<DomainObjectStore>) -> Self {
        Self {
            store,
            triggers: Mutex::new(Vec::new()),
        }
    }

    /// Adds a trigger. It takes part from the next generation on.
    pub async fn register(&self, trigger: Arc<dyn SnapshotTrigger>) {
        tracing::info!(trigger = trigger.name(), "snapshot trigger registered");
        self.triggers.lock().await.push(trigger);
    }

    pub async fn trigger_count(&self) -> usize {
        self.triggers.lock().await.len()
    }

    /// Runs trigger generations until `shutdown` is cancelled.
    ///
    /// A failed snapshot run is logged and the next generation starts as
    /// usual.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!("snapshot service started");

        loop {
            let generation = shutdown.child_token();
            let (fired_tx, mut fired_rx) = mpsc::channel::<&'static str>(1);
            let mut running = JoinSet::new();

            for trigger in self.triggers.lock().await.iter() {
                let trigger = Arc::clone(trigger);
                let token = generation.clone();
                let fired_tx = fired_tx.clone();
                running.spawn(async move {
                    tokio::select! {
                        () = token.cancelled() => {}
                        () = trigger.wait_for_trigger() => {
                            let _ = fired_tx.try_send(trigger.name());
                        }
                    }
                });
            }
            drop(fired_tx);

            let fired = tokio::select! {
                () = shutdown.cancelled() => None,
                Some(name) = fired_rx.recv() => Some(name),
            };

            generation.cancel();
            running.shutdown().await;

            let Some(name) = fired else {
                break;
            };

            metrics::counter!("snapshot_triggers_fired_total", "trigger" => name).increment(1);
            tracing::info!(trigger = name, "snapshot trigger fired");

            match self.create_snapshots().await {
                Ok(saved) => tracing::info!(saved, "snapshot run complete"),
                Err(err) => tracing::warn!(error = %err, "snapshot run failed"),
            }
        }

        tracing::info!("snapshot service stopped");
    }

    /// Snapshots every live object that has no snapshot at its current
    /// version, including the lists. Returns the number of snapshots saved.
    #[tracing::instrument(skip(self))]
    pub async fn create_snapshots(&self) -> Result<usize> {
        let mut pending = Vec::new();

        let environments: EnvironmentList = self.store.replay_list(None).await?;
        let layers: LayerList = self.store.replay_list(None).await?;
        let structures: StructureList = self.store.replay_list(None).await?;
        let configurations: ConfigurationList = self.store.replay_list(None).await?;

        self.collect(&environments, &mut pending).await?;
        self.collect(&layers, &mut pending).await?;
        self.collect(&structures, &mut pending).await?;
        self.collect(&configurations, &mut pending).await?;

        for id in environments.iter() {
            let env: ConfigEnvironment = self.store.replay_object(id.clone(), None).await?;
            self.collect(&env, &mut pending).await?;
        }
        for id in layers.iter() {
            let layer: EnvironmentLayer = self.store.replay_object(id.clone(), None).await?;
            self.collect(&layer, &mut pending).await?;
        }
        for id in structures.iter() {
            let structure: ConfigStructure = self.store.replay_object(id.clone(), None).await?;
            self.collect(&structure, &mut pending).await?;
        }
        for id in configurations.iter() {
            let configuration: PreparedConfiguration =
                self.store.replay_object(id.clone(), None).await?;
            self.collect(&configuration, &mut pending).await?;
        }

        let saved = pending.len();
        if saved > 0 {
            self.store.snapshot_store().save_snapshots(pending).await?;
            metrics::counter!("snapshots_saved_total").increment(saved as u64);
        }
        Ok(saved)
    }

    /// Queues a snapshot of `aggregate` unless one already exists at its
    /// version.
    async fn collect<A: Aggregate>(
        &self,
        aggregate: &A,
        pending: &mut Vec<DomainObjectSnapshot>,
    ) -> Result<()> {
        if aggregate.version() == Version::initial() {
            return Ok(());
        }

        let latest = self
            .store
            .snapshot_store()
            .get_snapshot(A::aggregate_type(), &aggregate.identifier().stream_key())
            .await?;
        if latest.is_some_and(|snapshot| snapshot.object_version == aggregate.version()) {
            return Ok(());
        }

        pending.push(aggregate.create_snapshot()?);
        Ok(())
    }
}
