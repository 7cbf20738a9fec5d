//! Integration tests for snapshot creation and the trigger loop.

mod support;

use std::sync::Arc;
use std::time::Duration;

use common::{EnvironmentIdentifier, LayerIdentifier};
use domain::ConfigKeyAction;
use event_store::{SnapshotStore, Version};
use object_store::{
    NumberThresholdSnapshotTrigger, OnDemandSnapshotTrigger, SnapshotService,
    SnapshotTrigger,
};
use support::Harness;
use tokio_util::sync::CancellationToken;

async fn populate(h: &Harness) {
    let env = EnvironmentIdentifier::new("Av", "Dev");
    h.commands.create_environment(env.clone()).await.unwrap();
    h.commands
        .modify_environment_keys(env, vec![ConfigKeyAction::set("Foo", "A")])
        .await
        .unwrap();
    h.commands
        .create_layer(LayerIdentifier::new("Base"))
        .await
        .unwrap();
}

/// Polls until the snapshot store has caught up with `version`.
async fn wait_for_snapshots(h: &Harness, version: i64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.snapshots.get_latest_snapshot_numbers().await.unwrap() < version {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

mod creation {
    use super::*;

    #[tokio::test]
    async fn snapshots_objects_and_lists_once() {
        let h = Harness::new();
        populate(&h).await;
        let service = SnapshotService::new(h.store.clone());

        // Environment, layer and their two lists.
        assert_eq!(service.create_snapshots().await.unwrap(), 4);
        assert_eq!(service.create_snapshots().await.unwrap(), 0);

        let env = h
            .snapshots
            .get_snapshot("ConfigEnvironment", "environment/Av/Dev")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(env.object_version, Version::new(2));
        assert_eq!(h.snapshots.get_latest_snapshot_numbers().await.unwrap(), 3);

        h.commands
            .modify_layer_keys(
                LayerIdentifier::new("Base"),
                vec![ConfigKeyAction::set("Bar", "B")],
            )
            .await
            .unwrap();
        assert_eq!(service.create_snapshots().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_log_saves_nothing() {
        let h = Harness::new();
        let service = SnapshotService::new(h.store.clone());

        assert_eq!(service.create_snapshots().await.unwrap(), 0);
        assert_eq!(h.snapshots.get_latest_snapshot_numbers().await.unwrap(), 0);
    }
}

mod service {
    use super::*;

    #[tokio::test]
    async fn on_demand_request_runs_snapshots_and_rearms() {
        let h = Harness::new();
        populate(&h).await;

        let service = Arc::new(SnapshotService::new(h.store.clone()));
        let on_demand = Arc::new(OnDemandSnapshotTrigger::new());
        service.register(on_demand.clone()).await;
        assert_eq!(service.trigger_count().await, 1);

        let shutdown = CancellationToken::new();
        let running = tokio::spawn({
            let service = service.clone();
            let shutdown = shutdown.clone();
            async move { service.run(shutdown).await }
        });

        on_demand.request();
        wait_for_snapshots(&h, 3).await;

        h.commands
            .create_layer(LayerIdentifier::new("Team"))
            .await
            .unwrap();
        on_demand.request();
        wait_for_snapshots(&h, 4).await;

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn threshold_trigger_fires_when_log_runs_ahead() {
        let h = Harness::new();
        populate(&h).await;

        let service = Arc::new(SnapshotService::new(h.store.clone()));
        let threshold: Arc<dyn SnapshotTrigger> = Arc::new(NumberThresholdSnapshotTrigger::new(
            h.store.event_store().clone(),
            h.store.snapshot_store().clone(),
            3,
            Duration::from_millis(10),
        ));
        service.register(threshold).await;

        let shutdown = CancellationToken::new();
        let running = tokio::spawn({
            let service = service.clone();
            let shutdown = shutdown.clone();
            async move { service.run(shutdown).await }
        });

        wait_for_snapshots(&h, 3).await;

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_without_triggers_returns() {
        let h = Harness::new();
        let service = SnapshotService::new(h.store.clone());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), service.run(shutdown))
            .await
            .unwrap();
    }
}
