//! Integration tests for aggregate reconstruction.
//!
//! These cover the interplay of the cache, the snapshot store and the
//! catch-up replay from the event log.

mod support;

use std::time::Duration;

use common::{EnvironmentIdentifier, LayerIdentifier};
use domain::{Aggregate, ConfigEnvironment, ConfigKeyAction, EnvironmentLayer, LayerList};
use event_store::{EventStore, SnapshotStore, Version};
use object_store::{KeyQuery, ObjectStoreError, SnapshotService};
use support::Harness;
use tokio_util::sync::CancellationToken;

fn base() -> LayerIdentifier {
    LayerIdentifier::new("Base")
}

/// Creates the `Base` layer and sets `Foo` once per value, one event each.
async fn layer_with_history(h: &Harness, values: &[&str]) {
    h.commands.create_layer(base()).await.unwrap();
    for value in values {
        h.commands
            .modify_layer_keys(base(), vec![ConfigKeyAction::set("Foo", *value)])
            .await
            .unwrap();
    }
}

mod replay {
    use super::*;

    #[tokio::test]
    async fn unknown_object_is_empty_at_version_zero() {
        let h = Harness::new();

        let layer: EnvironmentLayer = h.store.replay_object(base(), None).await.unwrap();

        assert!(!layer.exists());
        assert_eq!(layer.version(), Version::initial());
    }

    #[tokio::test]
    async fn latest_replay_applies_every_event() {
        let h = Harness::new();
        layer_with_history(&h, &["A", "B"]).await;

        let layer: EnvironmentLayer = h
            .restarted()
            .store
            .replay_object(base(), None)
            .await
            .unwrap();

        assert_eq!(layer.version(), Version::new(3));
        assert_eq!(layer.keys().get("foo").unwrap().value, "B");
    }

    #[tokio::test]
    async fn bounded_replay_stops_at_version() {
        let h = Harness::new();
        layer_with_history(&h, &["A", "B"]).await;

        let layer: EnvironmentLayer = h
            .store
            .replay_object(base(), Some(Version::new(2)))
            .await
            .unwrap();

        assert_eq!(layer.version(), Version::new(2));
        assert_eq!(layer.keys().get("Foo").unwrap().value, "A");
    }

    #[tokio::test]
    async fn list_tracks_live_objects() {
        let h = Harness::new();
        for name in ["B", "A", "C"] {
            h.commands
                .create_layer(LayerIdentifier::new(name))
                .await
                .unwrap();
        }
        h.commands
            .delete_layer(LayerIdentifier::new("C"))
            .await
            .unwrap();

        let list: LayerList = h.store.replay_list(None).await.unwrap();
        let names: Vec<_> = list.iter().map(|id| id.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        let earlier: LayerList = h.store.replay_list(Some(Version::new(1))).await.unwrap();
        assert_eq!(earlier.len(), 1);
        assert!(earlier.contains(&LayerIdentifier::new("B")));
    }

    #[tokio::test]
    async fn cancelled_replay_returns_promptly() {
        let h = Harness::new();
        layer_with_history(&h, &["A"]).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = h
            .store
            .replay_object_cancellable::<EnvironmentLayer>(base(), None, &cancel)
            .await;

        assert!(matches!(result, Err(ObjectStoreError::Cancelled)));
    }
}

mod cache {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn cached_object_is_caught_up_until_it_expires() {
        let h = Harness::with_ttl(Duration::from_secs(5));
        layer_with_history(&h, &["A"]).await;

        tokio::time::advance(Duration::from_secs(1)).await;
        h.events.clear_replays();
        let layer: EnvironmentLayer = h.store.replay_object(base(), None).await.unwrap();
        assert_eq!(layer.version(), Version::new(2));
        assert_eq!(h.events.replayed_after(), vec![Some(Version::new(2))]);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(h.store.cache().get::<EnvironmentLayer>(&base()).is_none());

        h.events.clear_replays();
        let layer: EnvironmentLayer = h.store.replay_object(base(), None).await.unwrap();
        assert_eq!(layer.version(), Version::new(2));
        assert_eq!(h.events.replayed_after(), vec![Some(Version::initial())]);
    }

    #[tokio::test]
    async fn newer_cached_copy_is_not_used_for_bounded_reads() {
        let h = Harness::new();
        layer_with_history(&h, &["A", "B"]).await;
        let latest: EnvironmentLayer = h.store.replay_object(base(), None).await.unwrap();
        assert_eq!(latest.version(), Version::new(3));

        h.events.clear_replays();
        let bounded: EnvironmentLayer = h
            .store
            .replay_object(base(), Some(Version::new(2)))
            .await
            .unwrap();

        assert_eq!(bounded.keys().get("Foo").unwrap().value, "A");
        assert_eq!(h.events.replayed_after(), vec![Some(Version::initial())]);

        let cached = h.store.cache().get::<EnvironmentLayer>(&base()).unwrap();
        assert_eq!(cached.version(), Version::new(3));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_objects_do_not_fill_the_cache() {
        let h = Harness::with_ttl(Duration::from_millis(1));
        for n in 0..1000 {
            let env = EnvironmentIdentifier::new("Missing", format!("Env{n}"));
            let page = h
                .queries
                .get_keys::<ConfigEnvironment>(env, KeyQuery::new())
                .await
                .unwrap();
            assert!(page.items.is_empty());
        }
        assert!(h.store.cache().is_empty());

        layer_with_history(&h, &["A"]).await;
        tokio::time::advance(Duration::from_millis(20)).await;
        h.commands
            .modify_layer_keys(base(), vec![ConfigKeyAction::set("Foo", "B")])
            .await
            .unwrap();
        assert_eq!(h.store.cache().len(), 1);
    }

    #[tokio::test]
    async fn failing_replay_leaves_cache_untouched() {
        let h = Harness::new();
        layer_with_history(&h, &["A"]).await;
        let _: EnvironmentLayer = h.store.replay_object(base(), None).await.unwrap();

        h.events.set_failing(true);
        let result = h.store.replay_object::<EnvironmentLayer>(base(), None).await;
        assert!(matches!(result, Err(ObjectStoreError::StoreUnavailable(_))));

        let cached = h.store.cache().get::<EnvironmentLayer>(&base()).unwrap();
        assert_eq!(cached.version(), Version::new(2));

        let restarted = h.restarted();
        let result = restarted
            .store
            .replay_object::<EnvironmentLayer>(base(), None)
            .await;
        assert!(matches!(result, Err(ObjectStoreError::StoreUnavailable(_))));
        assert!(restarted.store.cache().is_empty());
    }
}

mod snapshots {
    use super::*;

    #[tokio::test]
    async fn replay_starts_from_newest_snapshot() {
        let h = Harness::new();
        layer_with_history(&h, &["A"]).await;
        SnapshotService::new(h.store.clone())
            .create_snapshots()
            .await
            .unwrap();
        h.commands
            .modify_layer_keys(base(), vec![ConfigKeyAction::set("Bar", "X")])
            .await
            .unwrap();

        let restarted = h.restarted();
        restarted.events.clear_replays();
        let layer: EnvironmentLayer = restarted
            .store
            .replay_object(base(), None)
            .await
            .unwrap();

        assert_eq!(layer.version(), Version::new(3));
        assert_eq!(layer.keys().len(), 2);
        assert_eq!(restarted.events.replayed_after(), vec![Some(Version::new(2))]);
    }

    #[tokio::test]
    async fn bounded_replay_uses_snapshot_at_or_below_bound() {
        let h = Harness::new();
        let snapshots = SnapshotService::new(h.store.clone());
        layer_with_history(&h, &["A"]).await;
        snapshots.create_snapshots().await.unwrap();
        h.commands
            .modify_layer_keys(base(), vec![ConfigKeyAction::set("Foo", "B")])
            .await
            .unwrap();
        snapshots.create_snapshots().await.unwrap();

        let stored = h
            .snapshots
            .get_snapshot_at("EnvironmentLayer", "layer/Base", Version::new(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.object_version, Version::new(2));

        let restarted = h.restarted();
        restarted.events.clear_replays();
        let layer: EnvironmentLayer = restarted
            .store
            .replay_object(base(), Some(Version::new(2)))
            .await
            .unwrap();

        assert_eq!(layer.keys().get("Foo").unwrap().value, "A");
        assert_eq!(restarted.events.replayed_after(), vec![Some(Version::new(2))]);
        assert!(restarted.store.cache().is_empty());
    }
}

mod concurrency {
    use super::*;

    const WRITES: i64 = 50;
    const READERS: usize = 8;

    /// Checks that a read reflects exactly the events up to its version.
    fn assert_consistent_prefix(layer: &EnvironmentLayer) {
        let version = layer.version().as_i64();
        match version {
            0 => assert!(!layer.exists()),
            1 => {
                assert!(layer.exists());
                assert!(layer.keys().is_empty());
            }
            _ => {
                let counter = layer.keys().get("Counter").unwrap();
                assert_eq!(counter.value, (version - 1).to_string());
                assert_eq!(counter.version, layer.version());
                assert_eq!(layer.keys().len(), 1);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reads_see_consistent_prefixes_while_writing() {
        let h = Harness::new();

        let writer = tokio::spawn({
            let commands = h.commands.clone();
            async move {
                commands.create_layer(base()).await.unwrap();
                for n in 1..=WRITES {
                    commands
                        .modify_layer_keys(
                            base(),
                            vec![ConfigKeyAction::set("Counter", n.to_string())],
                        )
                        .await
                        .unwrap();
                }
            }
        });

        let mut readers = Vec::with_capacity(READERS);
        for _ in 0..READERS {
            let store = h.store.clone();
            readers.push(tokio::spawn(async move {
                let mut last = Version::initial();
                while last.as_i64() < WRITES + 1 {
                    let layer: EnvironmentLayer = store.replay_object(base(), None).await.unwrap();
                    assert_consistent_prefix(&layer);
                    assert!(layer.version() >= last, "reads went backwards");
                    last = layer.version();
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }

        let head = h.store.event_store().head_position().await.unwrap();
        assert_eq!(head, Version::new(WRITES + 1));

        let latest: EnvironmentLayer = h.store.replay_object(base(), None).await.unwrap();
        assert_eq!(latest.version(), head);
        let cached = h.store.cache().get::<EnvironmentLayer>(&base()).unwrap();
        assert_eq!(cached.version(), head);
        assert_eq!(cached.keys().get("counter").unwrap().value, WRITES.to_string());
    }
}
