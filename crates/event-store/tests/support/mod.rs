//! Behaviour every snapshot store backend must share.

#![allow(dead_code)]

use event_store::{DomainObjectSnapshot, SnapshotStore, Version};

fn snapshot(data_type: &str, identifier: &str, version: i64, state: &str) -> DomainObjectSnapshot {
    DomainObjectSnapshot {
        data_type: data_type.to_string(),
        identifier: identifier.to_string(),
        serialized_state: state.to_string(),
        object_version: Version::new(version),
        schema_version: 1,
    }
}

pub async fn empty_store_has_no_snapshots(store: &dyn SnapshotStore) {
    assert_eq!(store.get_latest_snapshot_numbers().await.unwrap(), 0);
    assert!(
        store
            .get_snapshot("ConfigEnvironment", "environment/Av/Dev")
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        store
            .get_snapshot_at("ConfigEnvironment", "environment/Av/Dev", Version::new(10))
            .await
            .unwrap()
            .is_none()
    );
}

pub async fn bounded_lookup_selects_newest_not_exceeding(store: &dyn SnapshotStore) {
    store
        .save_snapshots(vec![
            snapshot("EnvironmentLayer", "layer/Base", 1, r#"{"v":1}"#),
            snapshot("EnvironmentLayer", "layer/Base", 2, r#"{"v":2}"#),
            snapshot("EnvironmentLayer", "layer/Base", 3, r#"{"v":3}"#),
        ])
        .await
        .unwrap();

    let at_two = store
        .get_snapshot_at("EnvironmentLayer", "layer/Base", Version::new(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(at_two.object_version, Version::new(2));
    assert_eq!(at_two.serialized_state, r#"{"v":2}"#);

    let latest = store
        .get_snapshot("EnvironmentLayer", "layer/Base")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.object_version, Version::new(3));

    assert!(
        store
            .get_snapshot_at("EnvironmentLayer", "layer/Base", Version::new(0))
            .await
            .unwrap()
            .is_none()
    );
}

pub async fn same_version_is_upserted(store: &dyn SnapshotStore) {
    store
        .save_snapshots(vec![snapshot("ConfigStructure", "structure/App/1", 5, "old")])
        .await
        .unwrap();
    store
        .save_snapshots(vec![snapshot("ConfigStructure", "structure/App/1", 5, "new")])
        .await
        .unwrap();

    let latest = store
        .get_snapshot("ConfigStructure", "structure/App/1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.serialized_state, "new");
    assert_eq!(latest.schema_version, 1);
}

pub async fn latest_number_spans_all_objects(store: &dyn SnapshotStore) {
    store
        .save_snapshots(vec![
            snapshot("ConfigEnvironment", "environment/Av/Dev", 4, "{}"),
            snapshot("EnvironmentLayer", "layer/Shared", 9, "{}"),
            snapshot("ConfigStructure", "structure/App/2", 6, "{}"),
        ])
        .await
        .unwrap();

    assert_eq!(store.get_latest_snapshot_numbers().await.unwrap(), 9);

    let other = store
        .get_snapshot("ConfigEnvironment", "layer/Shared")
        .await
        .unwrap();
    assert!(other.is_none(), "data type is part of the key");
}
