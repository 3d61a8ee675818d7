//! Cleanup against a store where some deletions fail.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{seed_objects, RecordingStore};
use operator_core::{DeleteTarget, NamespacedName, ResourceKind};
use operator_reconciler::{ResourceCleanup, StoreCleanup};

#[tokio::test]
async fn given_two_failing_deletions_when_cleaning_up_then_all_attempted_and_both_reported() {
    let store = Arc::new(RecordingStore::new());
    seed_objects(&store.inner, "ns1", "db1").await;
    store.fail_delete(ResourceKind::PodDisruptionBudget, DeleteTarget::name("db1"));
    store.fail_delete(ResourceKind::Service, DeleteTarget::name("db1-client"));

    let cleanup = StoreCleanup::new(store.clone());
    let err = cleanup
        .cleanup(&NamespacedName::new("ns1", "db1"))
        .await
        .unwrap_err();

    assert_eq!(store.deletes().len(), 4);
    assert_eq!(err.failures().len(), 2);

    let message = err.to_string();
    assert!(message.contains("PodDisruptionBudget deletion refused"));
    assert!(message.contains("Service 'ns1/db1-client'"));
    assert!(message.contains(", "));

    // The two deletions that succeeded really removed their objects.
    let names: Vec<_> = store.inner.objects().await.into_iter().map(|o| o.name).collect();
    assert_eq!(names, vec!["db1".to_string(), "db1-client".to_string()]);
}

#[tokio::test]
async fn given_nothing_left_when_cleaning_up_then_succeeds() {
    let store = Arc::new(RecordingStore::new());
    let cleanup = StoreCleanup::new(store.clone()).with_grace_period(Duration::ZERO);

    let result = cleanup.cleanup(&NamespacedName::new("ns1", "db1")).await;

    assert!(result.is_ok());
    assert_eq!(store.deletes().len(), 4);
}

#[tokio::test]
async fn given_other_clusters_when_cleaning_up_then_untouched() {
    let store = Arc::new(RecordingStore::new());
    seed_objects(&store.inner, "ns1", "db1").await;
    seed_objects(&store.inner, "ns1", "db2").await;
    seed_objects(&store.inner, "ns2", "db1").await;

    StoreCleanup::new(store.clone())
        .cleanup(&NamespacedName::new("ns1", "db1"))
        .await
        .unwrap();

    let left = store.inner.objects().await;
    assert_eq!(left.len(), 10);
    assert!(left
        .iter()
        .all(|o| o.namespace == "ns2" || o.name.starts_with("db2")));
}
