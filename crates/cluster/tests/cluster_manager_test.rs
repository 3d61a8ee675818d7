//! Behavioral tests for actor-backed cluster managers.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use operator_cluster::{
    ActorClusterFactory, ClusterConfig, ClusterError, ClusterFactory, ConstructionError,
    ManagedCluster, ManagerPhase, MAX_NAME_LENGTH,
};
use operator_core::{
    ClusterPhase, ClusterResource, ClusterSpec, InMemoryResourceStore, NamespacedName,
    ResourceStore,
};

const TIMEOUT: Duration = Duration::from_secs(1);

fn resource(name: &str, size: u32) -> ClusterResource {
    ClusterResource::new(
        "ns1",
        name,
        ClusterSpec {
            size,
            ..ClusterSpec::default()
        },
    )
}

fn factory(store: Arc<InMemoryResourceStore>, recover_quorum_loss: bool) -> ActorClusterFactory {
    let store: Arc<dyn ResourceStore> = store;
    ActorClusterFactory::new(
        ClusterConfig::new(store)
            .with_service_account("etcd-operator")
            .with_recover_quorum_loss(recover_quorum_loss),
    )
}

/// Wait until queued casts ahead of us have been processed.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn given_valid_resource_when_spawned_then_manager_running() {
    let factory = factory(InMemoryResourceStore::new_arc(), false);

    let handle = factory.spawn(&resource("db1", 3)).await.unwrap();
    let snapshot = handle.snapshot(TIMEOUT).await.unwrap();

    assert_eq!(snapshot.key, NamespacedName::new("ns1", "db1"));
    assert_eq!(snapshot.phase, ManagerPhase::Running);
    assert_eq!(snapshot.generation, 0);
    assert_eq!(snapshot.spec.size, 3);
}

#[tokio::test]
async fn given_name_over_limit_when_constructed_then_rejected() {
    let factory = factory(InMemoryResourceStore::new_arc(), false);
    let long_name = "a".repeat(MAX_NAME_LENGTH + 1);

    let result = factory.construct(&resource(&long_name, 3)).await;

    assert!(matches!(
        result,
        Err(ConstructionError::NameTooLong { max, .. }) if max == MAX_NAME_LENGTH
    ));
}

#[tokio::test]
async fn given_name_at_limit_when_constructed_then_accepted() {
    let factory = factory(InMemoryResourceStore::new_arc(), false);
    let name = "a".repeat(MAX_NAME_LENGTH);

    assert!(factory.construct(&resource(&name, 3)).await.is_ok());
}

#[tokio::test]
async fn given_manager_when_spec_changes_then_generation_advances() {
    let factory = factory(InMemoryResourceStore::new_arc(), false);
    let handle = factory.spawn(&resource("db1", 3)).await.unwrap();

    handle.update(resource("db1", 5));
    handle.update(resource("db1", 5));
    let snapshot = handle.snapshot(TIMEOUT).await.unwrap();

    assert_eq!(snapshot.generation, 1);
    assert_eq!(snapshot.spec.size, 5);
}

#[tokio::test]
async fn given_manager_when_deleted_then_stops() {
    let factory = factory(InMemoryResourceStore::new_arc(), false);
    let handle = factory.spawn(&resource("db1", 3)).await.unwrap();

    handle.delete();
    settle().await;

    assert!(handle.snapshot(TIMEOUT).await.is_err());
    // A second delete on a stopped manager is harmless
    handle.delete();
}

#[tokio::test]
async fn given_non_fatal_error_when_reported_then_manager_keeps_running() {
    let store = InMemoryResourceStore::new_arc();
    let factory = factory(store.clone(), false);
    let handle = factory.spawn(&resource("db1", 3)).await.unwrap();

    handle.report_error(ClusterError::CreateFailed.context("seed member"));
    let snapshot = handle.snapshot(TIMEOUT).await.unwrap();

    assert_eq!(snapshot.phase, ManagerPhase::Running);
    assert_eq!(snapshot.errors_observed, 1);
    let stored = store.get(&NamespacedName::new("ns1", "db1")).await.unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn given_quorum_loss_without_recovery_when_reported_then_status_failed() {
    let store = InMemoryResourceStore::new_arc();
    let stored = store.update(&resource("db1", 3)).await.unwrap();
    let factory = factory(store.clone(), false);
    let handle = factory.spawn(&stored).await.unwrap();

    handle.report_error(ClusterError::quorum_lost().context("reconcile members"));
    settle().await;

    let stored = store
        .get(&NamespacedName::new("ns1", "db1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status.phase, ClusterPhase::Failed);
    assert_eq!(stored.status.reason, "quorum was lost");
    assert!(handle.snapshot(TIMEOUT).await.is_err());
}

#[tokio::test]
async fn given_quorum_loss_with_recovery_when_reported_then_manager_recovers() {
    let store = InMemoryResourceStore::new_arc();
    let factory = factory(store.clone(), true);
    let handle = factory.spawn(&resource("db1", 3)).await.unwrap();

    handle.report_error(ClusterError::quorum_lost());
    let snapshot = handle.snapshot(TIMEOUT).await.unwrap();

    assert_eq!(snapshot.phase, ManagerPhase::Recovering);
    assert_eq!(snapshot.recovery_attempts, 1);
    let stored = store.get(&NamespacedName::new("ns1", "db1")).await.unwrap();
    assert!(stored.is_none());
}
