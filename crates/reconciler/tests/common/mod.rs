//! Shared fixtures for reconciler integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use operator_cluster::{ClusterFactory, ConstructionError, ManagedCluster};
use operator_core::{
    AuxiliaryObject, ClusterResource, ClusterSpec, ClusterStatus, DeleteOptions, DeleteTarget,
    FailurePolicy, InMemoryResourceStore, NamespacedName, ResourceKind, ResourceStore,
    StoreError, CLUSTER_LABEL,
};
use operator_reconciler::{Reconciler, ReconcilerBuilder, ReconcilerConfig};

/// Lifecycle calls observed on managers built by [`RecordingFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerCall {
    Constructed { key: NamespacedName, version: String },
    Updated(NamespacedName),
    Deleted(NamespacedName),
}

pub type CallLog = Arc<Mutex<Vec<ManagerCall>>>;

struct RecordingManager {
    key: NamespacedName,
    calls: CallLog,
}

impl ManagedCluster for RecordingManager {
    fn update(&self, _resource: ClusterResource) {
        self.calls
            .lock()
            .unwrap()
            .push(ManagerCall::Updated(self.key.clone()));
    }

    fn delete(&self) {
        self.calls
            .lock()
            .unwrap()
            .push(ManagerCall::Deleted(self.key.clone()));
    }
}

/// Factory whose managers only record the calls they receive.
#[derive(Default)]
pub struct RecordingFactory {
    pub calls: CallLog,
    rejected: HashSet<String>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to construct managers for clusters named `name`.
    pub fn rejecting(mut self, name: &str) -> Self {
        self.rejected.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ManagerCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterFactory for RecordingFactory {
    async fn construct(
        &self,
        resource: &ClusterResource,
    ) -> Result<Box<dyn ManagedCluster>, ConstructionError> {
        if self.rejected.contains(&resource.name) {
            return Err(ConstructionError::spawn_failed(&resource.name, "rejected"));
        }
        let key = resource.namespaced_name();
        self.calls.lock().unwrap().push(ManagerCall::Constructed {
            key: key.clone(),
            version: resource.spec.version.clone(),
        });
        Ok(Box::new(RecordingManager {
            key,
            calls: Arc::clone(&self.calls),
        }))
    }
}

/// Store that records delete attempts and can be told to fail some of them.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: InMemoryResourceStore,
    deletes: Mutex<Vec<(ResourceKind, DeleteTarget)>>,
    failing_deletes: Mutex<Vec<(ResourceKind, DeleteTarget)>>,
    fail_updates: Mutex<bool>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_delete(&self, kind: ResourceKind, target: DeleteTarget) {
        self.failing_deletes.lock().unwrap().push((kind, target));
    }

    pub fn fail_updates(&self) {
        *self.fail_updates.lock().unwrap() = true;
    }

    pub fn deletes(&self) -> Vec<(ResourceKind, DeleteTarget)> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceStore for RecordingStore {
    async fn get(&self, key: &NamespacedName) -> operator_core::Result<Option<ClusterResource>> {
        self.inner.get(key).await
    }

    async fn update(&self, resource: &ClusterResource) -> operator_core::Result<ClusterResource> {
        if *self.fail_updates.lock().unwrap() {
            return Err(StoreError::unavailable("update rejected"));
        }
        self.inner.update(resource).await
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        target: &DeleteTarget,
        options: DeleteOptions,
    ) -> operator_core::Result<()> {
        self.deletes.lock().unwrap().push((kind, target.clone()));
        let fails = self
            .failing_deletes
            .lock()
            .unwrap()
            .contains(&(kind, target.clone()));
        if fails {
            return Err(StoreError::delete_failed(
                kind,
                namespace,
                target,
                format!("{kind} deletion refused"),
            ));
        }
        self.inner.delete(kind, namespace, target, options).await
    }
}

/// Everything a reconciler test needs to inspect.
pub struct Harness {
    pub reconciler: Reconciler,
    pub store: Arc<RecordingStore>,
    pub factory: Arc<RecordingFactory>,
}

impl Harness {
    pub fn namespaced(namespace: &str) -> Self {
        Self::with_factory(
            ReconcilerConfig::namespaced(namespace),
            RecordingFactory::new(),
        )
    }

    pub fn with_factory(config: ReconcilerConfig, factory: RecordingFactory) -> Self {
        let store = Arc::new(RecordingStore::new());
        let factory = Arc::new(factory);
        let reconciler = ReconcilerBuilder::new()
            .with_config(config)
            .with_store(store.clone())
            .with_factory(factory.clone())
            .build()
            .unwrap();
        Self {
            reconciler,
            store,
            factory,
        }
    }
}

pub fn cluster(namespace: &str, name: &str) -> ClusterResource {
    ClusterResource::new(
        namespace,
        name,
        ClusterSpec {
            size: 3,
            ..ClusterSpec::default()
        },
    )
}

pub fn failed_cluster(namespace: &str, name: &str, policy: FailurePolicy) -> ClusterResource {
    let mut resource = cluster(namespace, name);
    resource.spec.failure_policy = policy;
    let mut status = ClusterStatus::default();
    status.set_failed("quorum was lost");
    resource.with_status(status)
}

/// Seed the auxiliary objects a running cluster would own.
pub async fn seed_objects(store: &InMemoryResourceStore, namespace: &str, name: &str) {
    let objects = [
        AuxiliaryObject::new(ResourceKind::PodDisruptionBudget, namespace, name),
        AuxiliaryObject::new(ResourceKind::Pod, namespace, format!("{name}-0"))
            .with_label(CLUSTER_LABEL, name),
        AuxiliaryObject::new(ResourceKind::Pod, namespace, format!("{name}-1"))
            .with_label(CLUSTER_LABEL, name),
        AuxiliaryObject::new(ResourceKind::Service, namespace, name),
        AuxiliaryObject::new(ResourceKind::Service, namespace, format!("{name}-client")),
    ];
    for object in objects {
        store.create_object(object).await;
    }
}
