//! Resource store trait and implementations.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::name::NamespacedName;
use crate::resource::ClusterResource;

/// Kinds of auxiliary objects that belong to a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    PodDisruptionBudget,
    Pod,
    Service,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PodDisruptionBudget => write!(f, "PodDisruptionBudget"),
            Self::Pod => write!(f, "Pod"),
            Self::Service => write!(f, "Service"),
        }
    }
}

/// What a delete call targets: one named object or every object with a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeleteTarget {
    Name(String),
    Selector { label: String, value: String },
}

impl DeleteTarget {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn selector(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Selector {
            label: label.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for DeleteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Selector { label, value } => write!(f, "{label}={value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    pub grace_period: Duration,
}

impl DeleteOptions {
    pub const fn with_grace_period(grace_period: Duration) -> Self {
        Self { grace_period }
    }
}

/// Client for the external store holding cluster resources and their
/// auxiliary objects.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a cluster resource.
    async fn get(&self, key: &NamespacedName) -> Result<Option<ClusterResource>>;

    /// Persist a cluster resource (spec and status) and return the stored copy.
    async fn update(&self, resource: &ClusterResource) -> Result<ClusterResource>;

    /// Delete auxiliary objects.
    ///
    /// A named delete of a missing object fails with [`StoreError::NotFound`];
    /// a selector that matches nothing succeeds.
    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        target: &DeleteTarget,
        options: DeleteOptions,
    ) -> Result<()>;
}

/// An auxiliary object held by [`InMemoryResourceStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryObject {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

impl AuxiliaryObject {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
            labels: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    fn matches(&self, kind: ResourceKind, namespace: &str, target: &DeleteTarget) -> bool {
        self.kind == kind
            && self.namespace == namespace
            && match target {
                DeleteTarget::Name(name) => &self.name == name,
                DeleteTarget::Selector { label, value } => {
                    self.labels.get(label).is_some_and(|v| v == value)
                }
            }
    }
}

/// In-memory resource store for tests and local replay.
#[derive(Default)]
pub struct InMemoryResourceStore {
    clusters: RwLock<HashMap<NamespacedName, ClusterResource>>,
    objects: RwLock<Vec<AuxiliaryObject>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Insert or replace a cluster resource without version checks.
    pub async fn insert(&self, resource: ClusterResource) {
        self.clusters
            .write()
            .await
            .insert(resource.namespaced_name(), resource);
    }

    /// Add an auxiliary object.
    pub async fn create_object(&self, object: AuxiliaryObject) {
        self.objects.write().await.push(object);
    }

    /// Snapshot of the auxiliary objects currently stored.
    pub async fn objects(&self) -> Vec<AuxiliaryObject> {
        self.objects.read().await.clone()
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn get(&self, key: &NamespacedName) -> Result<Option<ClusterResource>> {
        Ok(self.clusters.read().await.get(key).cloned())
    }

    async fn update(&self, resource: &ClusterResource) -> Result<ClusterResource> {
        let key = resource.namespaced_name();
        let mut clusters = self.clusters.write().await;

        let current_version = clusters.get(&key).map_or(0, |c| c.resource_version);
        if resource.resource_version != 0 && resource.resource_version != current_version {
            return Err(StoreError::conflict(
                &key,
                format!(
                    "resource version {} is stale (current {current_version})",
                    resource.resource_version
                ),
            ));
        }

        let mut stored = resource.clone();
        stored.resource_version = current_version.saturating_add(1);
        clusters.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        target: &DeleteTarget,
        _options: DeleteOptions,
    ) -> Result<()> {
        let mut objects = self.objects.write().await;
        let before = objects.len();
        objects.retain(|o| !o.matches(kind, namespace, target));

        match target {
            DeleteTarget::Name(name) if objects.len() == before => {
                Err(StoreError::not_found(kind, namespace, name))
            }
            _ => Ok(()),
        }
    }
}

/// A wrapper that adds tracing to a resource store.
pub struct TracingResourceStore<S: ResourceStore> {
    inner: S,
}

impl<S: ResourceStore> TracingResourceStore<S> {
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ResourceStore> ResourceStore for TracingResourceStore<S> {
    async fn get(&self, key: &NamespacedName) -> Result<Option<ClusterResource>> {
        tracing::debug!(cluster = %key, "Getting cluster resource");
        self.inner.get(key).await
    }

    async fn update(&self, resource: &ClusterResource) -> Result<ClusterResource> {
        tracing::debug!(
            cluster = %resource.namespaced_name(),
            phase = %resource.status.phase,
            "Updating cluster resource"
        );
        let result = self.inner.update(resource).await;
        if let Ok(ref stored) = result {
            tracing::trace!(resource_version = stored.resource_version, "Cluster resource updated");
        }
        result
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        target: &DeleteTarget,
        options: DeleteOptions,
    ) -> Result<()> {
        tracing::debug!(
            kind = %kind,
            namespace,
            target = %target,
            grace_period = ?options.grace_period,
            "Deleting objects"
        );
        self.inner.delete(kind, namespace, target, options).await
    }
}
