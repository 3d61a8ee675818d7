//! Reconciler implementation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use operator_cluster::{ClusterFactory, ManagedCluster};
use operator_core::{
    ClusterResource, ClusterStatus, EventType, NamespacedName, ResourceStore, WatchEvent,
    SCOPE_CLUSTER_WIDE,
};

use crate::cleanup::{ResourceCleanup, StoreCleanup};
use crate::error::{ReconcileError, Result};
use crate::metrics::ClusterMetrics;
use crate::policy::{decide, FailureDecision};

/// Which resources this operator instance manages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Namespace managed when not cluster-wide.
    pub namespace: String,
    /// Manage resources annotated as cluster-wide, across all namespaces.
    pub cluster_wide: bool,
}

impl ReconcilerConfig {
    pub fn namespaced(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            cluster_wide: false,
        }
    }

    #[must_use]
    pub fn cluster_wide() -> Self {
        Self {
            namespace: String::new(),
            cluster_wide: true,
        }
    }

    /// Whether `resource` falls within this instance's scope.
    ///
    /// Cluster-wide instances only take resources that opt in through the
    /// scope annotation; namespaced instances only take unannotated resources
    /// in their own namespace.
    #[must_use]
    pub fn manages(&self, resource: &ClusterResource) -> bool {
        match (resource.scope(), self.cluster_wide) {
            (Some(scope), true) => scope == SCOPE_CLUSTER_WIDE,
            (None, false) => resource.namespace == self.namespace,
            _ => false,
        }
    }
}

/// What happened to an event that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The resource is outside this instance's scope. Nothing changed.
    Ignored,
    /// The event was processed.
    Handled,
}

impl EventOutcome {
    #[must_use]
    pub const fn is_ignored(self) -> bool {
        matches!(self, Self::Ignored)
    }
}

/// Turns watch events into cluster manager lifecycle calls.
///
/// Owns the registry of managed clusters. `handle` takes `&mut self`, so a
/// single owner processes events one at a time and the presence check for
/// each key is atomic with the registry update that follows it.
pub struct Reconciler {
    config: ReconcilerConfig,
    store: Arc<dyn ResourceStore>,
    factory: Arc<dyn ClusterFactory>,
    cleanup: Arc<dyn ResourceCleanup>,
    metrics: Arc<ClusterMetrics>,
    clusters: HashMap<NamespacedName, Box<dyn ManagedCluster>>,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(
        config: ReconcilerConfig,
        store: Arc<dyn ResourceStore>,
        factory: Arc<dyn ClusterFactory>,
        cleanup: Arc<dyn ResourceCleanup>,
        metrics: Arc<ClusterMetrics>,
    ) -> Self {
        Self {
            config,
            store,
            factory,
            cleanup,
            metrics,
            clusters: HashMap::new(),
        }
    }

    /// Handle one watch event.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::ManualDeletionRequired`] for a failed cluster under
    ///   the Manual policy
    /// - [`ReconcileError::StatusPersist`] when a Recreate status reset cannot
    ///   be written
    /// - [`ReconcileError::InvalidSpec`] when the defaulted spec is invalid
    /// - [`ReconcileError::AlreadyRegistered`] / [`ReconcileError::NotRegistered`]
    ///   when events arrive out of order
    /// - [`ReconcileError::Construction`] when a manager cannot be built
    pub async fn handle(&mut self, event: WatchEvent) -> Result<EventOutcome> {
        let WatchEvent {
            event_type,
            object: mut resource,
        } = event;

        if !self.config.manages(&resource) {
            debug!(
                cluster = %resource.namespaced_name(),
                event = %event_type,
                "Ignoring cluster outside managed scope"
            );
            return Ok(EventOutcome::Ignored);
        }

        let decision = decide(
            resource.status.is_failed(),
            resource.spec.failure_policy,
            event_type,
        );
        match decision {
            FailureDecision::NoAction => {}
            FailureDecision::RecreateAndCleanup => return self.recreate(resource).await,
            FailureDecision::SilentDropOnDelete => {
                self.metrics.record_failed();
                self.unregister(&resource.namespaced_name());
                return Ok(EventOutcome::Handled);
            }
            FailureDecision::RequireManualDeletion => {
                self.metrics.record_failed();
                return Err(ReconcileError::manual_deletion_required(
                    resource.namespaced_name(),
                ));
            }
        }

        resource.set_defaults();
        resource.spec.validate()?;

        self.dispatch(event_type, resource).await?;
        Ok(EventOutcome::Handled)
    }

    /// Tear down a failed cluster and reset its status so it is created again.
    async fn recreate(&mut self, mut resource: ClusterResource) -> Result<EventOutcome> {
        let key = resource.namespaced_name();
        info!(cluster = %key, "Deleting cluster due to failurePolicy=Recreate");
        self.unregister(&key);

        info!(cluster = %key, "Cleaning up cluster resources");
        if let Err(e) = self.cleanup.cleanup(&key).await {
            warn!(cluster = %key, error = %e, "Unable to clean up cluster resources");
        }

        resource.status = ClusterStatus::default();
        if let Err(e) = self.store.update(&resource).await {
            error!(cluster = %key, error = %e, "Failed to reset cluster status");
            return Err(ReconcileError::status_persist(key, e));
        }
        Ok(EventOutcome::Handled)
    }

    async fn dispatch(&mut self, event_type: EventType, resource: ClusterResource) -> Result<()> {
        let key = resource.namespaced_name();
        match event_type {
            EventType::Added => {
                if self.clusters.contains_key(&key) {
                    return Err(ReconcileError::already_registered(key, event_type));
                }
                let manager = self.factory.construct(&resource).await?;
                self.clusters.insert(key.clone(), manager);
                self.metrics.record_created();
                info!(cluster = %key, size = resource.spec.size, "Cluster registered");
            }
            EventType::Modified => {
                let Some(manager) = self.clusters.get(&key) else {
                    return Err(ReconcileError::not_registered(key, event_type));
                };
                manager.update(resource);
                self.metrics.record_modified();
                debug!(cluster = %key, "Cluster update handed to manager");
            }
            EventType::Deleted => {
                let Some(manager) = self.clusters.remove(&key) else {
                    return Err(ReconcileError::not_registered(key, event_type));
                };
                manager.delete();
                self.metrics.record_deleted();
                info!(cluster = %key, "Cluster unregistered");
            }
        }
        Ok(())
    }

    /// Stop and forget a manager if one is registered.
    fn unregister(&mut self, key: &NamespacedName) {
        if let Some(manager) = self.clusters.remove(key) {
            manager.delete();
            self.metrics.record_removed();
        }
    }

    #[must_use]
    pub fn contains(&self, key: &NamespacedName) -> bool {
        self.clusters.contains_key(key)
    }

    /// Registered keys, sorted.
    #[must_use]
    pub fn registered(&self) -> Vec<NamespacedName> {
        let mut keys: Vec<_> = self.clusters.keys().cloned().collect();
        keys.sort();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    #[must_use]
    pub const fn metrics(&self) -> &Arc<ClusterMetrics> {
        &self.metrics
    }
}

/// Builder for Reconciler.
#[derive(Default)]
pub struct ReconcilerBuilder {
    config: ReconcilerConfig,
    store: Option<Arc<dyn ResourceStore>>,
    factory: Option<Arc<dyn ClusterFactory>>,
    cleanup: Option<Arc<dyn ResourceCleanup>>,
    metrics: Option<Arc<ClusterMetrics>>,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn ClusterFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Set a custom cleanup. Defaults to [`StoreCleanup`] over the store.
    #[must_use]
    pub fn with_cleanup(mut self, cleanup: Arc<dyn ResourceCleanup>) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<ClusterMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidConfig`] when the store or factory is
    /// missing, or a namespaced configuration names no namespace.
    pub fn build(self) -> Result<Reconciler> {
        let store = self
            .store
            .ok_or_else(|| ReconcileError::invalid_config("resource store is required"))?;
        let factory = self
            .factory
            .ok_or_else(|| ReconcileError::invalid_config("cluster factory is required"))?;
        if !self.config.cluster_wide && self.config.namespace.is_empty() {
            return Err(ReconcileError::invalid_config(
                "namespace is required unless cluster-wide",
            ));
        }

        let cleanup = self
            .cleanup
            .unwrap_or_else(|| Arc::new(StoreCleanup::new(store.clone())));
        let metrics = self.metrics.unwrap_or_default();

        Ok(Reconciler::new(self.config, store, factory, cleanup, metrics))
    }
}
