//! Best-effort deletion of the auxiliary objects belonging to a cluster.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use itertools::Itertools;
use tracing::debug;

use operator_core::{
    client_service_name, DeleteOptions, DeleteTarget, NamespacedName, ResourceKind,
    ResourceStore, StoreError, CLUSTER_LABEL,
};

/// Grace period applied to every cleanup deletion.
pub const TERMINATION_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// One or more cleanup deletions failed.
///
/// Displays every underlying failure in attempt order, joined with `", "`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupError {
    failures: Vec<StoreError>,
}

impl CleanupError {
    #[must_use]
    pub fn failures(&self) -> &[StoreError] {
        &self.failures
    }
}

impl fmt::Display for CleanupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.failures.iter().join(", "))
    }
}

impl std::error::Error for CleanupError {}

/// Deletes the auxiliary objects of a cluster.
#[async_trait]
pub trait ResourceCleanup: Send + Sync {
    /// Attempt every deletion, regardless of earlier failures.
    ///
    /// # Errors
    ///
    /// Returns a [`CleanupError`] aggregating every failed deletion.
    async fn cleanup(&self, cluster: &NamespacedName) -> Result<(), CleanupError>;
}

/// The objects a cluster owns, in deletion order: disruption budget, member
/// pods, peer service, client service.
#[must_use]
pub fn cleanup_targets(cluster: &NamespacedName) -> [(ResourceKind, DeleteTarget); 4] {
    [
        (
            ResourceKind::PodDisruptionBudget,
            DeleteTarget::name(&cluster.name),
        ),
        (
            ResourceKind::Pod,
            DeleteTarget::selector(CLUSTER_LABEL, &cluster.name),
        ),
        (ResourceKind::Service, DeleteTarget::name(&cluster.name)),
        (
            ResourceKind::Service,
            DeleteTarget::name(client_service_name(&cluster.name)),
        ),
    ]
}

/// [`ResourceCleanup`] backed by a [`ResourceStore`].
///
/// An object that is already gone counts as cleaned up.
pub struct StoreCleanup {
    store: Arc<dyn ResourceStore>,
    grace_period: Duration,
}

impl StoreCleanup {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            grace_period: TERMINATION_GRACE_PERIOD,
        }
    }

    #[must_use]
    pub const fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}

#[async_trait]
impl ResourceCleanup for StoreCleanup {
    async fn cleanup(&self, cluster: &NamespacedName) -> Result<(), CleanupError> {
        let options = DeleteOptions::with_grace_period(self.grace_period);
        let mut failures = Vec::new();

        for (kind, target) in cleanup_targets(cluster) {
            match self
                .store
                .delete(kind, &cluster.namespace, &target, options)
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(cluster = %cluster, kind = %kind, target = %target, "Already deleted");
                }
                Err(e) => failures.push(e),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CleanupError { failures })
        }
    }
}
