//! The lifecycle contract between the reconciler and cluster managers.

use async_trait::async_trait;
use operator_core::ClusterResource;

use crate::error::ConstructionError;

/// A running cluster manager.
///
/// Both calls hand work off and return immediately. Problems surface later
/// through the resource's status, not through these calls.
pub trait ManagedCluster: Send + Sync {
    /// Hand the latest resource to the manager.
    fn update(&self, resource: ClusterResource);

    /// Stop managing the cluster.
    fn delete(&self);
}

/// Builds cluster managers.
#[async_trait]
pub trait ClusterFactory: Send + Sync {
    /// Start a manager for `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError`] when the manager cannot be created; no
    /// manager is left running in that case.
    async fn construct(
        &self,
        resource: &ClusterResource,
    ) -> Result<Box<dyn ManagedCluster>, ConstructionError>;
}
