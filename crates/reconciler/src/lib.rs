//! Watch-event reconciliation for managed database clusters.
//!
//! The [`Reconciler`] receives Added/Modified/Deleted events for cluster
//! resources and keeps a registry of one manager per cluster:
//!
//! 1. Events for resources outside the configured scope are ignored
//! 2. Failed clusters are routed through their failure policy
//! 3. Remaining resources are defaulted and validated
//! 4. The event is dispatched to create, update or delete the manager
//!
//! The [`controller`] module wraps the reconciler in a single-owner task so
//! events from any number of producers are handled one at a time.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use operator_cluster::{ActorClusterFactory, ClusterConfig};
//! use operator_core::InMemoryResourceStore;
//! use operator_reconciler::{spawn_controller, ReconcilerBuilder, ReconcilerConfig};
//!
//! let store = InMemoryResourceStore::new_arc();
//! let factory = Arc::new(ActorClusterFactory::new(ClusterConfig::new(store.clone())));
//! let reconciler = ReconcilerBuilder::new()
//!     .with_config(ReconcilerConfig::namespaced("default"))
//!     .with_store(store)
//!     .with_factory(factory)
//!     .build()?;
//!
//! let (handle, task) = spawn_controller(reconciler, 64);
//! handle.dispatch(event).await?;
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod bootstrap;
pub mod cleanup;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod reconciler;

pub use bootstrap::{
    initialize_schema, BootstrapConfig, BootstrapError, InMemorySchemaRegistry,
    SchemaDefinition, SchemaRegistry, INIT_RETRY_WAIT,
};
pub use cleanup::{
    cleanup_targets, CleanupError, ResourceCleanup, StoreCleanup, TERMINATION_GRACE_PERIOD,
};
pub use controller::{spawn_controller, ControllerHandle, DEFAULT_QUEUE_CAPACITY};
pub use error::{ReconcileError, Result};
pub use metrics::{ClusterMetrics, MetricsSnapshot};
pub use policy::{decide, FailureDecision};
pub use reconciler::{EventOutcome, Reconciler, ReconcilerBuilder, ReconcilerConfig};
