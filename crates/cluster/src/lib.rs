//! Per-cluster managers for the cluster operator.
//!
//! A cluster manager owns one cluster's own reconciliation activity. The
//! operator's event reconciler only constructs managers and hands them
//! updates and deletions; it never waits for their work to finish.
//!
//! This crate also owns fatal error classification: managers decide whether
//! an error is unrecoverable with [`is_fatal`] and, if so, report the cluster
//! as failed through the resource store.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use operator_cluster::{ActorClusterFactory, ClusterConfig, ClusterFactory};
//! use operator_core::InMemoryResourceStore;
//!
//! let store = InMemoryResourceStore::new_arc();
//! let factory = ActorClusterFactory::new(ClusterConfig::new(store));
//! let manager = factory.construct(&resource).await?;
//! manager.update(resource);
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod actor;
pub mod config;
pub mod error;
pub mod manager;

pub use actor::{
    ActorClusterFactory, ClusterHandle, ClusterManagerDef, ClusterMessage, ClusterSnapshot,
    ManagerPhase,
};
pub use config::{ClusterConfig, MAX_NAME_LENGTH};
pub use error::{is_fatal, ClusterError, ConstructionError, FatalError, QUORUM_LOST_REASON};
pub use manager::{ClusterFactory, ManagedCluster};
