//! Core types for the cluster operator.
//!
//! - **Resource model**: [`ClusterResource`] with its spec, status,
//!   defaulting and validation
//! - **Watch events**: [`WatchEvent`] as delivered by the resource store
//! - **Resource store**: the [`ResourceStore`] client contract and an
//!   in-memory implementation

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod event;
pub mod name;
pub mod resource;
pub mod store;

pub use error::{Result, SpecError, StoreError};
pub use event::{EventType, WatchEvent};
pub use name::{NamespacedName, ParseNameError};
pub use resource::{
    client_service_name, ClusterPhase, ClusterResource, ClusterSpec, ClusterStatus,
    FailurePolicy, PodPolicy, StaticTls, TlsPolicy, CLUSTER_LABEL, DEFAULT_REPOSITORY,
    DEFAULT_VERSION, SCOPE_ANNOTATION, SCOPE_CLUSTER_WIDE,
};
pub use store::{
    AuxiliaryObject, DeleteOptions, DeleteTarget, InMemoryResourceStore, ResourceKind,
    ResourceStore, TracingResourceStore,
};
