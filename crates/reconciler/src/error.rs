//! Error types for the reconciler crate.

use thiserror::Error;

use operator_cluster::ConstructionError;
use operator_core::{EventType, NamespacedName, SpecError, StoreError};

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Errors returned from handling a watch event.
///
/// Every variant is a plain value handed back to the caller; the reconciler
/// never retries on its own.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// An Added event arrived for a key that is already registered.
    #[error("unsafe state. cluster ({key}) was created before but we received event ({event})")]
    AlreadyRegistered { key: NamespacedName, event: EventType },

    /// A Modified or Deleted event arrived for a key that was never registered.
    #[error("unsafe state. cluster ({key}) was never created but we received event ({event})")]
    NotRegistered { key: NamespacedName, event: EventType },

    #[error("invalid cluster spec. please fix the following problem with the cluster spec: {0}")]
    InvalidSpec(#[from] SpecError),

    /// A failed cluster under the Manual policy needs a human.
    #[error("ignore failed cluster ({key}). Please delete its CR")]
    ManualDeletionRequired { key: NamespacedName },

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("failed to reset status of cluster ({key}): {source}")]
    StatusPersist {
        key: NamespacedName,
        #[source]
        source: StoreError,
    },

    #[error("invalid reconciler configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("controller stopped")]
    ControllerStopped,
}

impl ReconcileError {
    pub const fn already_registered(key: NamespacedName, event: EventType) -> Self {
        Self::AlreadyRegistered { key, event }
    }

    pub const fn not_registered(key: NamespacedName, event: EventType) -> Self {
        Self::NotRegistered { key, event }
    }

    pub const fn manual_deletion_required(key: NamespacedName) -> Self {
        Self::ManualDeletionRequired { key }
    }

    pub const fn status_persist(key: NamespacedName, source: StoreError) -> Self {
        Self::StatusPersist { key, source }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether the error points at an ordering bug in event delivery.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRegistered { .. } | Self::NotRegistered { .. }
        )
    }
}
