//! Error types for the resource model and the resource store.
//!
//! All errors are explicit, typed values. Nothing in this crate panics.

use thiserror::Error;

use crate::store::ResourceKind;

/// Result type alias for resource store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by a [`ResourceStore`](crate::store::ResourceStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} '{namespace}/{name}' not found")]
    NotFound {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },

    #[error("conflict updating '{key}': {reason}")]
    Conflict { key: String, reason: String },

    #[error("failed to delete {kind} '{namespace}/{target}': {reason}")]
    DeleteFailed {
        kind: ResourceKind,
        namespace: String,
        target: String,
        reason: String,
    },

    #[error("resource store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    /// Create a not found error for an auxiliary object.
    pub fn not_found(
        kind: ResourceKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(key: impl ToString, reason: impl Into<String>) -> Self {
        Self::Conflict {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a delete failed error.
    pub fn delete_failed(
        kind: ResourceKind,
        namespace: impl Into<String>,
        target: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::DeleteFailed {
            kind,
            namespace: namespace.into(),
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Whether the error only says the object was already gone.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A structural problem with a cluster spec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("spec.size must be at least 1 (got {size})")]
    InvalidSize { size: u32 },

    #[error("spec.version '{version}' is not a valid semantic version: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("spec.pod.labels must not contain reserved key '{key}'")]
    ReservedLabel { key: String },

    #[error("spec.pod.annotations must not contain reserved key '{key}'")]
    ReservedAnnotation { key: String },

    #[error("spec.tls.static: {field} must be set")]
    MissingTlsSecret { field: &'static str },
}

impl SpecError {
    /// Create an invalid version error.
    pub fn invalid_version(version: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidVersion {
            version: version.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a reserved label error.
    pub fn reserved_label(key: impl Into<String>) -> Self {
        Self::ReservedLabel { key: key.into() }
    }

    /// Create a reserved annotation error.
    pub fn reserved_annotation(key: impl Into<String>) -> Self {
        Self::ReservedAnnotation { key: key.into() }
    }
}
