//! Cluster errors and fatal error classification.
//!
//! Fatality is an explicit tag: only errors whose root cause is
//! [`ClusterError::Fatal`] are unrecoverable. Nothing is inferred from
//! message text.

use operator_core::StoreError;
use thiserror::Error;

/// Reason carried by the quorum loss condition.
pub const QUORUM_LOST_REASON: &str = "quorum was lost";

/// An unrecoverable cluster condition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct FatalError {
    reason: String,
}

impl FatalError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Errors raised inside a cluster manager.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClusterError {
    #[error(transparent)]
    Fatal(FatalError),

    /// Creation did not complete. Not fatal.
    #[error("cluster failed to be created")]
    CreateFailed,

    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<ClusterError>,
    },

    #[error("resource store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

impl ClusterError {
    /// The quorum loss condition.
    #[must_use]
    pub fn quorum_lost() -> Self {
        Self::fatal(QUORUM_LOST_REASON)
    }

    /// Tag an unrecoverable condition. Every fatal condition opts in here.
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal(FatalError::new(reason))
    }

    pub fn other(reason: impl Into<String>) -> Self {
        Self::Other(reason.into())
    }

    /// Wrap this error with an outer cause.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The next error in the causal chain.
    #[must_use]
    pub fn cause(&self) -> Option<&Self> {
        match self {
            Self::Context { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// The innermost error in the causal chain.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        while let Some(next) = current.cause() {
            current = next;
        }
        current
    }

    /// Reason of the root cause when it is fatal.
    #[must_use]
    pub fn fatal_reason(&self) -> Option<&str> {
        match self.root_cause() {
            Self::Fatal(fatal) => Some(fatal.reason()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        is_fatal(self)
    }
}

/// Whether `err` is rooted in an unrecoverable condition.
#[must_use]
pub fn is_fatal(err: &ClusterError) -> bool {
    matches!(err.root_cause(), ClusterError::Fatal(_))
}

/// A cluster manager could not be constructed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("cluster name cannot be more than {max} characters long, please delete the CR")]
    NameTooLong { name: String, max: usize },

    #[error("failed to start cluster manager for '{name}': {reason}")]
    SpawnFailed { name: String, reason: String },
}

impl ConstructionError {
    pub fn spawn_failed(name: impl ToString, reason: impl ToString) -> Self {
        Self::SpawnFailed {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}
