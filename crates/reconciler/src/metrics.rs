//! Bookkeeping counters for managed clusters.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Counts of cluster lifecycle transitions and the number of active managers.
#[derive(Debug, Default)]
pub struct ClusterMetrics {
    created: AtomicU64,
    modified: AtomicU64,
    deleted: AtomicU64,
    failed: AtomicU64,
    active: AtomicI64,
}

/// Point-in-time copy of [`ClusterMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub created: u64,
    pub modified: u64,
    pub deleted: u64,
    pub failed: u64,
    pub active: i64,
}

impl ClusterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager was registered.
    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_modified(&self) {
        self.modified.fetch_add(1, Ordering::Relaxed);
    }

    /// A manager was unregistered by a Deleted event.
    pub fn record_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    /// A failed cluster was observed under the Manual policy.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// A manager was unregistered for any other reason.
    pub fn record_removed(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            modified: self.modified.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
        }
    }
}
