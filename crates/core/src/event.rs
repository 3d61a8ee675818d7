//! Watch events delivered by the resource store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::name::NamespacedName;
use crate::resource::ClusterResource;

/// Kind of change a watch event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "ADDED"),
            Self::Modified => write!(f, "MODIFIED"),
            Self::Deleted => write!(f, "DELETED"),
        }
    }
}

/// A lifecycle notification for one cluster resource.
///
/// Delivery is at-least-once. Events for the same key arrive in order;
/// there is no ordering across keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub object: ClusterResource,
}

impl WatchEvent {
    pub const fn new(event_type: EventType, object: ClusterResource) -> Self {
        Self { event_type, object }
    }

    pub const fn added(object: ClusterResource) -> Self {
        Self::new(EventType::Added, object)
    }

    pub const fn modified(object: ClusterResource) -> Self {
        Self::new(EventType::Modified, object)
    }

    pub const fn deleted(object: ClusterResource) -> Self {
        Self::new(EventType::Deleted, object)
    }

    #[must_use]
    pub fn key(&self) -> NamespacedName {
        self.object.namespaced_name()
    }
}
