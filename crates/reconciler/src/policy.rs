//! What to do with an event for a cluster in the `Failed` phase.

use operator_core::{EventType, FailurePolicy};

/// Outcome of the failure policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    /// Cluster is not failed; continue with defaulting and dispatch.
    NoAction,
    /// Tear down, clean up and reset status so the cluster is created again.
    RecreateAndCleanup,
    /// Refuse the event until a human deletes the resource.
    RequireManualDeletion,
    /// The failed resource was deleted; forget it quietly.
    SilentDropOnDelete,
}

/// Map a cluster's failed flag, policy and event type to a decision.
#[must_use]
pub const fn decide(failed: bool, policy: FailurePolicy, event_type: EventType) -> FailureDecision {
    match (failed, policy, event_type) {
        (false, _, _) => FailureDecision::NoAction,
        (true, FailurePolicy::Recreate, _) => FailureDecision::RecreateAndCleanup,
        (true, FailurePolicy::Manual, EventType::Deleted) => FailureDecision::SilentDropOnDelete,
        (true, FailurePolicy::Manual, EventType::Added | EventType::Modified) => {
            FailureDecision::RequireManualDeletion
        }
    }
}
