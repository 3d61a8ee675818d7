//! Replay of recorded watch events through a running controller.

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use operator_core::WatchEvent;
use operator_reconciler::{ControllerHandle, EventOutcome, ReconcileError};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read events file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse events: {0}")]
    Parse(String),

    #[error(transparent)]
    Controller(#[from] ReconcileError),
}

/// Tally of replayed event outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub handled: usize,
    pub ignored: usize,
    pub failed: usize,
}

/// Parse a YAML sequence of watch events.
///
/// # Errors
///
/// Returns [`ReplayError::Parse`] when the text is not a list of events.
pub fn parse_events(content: &str) -> Result<Vec<WatchEvent>, ReplayError> {
    serde_yaml::from_str(content).map_err(|e| ReplayError::Parse(e.to_string()))
}

/// Load watch events from a YAML file.
///
/// # Errors
///
/// Returns [`ReplayError::Read`] or [`ReplayError::Parse`].
pub fn load_events(path: &Path) -> Result<Vec<WatchEvent>, ReplayError> {
    let content = std::fs::read_to_string(path).map_err(|source| ReplayError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_events(&content)
}

/// Dispatch each event in order and count the outcomes.
///
/// Event errors are counted, not returned; the reconciler never retries, so
/// a failed event is simply reported and replay moves on.
///
/// # Errors
///
/// Returns [`ReplayError::Controller`] only if the controller has stopped.
pub async fn replay(
    handle: &ControllerHandle,
    events: Vec<WatchEvent>,
) -> Result<ReplaySummary, ReplayError> {
    let mut summary = ReplaySummary::default();

    for event in events {
        let key = event.key();
        let event_type = event.event_type;
        match handle.dispatch(event).await {
            Ok(EventOutcome::Handled) => summary.handled = summary.handled.saturating_add(1),
            Ok(EventOutcome::Ignored) => summary.ignored = summary.ignored.saturating_add(1),
            Err(ReconcileError::ControllerStopped) => {
                return Err(ReconcileError::ControllerStopped.into());
            }
            Err(e) => {
                warn!(cluster = %key, event = %event_type, error = %e, "Replayed event failed");
                summary.failed = summary.failed.saturating_add(1);
            }
        }
    }

    info!(
        handled = summary.handled,
        ignored = summary.ignored,
        failed = summary.failed,
        "Replay finished"
    );
    Ok(summary)
}
