//! Single-owner event loop around the [`Reconciler`].
//!
//! The reconciler lives inside one tokio task and receives events over a
//! bounded queue, so registry access is serialized even when events are
//! produced concurrently.
//!
//! The loop syncs Modified events before handing them over: a Modified event
//! for a cluster with no registered manager is treated as Added. This is how
//! a cluster whose status was reset by the Recreate policy gets created again
//! on its next update. [`Reconciler::handle`] itself stays strict.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use operator_core::{EventType, WatchEvent};

use crate::error::{ReconcileError, Result};
use crate::reconciler::{EventOutcome, Reconciler};

/// Default capacity of the event queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

enum Command {
    Event {
        event: WatchEvent,
        reply: Option<oneshot::Sender<Result<EventOutcome>>>,
    },
    Shutdown,
}

/// Cloneable sender side of a running controller.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<Command>,
}

impl ControllerHandle {
    /// Queue an event without waiting for its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::ControllerStopped`] if the loop has exited.
    pub async fn send(&self, event: WatchEvent) -> Result<()> {
        self.tx
            .send(Command::Event { event, reply: None })
            .await
            .map_err(|_| ReconcileError::ControllerStopped)
    }

    /// Queue an event and wait for the reconciler's answer.
    ///
    /// # Errors
    ///
    /// Returns whatever the reconciler returned for the event, or
    /// [`ReconcileError::ControllerStopped`] if the loop has exited.
    pub async fn dispatch(&self, event: WatchEvent) -> Result<EventOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Event {
                event,
                reply: Some(reply),
            })
            .await
            .map_err(|_| ReconcileError::ControllerStopped)?;
        rx.await.map_err(|_| ReconcileError::ControllerStopped)?
    }

    /// Ask the loop to stop after the events already queued.
    pub async fn shutdown(&self) {
        if self.tx.send(Command::Shutdown).await.is_err() {
            debug!("Controller already stopped");
        }
    }
}

/// Spawn the controller loop.
///
/// The returned join handle yields the reconciler once the loop stops,
/// either on [`ControllerHandle::shutdown`] or when every handle is dropped.
pub fn spawn_controller(
    reconciler: Reconciler,
    capacity: usize,
) -> (ControllerHandle, JoinHandle<Reconciler>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let task = tokio::spawn(run(reconciler, rx));
    (ControllerHandle { tx }, task)
}

/// Treat a Modified event for an unregistered cluster as Added.
fn sync_event(reconciler: &Reconciler, mut event: WatchEvent) -> WatchEvent {
    if event.event_type == EventType::Modified && !reconciler.contains(&event.key()) {
        debug!(cluster = %event.key(), "No manager registered, syncing update as add");
        event.event_type = EventType::Added;
    }
    event
}

async fn run(mut reconciler: Reconciler, mut rx: mpsc::Receiver<Command>) -> Reconciler {
    info!(
        namespace = %reconciler.config().namespace,
        cluster_wide = reconciler.config().cluster_wide,
        "Controller started"
    );

    while let Some(command) = rx.recv().await {
        match command {
            Command::Event { event, reply } => {
                let event = sync_event(&reconciler, event);
                let key = event.key();
                let event_type = event.event_type;
                let result = reconciler.handle(event).await;

                match &result {
                    Ok(EventOutcome::Ignored) => {
                        debug!(cluster = %key, event = %event_type, "Event ignored");
                    }
                    Ok(EventOutcome::Handled) => {
                        debug!(cluster = %key, event = %event_type, "Event handled");
                    }
                    Err(e) => {
                        warn!(cluster = %key, event = %event_type, error = %e, "Failed to handle event");
                    }
                }

                if let Some(reply) = reply {
                    // Caller may have stopped waiting
                    let _ = reply.send(result);
                }
            }
            Command::Shutdown => break,
        }
    }

    info!(clusters = reconciler.len(), "Controller stopped");
    reconciler
}
