//! Actor-backed cluster managers.
//!
//! Each managed cluster gets its own ractor actor. The reconciler talks to
//! it only through fire-and-forget casts, so its guarantee ends when a
//! message is accepted into the mailbox.

use std::fmt;

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tracing::{debug, error, info, warn};

use operator_core::{ClusterResource, ClusterSpec, NamespacedName};

use crate::config::{ClusterConfig, MAX_NAME_LENGTH};
use crate::error::{ClusterError, ConstructionError};
use crate::manager::{ClusterFactory, ManagedCluster};

/// Where a manager's own reconciliation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerPhase {
    Running,
    /// Recovering from quorum loss.
    Recovering,
    /// Hit a fatal error and reported the cluster failed.
    Failed,
}

impl fmt::Display for ManagerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Recovering => write!(f, "recovering"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Point-in-time view of a manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSnapshot {
    pub key: NamespacedName,
    pub phase: ManagerPhase,
    /// Number of spec changes applied since construction.
    pub generation: u64,
    pub spec: ClusterSpec,
    pub errors_observed: u64,
    pub recovery_attempts: u32,
}

/// Messages handled by a cluster manager actor.
#[derive(Debug)]
pub enum ClusterMessage {
    /// The resource changed.
    Update(Box<ClusterResource>),
    /// The resource is gone; stop.
    Delete,
    /// An error came out of the manager's reconciliation.
    ReportError(ClusterError),
    GetSnapshot {
        reply: RpcReplyPort<ClusterSnapshot>,
    },
}

pub struct ClusterManagerArguments {
    pub config: ClusterConfig,
    pub resource: ClusterResource,
}

pub struct ClusterManagerState {
    config: ClusterConfig,
    resource: ClusterResource,
    phase: ManagerPhase,
    generation: u64,
    errors_observed: u64,
    recovery_attempts: u32,
}

impl ClusterManagerState {
    fn new(args: ClusterManagerArguments) -> Self {
        Self {
            config: args.config,
            resource: args.resource,
            phase: ManagerPhase::Running,
            generation: 0,
            errors_observed: 0,
            recovery_attempts: 0,
        }
    }

    fn key(&self) -> NamespacedName {
        self.resource.namespaced_name()
    }

    fn snapshot(&self) -> ClusterSnapshot {
        ClusterSnapshot {
            key: self.key(),
            phase: self.phase,
            generation: self.generation,
            spec: self.resource.spec.clone(),
            errors_observed: self.errors_observed,
            recovery_attempts: self.recovery_attempts,
        }
    }
}

#[derive(Clone, Default)]
pub struct ClusterManagerDef;

impl ClusterManagerDef {
    fn handle_update(state: &mut ClusterManagerState, resource: ClusterResource) {
        if state.phase == ManagerPhase::Failed {
            debug!(cluster = %state.key(), "Ignoring update for failed cluster");
            return;
        }

        if resource.spec != state.resource.spec {
            state.generation = state.generation.saturating_add(1);
            info!(
                cluster = %state.key(),
                generation = state.generation,
                size = resource.spec.size,
                version = %resource.spec.version,
                "Cluster spec updated"
            );
        }
        if resource.spec.paused && !state.resource.spec.paused {
            info!(cluster = %state.key(), "Cluster control paused");
        }
        state.resource = resource;
    }

    async fn handle_error(
        myself: &ActorRef<ClusterMessage>,
        state: &mut ClusterManagerState,
        err: ClusterError,
    ) {
        state.errors_observed = state.errors_observed.saturating_add(1);

        let Some(reason) = err.fatal_reason() else {
            warn!(cluster = %state.key(), error = %err, "Cluster reconciliation error");
            return;
        };

        if state.config.recover_quorum_loss {
            state.phase = ManagerPhase::Recovering;
            state.recovery_attempts = state.recovery_attempts.saturating_add(1);
            warn!(
                cluster = %state.key(),
                reason,
                attempt = state.recovery_attempts,
                "Fatal cluster error, attempting recovery"
            );
            return;
        }

        error!(cluster = %state.key(), reason, "Fatal cluster error, marking cluster failed");
        if let Err(e) = Self::report_failed(state, reason).await {
            error!(cluster = %state.key(), error = %e, "Failed to report failed status");
        }
        state.phase = ManagerPhase::Failed;
        myself.stop(Some(format!("cluster failed: {reason}")));
    }

    /// Persist `status.phase = Failed` on the latest stored copy.
    async fn report_failed(state: &ClusterManagerState, reason: &str) -> Result<(), ClusterError> {
        let key = state.key();
        let mut resource = state
            .config
            .store
            .get(&key)
            .await?
            .unwrap_or_else(|| state.resource.clone());
        resource.status.set_failed(reason);
        state.config.store.update(&resource).await?;
        Ok(())
    }
}

impl Actor for ClusterManagerDef {
    type Msg = ClusterMessage;
    type State = ClusterManagerState;
    type Arguments = ClusterManagerArguments;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let state = ClusterManagerState::new(args);
        info!(
            cluster = %state.key(),
            size = state.resource.spec.size,
            service_account = %state.config.service_account,
            "Cluster manager starting"
        );
        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            ClusterMessage::Update(resource) => {
                Self::handle_update(state, *resource);
            }
            ClusterMessage::Delete => {
                info!(cluster = %state.key(), "Cluster deleted, stopping manager");
                myself.stop(None);
            }
            ClusterMessage::ReportError(err) => {
                Self::handle_error(&myself, state, err).await;
            }
            ClusterMessage::GetSnapshot { reply } => {
                // Caller may have timed out
                let _ = reply.send(state.snapshot());
            }
        }
        Ok(())
    }
}

/// Handle to a running cluster manager actor.
#[derive(Clone)]
pub struct ClusterHandle {
    key: NamespacedName,
    actor: ActorRef<ClusterMessage>,
}

impl ClusterHandle {
    #[must_use]
    pub const fn key(&self) -> &NamespacedName {
        &self.key
    }

    #[must_use]
    pub const fn actor(&self) -> &ActorRef<ClusterMessage> {
        &self.actor
    }

    /// Feed an error from the cluster's own reconciliation to the manager.
    pub fn report_error(&self, err: ClusterError) {
        if let Err(e) = self.actor.send_message(ClusterMessage::ReportError(err)) {
            debug!(cluster = %self.key, error = %e, "Manager not accepting errors");
        }
    }

    /// Query the manager's current view.
    ///
    /// # Errors
    ///
    /// Returns an error when the manager has stopped or does not answer in time.
    pub async fn snapshot(&self, timeout: std::time::Duration) -> Result<ClusterSnapshot, ClusterError> {
        let result = self
            .actor
            .call(|reply| ClusterMessage::GetSnapshot { reply }, Some(timeout))
            .await
            .map_err(|e| ClusterError::other(format!("manager for {} unavailable: {e}", self.key)))?;

        match result {
            ractor::rpc::CallResult::Success(snapshot) => Ok(snapshot),
            ractor::rpc::CallResult::Timeout => Err(ClusterError::other(format!(
                "manager for {} timed out after {timeout:?}",
                self.key
            ))),
            ractor::rpc::CallResult::SenderError => Err(ClusterError::other(format!(
                "manager for {} dropped the reply",
                self.key
            ))),
        }
    }
}

impl ManagedCluster for ClusterHandle {
    fn update(&self, resource: ClusterResource) {
        if let Err(e) = self
            .actor
            .send_message(ClusterMessage::Update(Box::new(resource)))
        {
            warn!(cluster = %self.key, error = %e, "Manager not accepting updates");
        }
    }

    fn delete(&self) {
        if let Err(e) = self.actor.send_message(ClusterMessage::Delete) {
            debug!(cluster = %self.key, error = %e, "Manager already stopped");
        }
    }
}

/// Spawns one [`ClusterManagerDef`] actor per cluster.
#[derive(Debug, Clone)]
pub struct ActorClusterFactory {
    config: ClusterConfig,
}

impl ActorClusterFactory {
    pub const fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Spawn a manager and return its concrete handle.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::NameTooLong`] for names over
    /// [`MAX_NAME_LENGTH`], or [`ConstructionError::SpawnFailed`] when the
    /// actor does not start.
    pub async fn spawn(&self, resource: &ClusterResource) -> Result<ClusterHandle, ConstructionError> {
        let key = resource.namespaced_name();
        if resource.name.len() > MAX_NAME_LENGTH {
            return Err(ConstructionError::NameTooLong {
                name: resource.name.clone(),
                max: MAX_NAME_LENGTH,
            });
        }

        let args = ClusterManagerArguments {
            config: self.config.clone(),
            resource: resource.clone(),
        };
        let (actor, _handle) = Actor::spawn(None, ClusterManagerDef, args)
            .await
            .map_err(|e| ConstructionError::spawn_failed(&key, e))?;

        Ok(ClusterHandle { key, actor })
    }
}

#[async_trait]
impl ClusterFactory for ActorClusterFactory {
    async fn construct(
        &self,
        resource: &ClusterResource,
    ) -> Result<Box<dyn ManagedCluster>, ConstructionError> {
        let handle = self.spawn(resource).await?;
        Ok(Box::new(handle))
    }
}
