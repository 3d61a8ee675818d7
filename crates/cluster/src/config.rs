//! Configuration handed to every cluster manager.

use std::fmt;
use std::sync::Arc;

use operator_core::ResourceStore;

/// Longest resource name a member pod name can be derived from
/// (63 character object names minus a 10 character random suffix and a dash).
pub const MAX_NAME_LENGTH: usize = 63 - 10 - 1;

/// Shared settings for cluster managers.
#[derive(Clone)]
pub struct ClusterConfig {
    pub service_account: String,
    /// Recover from quorum loss instead of failing the cluster.
    pub recover_quorum_loss: bool,
    pub store: Arc<dyn ResourceStore>,
}

impl ClusterConfig {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            service_account: String::new(),
            recover_quorum_loss: false,
            store,
        }
    }

    #[must_use]
    pub fn with_service_account(mut self, service_account: impl Into<String>) -> Self {
        self.service_account = service_account.into();
        self
    }

    #[must_use]
    pub const fn with_recover_quorum_loss(mut self, enabled: bool) -> Self {
        self.recover_quorum_loss = enabled;
        self
    }
}

impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("service_account", &self.service_account)
            .field("recover_quorum_loss", &self.recover_quorum_loss)
            .field("store", &"<ResourceStore>")
            .finish()
    }
}
