//! Operator configuration.
//!
//! Values come from an optional TOML file; command line flags override them.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use operator_cluster::ClusterConfig;
use operator_core::ResourceStore;
use operator_reconciler::{BootstrapConfig, ReconcilerConfig, DEFAULT_QUEUE_CAPACITY};

use crate::cli::Cli;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Operator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Namespace to manage. Required unless `cluster_wide` is set.
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub cluster_wide: bool,

    /// Register the cluster resource schema at startup.
    #[serde(default = "default_create_crd")]
    pub create_crd: bool,

    #[serde(default)]
    pub recover_quorum_loss: bool,

    #[serde(default)]
    pub service_account: String,

    /// Wait between failed initialization attempts.
    #[serde(with = "duration_secs", default = "default_init_retry_wait")]
    pub init_retry_wait: Duration,

    #[serde(default = "default_init_max_attempts")]
    pub init_max_attempts: u32,

    #[serde(with = "duration_secs", default = "default_schema_ready_timeout")]
    pub schema_ready_timeout: Duration,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            cluster_wide: false,
            create_crd: default_create_crd(),
            recover_quorum_loss: false,
            service_account: String::new(),
            init_retry_wait: default_init_retry_wait(),
            init_max_attempts: default_init_max_attempts(),
            schema_ready_timeout: default_schema_ready_timeout(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl OperatorConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not valid configuration.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Overlay command line flags. Flags that were given win over file values.
    #[must_use]
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(namespace) = &cli.namespace {
            self.namespace = Some(namespace.clone());
        }
        if cli.cluster_wide {
            self.cluster_wide = true;
        }
        if let Some(create_crd) = cli.create_crd {
            self.create_crd = create_crd;
        }
        if cli.recover_quorum_loss {
            self.recover_quorum_loss = true;
        }
        if let Some(service_account) = &cli.service_account {
            self.service_account.clone_from(service_account);
        }
        self
    }

    /// Check the configuration for contradictions.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no namespace is set for a
    /// namespaced operator, or the queue capacity is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_namespace = self.namespace.as_deref().is_some_and(|ns| !ns.is_empty());
        if !self.cluster_wide && !has_namespace {
            return Err(ConfigError::Invalid(
                "namespace is required unless cluster_wide is set".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            namespace: self.namespace.clone().unwrap_or_default(),
            cluster_wide: self.cluster_wide,
        }
    }

    #[must_use]
    pub fn cluster_config(&self, store: Arc<dyn ResourceStore>) -> ClusterConfig {
        ClusterConfig::new(store)
            .with_service_account(self.service_account.clone())
            .with_recover_quorum_loss(self.recover_quorum_loss)
    }

    #[must_use]
    pub const fn bootstrap_config(&self) -> BootstrapConfig {
        BootstrapConfig {
            create_crd: self.create_crd,
            ready_timeout: self.schema_ready_timeout,
            retry_wait: self.init_retry_wait,
            max_attempts: self.init_max_attempts,
        }
    }
}

const fn default_create_crd() -> bool {
    true
}

const fn default_init_retry_wait() -> Duration {
    Duration::from_secs(30)
}

const fn default_init_max_attempts() -> u32 {
    10
}

const fn default_schema_ready_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

/// Serialization helper for Duration as seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_default_config() {
        let config = OperatorConfig::default();
        assert!(config.create_crd);
        assert!(!config.cluster_wide);
        assert_eq!(config.init_retry_wait, Duration::from_secs(30));
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = OperatorConfig::from_toml(
            r#"
            namespace = "ns1"
            recover_quorum_loss = true
            init_retry_wait = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.namespace.as_deref(), Some("ns1"));
        assert!(config.recover_quorum_loss);
        assert_eq!(config.init_retry_wait, Duration::from_secs(5));
        assert_eq!(config.init_max_attempts, 10);
    }

    #[test]
    fn test_reject_unparseable_toml() {
        let result = OperatorConfig::from_toml("namespace = [");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_cli_overrides_file() {
        let cli = Cli {
            namespace: Some("ns2".to_string()),
            create_crd: Some(false),
            service_account: Some("etcd-operator".to_string()),
            ..Cli::default()
        };
        let config = OperatorConfig {
            namespace: Some("ns1".to_string()),
            ..OperatorConfig::default()
        }
        .with_cli(&cli);

        assert_eq!(config.namespace.as_deref(), Some("ns2"));
        assert!(!config.create_crd);
        assert_eq!(config.service_account, "etcd-operator");
    }

    #[test]
    fn test_namespace_required_unless_cluster_wide() {
        let namespaced = OperatorConfig::default();
        assert!(matches!(namespaced.validate(), Err(ConfigError::Invalid(_))));

        let cluster_wide = OperatorConfig {
            cluster_wide: true,
            ..OperatorConfig::default()
        };
        assert!(cluster_wide.validate().is_ok());
        assert_eq!(cluster_wide.reconciler_config(), ReconcilerConfig::cluster_wide());
    }

    #[test]
    fn test_bootstrap_config_follows_settings() {
        let config = OperatorConfig {
            create_crd: false,
            init_max_attempts: 3,
            ..OperatorConfig::default()
        };
        let bootstrap = config.bootstrap_config();
        assert!(!bootstrap.create_crd);
        assert_eq!(bootstrap.max_attempts, 3);
    }
}
