//! Startup-time registration of the cluster resource schema.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Wait between failed initialization attempts.
pub const INIT_RETRY_WAIT: Duration = Duration::from_secs(30);

/// The schema of a custom resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDefinition {
    /// Fully qualified name, `<plural>.<group>`.
    pub name: String,
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    pub short_name: String,
}

impl SchemaDefinition {
    /// The managed cluster resource type.
    #[must_use]
    pub fn cluster_schema() -> Self {
        let group = "etcd.database.coreos.com";
        let plural = "etcdclusters";
        Self {
            name: format!("{plural}.{group}"),
            group: group.to_string(),
            version: "v1beta2".to_string(),
            kind: "EtcdCluster".to_string(),
            plural: plural.to_string(),
            short_name: "etcd".to_string(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("schema '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("schema '{name}' not ready after {timeout:?}")]
    NotReady { name: String, timeout: Duration },

    #[error("schema registry error: {reason}")]
    Registry { reason: String },

    #[error("schema initialization failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<BootstrapError>,
    },
}

impl BootstrapError {
    pub fn registry(reason: impl Into<String>) -> Self {
        Self::Registry {
            reason: reason.into(),
        }
    }
}

/// The platform's registry of custom resource schemas.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Register `definition`. May fail with [`BootstrapError::AlreadyExists`].
    async fn ensure_registered(&self, definition: &SchemaDefinition) -> Result<(), BootstrapError>;

    /// Wait until the schema named `name` is served.
    async fn wait_until_ready(&self, name: &str, timeout: Duration) -> Result<(), BootstrapError>;
}

/// How schema initialization behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Register the schema at all. When false, initialization is a no-op.
    pub create_crd: bool,
    pub ready_timeout: Duration,
    pub retry_wait: Duration,
    pub max_attempts: u32,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            create_crd: true,
            ready_timeout: Duration::from_secs(30),
            retry_wait: INIT_RETRY_WAIT,
            max_attempts: 10,
        }
    }
}

/// Register the schema and wait for it, retrying the whole step on failure.
///
/// # Errors
///
/// Returns [`BootstrapError::RetriesExhausted`] carrying the last failure once
/// `max_attempts` attempts have failed.
pub async fn initialize_schema(
    registry: &dyn SchemaRegistry,
    definition: &SchemaDefinition,
    config: BootstrapConfig,
) -> Result<(), BootstrapError> {
    if !config.create_crd {
        info!(schema = %definition.name, "Schema creation disabled, skipping");
        return Ok(());
    }

    let max_attempts = config.max_attempts.max(1);
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match init_once(registry, definition, config.ready_timeout).await {
            Ok(()) => {
                info!(schema = %definition.name, attempt, "Schema ready");
                return Ok(());
            }
            Err(e) if attempt >= max_attempts => {
                return Err(BootstrapError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(e),
                });
            }
            Err(e) => {
                error!(
                    schema = %definition.name,
                    attempt,
                    error = %e,
                    retry_in = ?config.retry_wait,
                    "Initialization failed"
                );
                tokio::time::sleep(config.retry_wait).await;
            }
        }
    }
}

async fn init_once(
    registry: &dyn SchemaRegistry,
    definition: &SchemaDefinition,
    ready_timeout: Duration,
) -> Result<(), BootstrapError> {
    match registry.ensure_registered(definition).await {
        Ok(()) | Err(BootstrapError::AlreadyExists { .. }) => {}
        Err(e) => return Err(e),
    }
    registry.wait_until_ready(&definition.name, ready_timeout).await
}

/// Schema registry kept in memory; schemas are ready once registered.
#[derive(Default)]
pub struct InMemorySchemaRegistry {
    schemas: RwLock<HashSet<String>>,
}

impl InMemorySchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.schemas.read().await.contains(name)
    }
}

#[async_trait]
impl SchemaRegistry for InMemorySchemaRegistry {
    async fn ensure_registered(&self, definition: &SchemaDefinition) -> Result<(), BootstrapError> {
        if self.schemas.write().await.insert(definition.name.clone()) {
            Ok(())
        } else {
            Err(BootstrapError::AlreadyExists {
                name: definition.name.clone(),
            })
        }
    }

    async fn wait_until_ready(&self, name: &str, timeout: Duration) -> Result<(), BootstrapError> {
        if self.contains(name).await {
            Ok(())
        } else {
            Err(BootstrapError::NotReady {
                name: name.to_string(),
                timeout,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Registry that fails a fixed number of times before succeeding.
    struct FlakyRegistry {
        failures_left: AtomicU32,
        calls: AtomicU32,
        inner: InMemorySchemaRegistry,
    }

    impl FlakyRegistry {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
                inner: InMemorySchemaRegistry::new(),
            }
        }
    }

    #[async_trait]
    impl SchemaRegistry for FlakyRegistry {
        async fn ensure_registered(
            &self,
            definition: &SchemaDefinition,
        ) -> Result<(), BootstrapError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(BootstrapError::registry("apiserver unavailable"));
            }
            self.inner.ensure_registered(definition).await
        }

        async fn wait_until_ready(
            &self,
            name: &str,
            timeout: Duration,
        ) -> Result<(), BootstrapError> {
            self.inner.wait_until_ready(name, timeout).await
        }
    }

    fn fast_config(max_attempts: u32) -> BootstrapConfig {
        BootstrapConfig {
            retry_wait: Duration::from_millis(1),
            max_attempts,
            ..BootstrapConfig::default()
        }
    }

    #[tokio::test]
    async fn should_register_and_become_ready() {
        let registry = InMemorySchemaRegistry::new();
        let schema = SchemaDefinition::cluster_schema();

        initialize_schema(&registry, &schema, fast_config(1))
            .await
            .unwrap();

        assert!(registry.contains("etcdclusters.etcd.database.coreos.com").await);
    }

    #[tokio::test]
    async fn should_accept_existing_schema() {
        let registry = InMemorySchemaRegistry::new();
        let schema = SchemaDefinition::cluster_schema();
        registry.ensure_registered(&schema).await.unwrap();

        let result = initialize_schema(&registry, &schema, fast_config(1)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn should_retry_until_registry_recovers() {
        let registry = FlakyRegistry::new(2);
        let schema = SchemaDefinition::cluster_schema();

        initialize_schema(&registry, &schema, fast_config(5))
            .await
            .unwrap();

        assert_eq!(registry.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn should_give_up_after_max_attempts() {
        let registry = FlakyRegistry::new(10);
        let schema = SchemaDefinition::cluster_schema();

        let result = initialize_schema(&registry, &schema, fast_config(3)).await;

        assert!(matches!(
            result,
            Err(BootstrapError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(registry.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn should_skip_when_schema_creation_disabled() {
        let registry = FlakyRegistry::new(10);
        let config = BootstrapConfig {
            create_crd: false,
            ..fast_config(1)
        };

        let result = initialize_schema(&registry, &SchemaDefinition::cluster_schema(), config).await;

        assert!(result.is_ok());
        assert_eq!(registry.calls.load(Ordering::SeqCst), 0);
    }
}
