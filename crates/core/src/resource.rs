//! The managed cluster resource: spec, status, defaulting and validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SpecError;
use crate::name::NamespacedName;

/// Image repository used when a cluster spec leaves it empty.
pub const DEFAULT_REPOSITORY: &str = "quay.io/coreos/etcd";

/// Database version used when a cluster spec leaves it empty.
pub const DEFAULT_VERSION: &str = "3.2.13";

/// Annotation selecting which operator instance manages a resource.
pub const SCOPE_ANNOTATION: &str = "etcd.database.coreos.com/scope";

/// Value of [`SCOPE_ANNOTATION`] for resources managed cluster-wide.
pub const SCOPE_CLUSTER_WIDE: &str = "clusterwide";

/// Label carried by every member pod, valued with the cluster name.
pub const CLUSTER_LABEL: &str = "etcd_cluster";

const RESERVED_POD_LABELS: [&str; 2] = ["app", CLUSTER_LABEL];
const RESERVED_POD_ANNOTATIONS: [&str; 1] = ["etcd.version"];

/// What to do once a cluster reaches the `Failed` phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Tear everything down and let the cluster be created again.
    Recreate,
    /// Leave the cluster alone until a human deletes the resource.
    #[default]
    Manual,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recreate => write!(f, "Recreate"),
            Self::Manual => write!(f, "Manual"),
        }
    }
}

/// Pod-level customisation applied to every member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodPolicy {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
}

/// Secrets for statically provisioned TLS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticTls {
    #[serde(default)]
    pub member_peer_secret: String,
    #[serde(default)]
    pub member_server_secret: String,
    #[serde(default)]
    pub operator_secret: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsPolicy {
    #[serde(default, rename = "static")]
    pub static_tls: Option<StaticTls>,
}

/// Desired state of a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Number of members.
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub version: String,
    /// Suspends the cluster manager's own reconciliation.
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub pod: Option<PodPolicy>,
    #[serde(default)]
    pub tls: Option<TlsPolicy>,
}

impl ClusterSpec {
    /// Fill unset optional fields.
    pub fn set_defaults(&mut self) {
        if self.repository.is_empty() {
            self.repository = DEFAULT_REPOSITORY.to_string();
        }
        if self.version.is_empty() {
            self.version = DEFAULT_VERSION.to_string();
        }
        if let Some(stripped) = self.version.strip_prefix('v') {
            self.version = stripped.to_string();
        }
    }

    /// Check the cluster spec for structural problems.
    ///
    /// # Errors
    ///
    /// Returns the first [`SpecError`] found.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.size == 0 {
            return Err(SpecError::InvalidSize { size: self.size });
        }

        semver::Version::parse(&self.version)
            .map_err(|e| SpecError::invalid_version(&self.version, e))?;

        if let Some(pod) = &self.pod {
            if let Some(key) = RESERVED_POD_LABELS
                .iter()
                .find(|key| pod.labels.contains_key(**key))
            {
                return Err(SpecError::reserved_label(*key));
            }
            if let Some(key) = RESERVED_POD_ANNOTATIONS
                .iter()
                .find(|key| pod.annotations.contains_key(**key))
            {
                return Err(SpecError::reserved_annotation(*key));
            }
        }

        if let Some(tls) = self.tls.as_ref().and_then(|t| t.static_tls.as_ref()) {
            if tls.member_peer_secret.is_empty() {
                return Err(SpecError::MissingTlsSecret {
                    field: "memberPeerSecret",
                });
            }
            if tls.member_server_secret.is_empty() {
                return Err(SpecError::MissingTlsSecret {
                    field: "memberServerSecret",
                });
            }
            if tls.operator_secret.is_empty() {
                return Err(SpecError::MissingTlsSecret {
                    field: "operatorSecret",
                });
            }
        }

        Ok(())
    }
}

/// Lifecycle phase reported by the cluster manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterPhase {
    /// Reset or never reported; written as an empty string.
    #[default]
    #[serde(rename = "")]
    None,
    Creating,
    Running,
    Failed,
}

impl fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, ""),
            Self::Creating => write!(f, "Creating"),
            Self::Running => write!(f, "Running"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Observed state of a cluster. The default value is the reset status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub phase: ClusterPhase,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub current_version: String,
}

impl ClusterStatus {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.phase == ClusterPhase::Failed
    }

    /// Mark the cluster failed with a reason.
    pub fn set_failed(&mut self, reason: impl Into<String>) {
        self.phase = ClusterPhase::Failed;
        self.reason = reason.into();
    }
}

/// A managed cluster resource as stored in the resource store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResource {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Opaque version assigned by the store on every write.
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default)]
    pub spec: ClusterSpec,
    #[serde(default)]
    pub status: ClusterStatus,
}

impl ClusterResource {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, spec: ClusterSpec) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            spec,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: ClusterStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn namespaced_name(&self) -> NamespacedName {
        NamespacedName::new(&self.namespace, &self.name)
    }

    /// Value of the scope annotation, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.annotations.get(SCOPE_ANNOTATION).map(String::as_str)
    }

    /// Apply spec defaults.
    pub fn set_defaults(&mut self) {
        self.spec.set_defaults();
    }
}

/// Name of the service clients connect through.
#[must_use]
pub fn client_service_name(cluster_name: &str) -> String {
    format!("{cluster_name}-client")
}
