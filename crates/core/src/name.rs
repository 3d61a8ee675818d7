//! Namespaced resource names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Composite `(namespace, name)` key identifying a cluster resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Error parsing a `namespace/name` string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid namespaced name '{0}': expected 'namespace/name'")]
pub struct ParseNameError(String);

impl FromStr for NamespacedName {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((namespace, name))
                if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(namespace, name))
            }
            _ => Err(ParseNameError(s.to_string())),
        }
    }
}
