//! Directory records for clusters and namespaces.
//!
//! These are the shapes returned by the cluster and namespace directories.
//! A session captures one snapshot of each and never mutates it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label map attached to clusters and namespaces
pub type Labels = BTreeMap<String, String>;

/// A managed cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
}

impl Cluster {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), labels: Labels::new() }
    }

    pub fn with_labels<K, V>(mut self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

/// A namespace inside a cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceMetadata {
    pub id: String,
    pub name: String,
    pub cluster_id: String,
    pub cluster_name: String,
    #[serde(default)]
    pub labels: Labels,
}

impl NamespaceMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>, cluster: &Cluster) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cluster_id: cluster.id.clone(),
            cluster_name: cluster.name.clone(),
            labels: Labels::new(),
        }
    }

    pub fn with_labels<K, V>(mut self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}
