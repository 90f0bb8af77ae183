//! Collaborators supplying the fleet snapshot and a principal's roles.

use crate::domain::{Cluster, NamespaceMetadata, ResolvedRole};
use crate::errors::{Result, SacError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait ClusterDirectory: Send + Sync {
    async fn list_clusters(&self) -> Result<Vec<Cluster>>;
}

#[async_trait]
pub trait NamespaceDirectory: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<NamespaceMetadata>>;
}

#[async_trait]
pub trait RoleResolver: Send + Sync {
    /// Roles of `principal`, each merged with its permission set and access scope
    async fn resolve_roles(&self, principal: &str) -> Result<Vec<ResolvedRole>>;
}

/// Immutable cluster and namespace snapshot shared by one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetSnapshot {
    pub clusters: Vec<Cluster>,
    pub namespaces: Vec<NamespaceMetadata>,
}

impl FleetSnapshot {
    pub fn new(clusters: Vec<Cluster>, namespaces: Vec<NamespaceMetadata>) -> Self {
        Self { clusters, namespaces }
    }

    /// Fetch both directories concurrently
    pub async fn capture(
        clusters: &dyn ClusterDirectory,
        namespaces: &dyn NamespaceDirectory,
    ) -> Result<Self> {
        let (clusters, namespaces) =
            tokio::try_join!(clusters.list_clusters(), namespaces.list_namespaces())?;
        Ok(Self { clusters, namespaces })
    }
}

/// The three collaborators a session is bootstrapped from
#[derive(Clone)]
pub struct Directories {
    pub clusters: Arc<dyn ClusterDirectory>,
    pub namespaces: Arc<dyn NamespaceDirectory>,
    pub roles: Arc<dyn RoleResolver>,
}

impl Directories {
    /// Use one in-memory directory for all three collaborators
    pub fn from_static(directory: StaticDirectory) -> Self {
        let directory = Arc::new(directory);
        Self { clusters: directory.clone(), namespaces: directory.clone(), roles: directory }
    }
}

/// In-memory directory backed by a fixture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticDirectory {
    #[serde(flatten)]
    pub fleet: FleetSnapshot,
    pub roles_by_principal: HashMap<String, Vec<ResolvedRole>>,
}

impl StaticDirectory {
    pub fn new(fleet: FleetSnapshot) -> Self {
        Self { fleet, roles_by_principal: HashMap::new() }
    }

    pub fn with_roles(mut self, principal: impl Into<String>, roles: Vec<ResolvedRole>) -> Self {
        self.roles_by_principal.insert(principal.into(), roles);
        self
    }
}

#[async_trait]
impl ClusterDirectory for StaticDirectory {
    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        Ok(self.fleet.clusters.clone())
    }
}

#[async_trait]
impl NamespaceDirectory for StaticDirectory {
    async fn list_namespaces(&self) -> Result<Vec<NamespaceMetadata>> {
        Ok(self.fleet.namespaces.clone())
    }
}

#[async_trait]
impl RoleResolver for StaticDirectory {
    async fn resolve_roles(&self, principal: &str) -> Result<Vec<ResolvedRole>> {
        self.roles_by_principal
            .get(principal)
            .cloned()
            .ok_or_else(|| SacError::directory(format!("unknown principal '{}'", principal)))
    }
}
