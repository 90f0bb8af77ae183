//! Static resource registry.
//!
//! Every resource guarded by scoped access control is declared here together
//! with the level its instances live at. A resource may be superseded by a
//! *replacing* resource; grants on either name apply to it.

use crate::domain::Access;
use crate::errors::{Result, SacError};
use lazy_static::lazy_static;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// The level at which instances of a resource live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceScope {
    Global,
    Cluster,
    Namespace,
}

/// Metadata for a guarded resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceMetadata {
    pub resource: &'static str,
    pub scope: ResourceScope,
    pub replacing: Option<&'static ResourceMetadata>,
}

impl ResourceMetadata {
    pub const fn new(resource: &'static str, scope: ResourceScope) -> Self {
        Self { resource, scope, replacing: None }
    }

    pub const fn replaced_by(
        resource: &'static str,
        scope: ResourceScope,
        replacing: &'static ResourceMetadata,
    ) -> Self {
        Self { resource, scope, replacing: Some(replacing) }
    }

    pub fn is_global(&self) -> bool {
        self.scope == ResourceScope::Global
    }

    pub fn is_cluster_scoped(&self) -> bool {
        self.scope == ResourceScope::Cluster
    }

    /// Whether `name` refers to this resource or its replacement
    pub fn answers_to(&self, name: &str) -> bool {
        self.resource == name || self.replacing.is_some_and(|r| r.resource == name)
    }

    /// Whether `other` is this resource or its replacement
    pub fn matches(&self, other: &ResourceMetadata) -> bool {
        self.answers_to(other.resource)
    }
}

impl fmt::Display for ResourceMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource)
    }
}

impl Serialize for ResourceMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.resource)
    }
}

/// A resource paired with the access mode requested on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceWithAccess {
    pub resource: ResourceMetadata,
    pub access: Access,
}

impl ResourceWithAccess {
    pub fn new(resource: ResourceMetadata, access: Access) -> Self {
        Self { resource, access }
    }

    pub fn read(resource: ResourceMetadata) -> Self {
        Self::new(resource, Access::ReadAccess)
    }

    pub fn read_write(resource: ResourceMetadata) -> Self {
        Self::new(resource, Access::ReadWriteAccess)
    }
}

impl fmt::Display for ResourceWithAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.access)
    }
}

/// Known resources
pub mod resources {
    use super::{ResourceMetadata, ResourceScope};

    pub const ACCESS: ResourceMetadata = ResourceMetadata::new("Access", ResourceScope::Global);
    pub const ADMINISTRATION: ResourceMetadata =
        ResourceMetadata::new("Administration", ResourceScope::Global);
    pub const ALERT: ResourceMetadata = ResourceMetadata::new("Alert", ResourceScope::Namespace);
    pub const CLUSTER: ResourceMetadata = ResourceMetadata::new("Cluster", ResourceScope::Cluster);
    pub const COMPLIANCE: ResourceMetadata =
        ResourceMetadata::new("Compliance", ResourceScope::Cluster);
    pub const DEPLOYMENT: ResourceMetadata =
        ResourceMetadata::new("Deployment", ResourceScope::Namespace);
    pub const DEPLOYMENT_EXTENSION: ResourceMetadata =
        ResourceMetadata::new("DeploymentExtension", ResourceScope::Namespace);
    pub const IMAGE: ResourceMetadata = ResourceMetadata::new("Image", ResourceScope::Namespace);
    pub const INTEGRATION: ResourceMetadata =
        ResourceMetadata::new("Integration", ResourceScope::Global);
    pub const K8S_ROLE: ResourceMetadata =
        ResourceMetadata::new("K8sRole", ResourceScope::Namespace);
    pub const NAMESPACE: ResourceMetadata =
        ResourceMetadata::new("Namespace", ResourceScope::Namespace);
    pub const NETWORK_GRAPH: ResourceMetadata =
        ResourceMetadata::new("NetworkGraph", ResourceScope::Namespace);
    pub const NODE: ResourceMetadata = ResourceMetadata::new("Node", ResourceScope::Cluster);
    pub const SECRET: ResourceMetadata = ResourceMetadata::new("Secret", ResourceScope::Namespace);

    pub const NOTIFIER: ResourceMetadata =
        ResourceMetadata::replaced_by("Notifier", ResourceScope::Global, &INTEGRATION);
    pub const PROCESS_BASELINE: ResourceMetadata = ResourceMetadata::replaced_by(
        "ProcessBaseline",
        ResourceScope::Namespace,
        &DEPLOYMENT_EXTENSION,
    );

    pub const ALL: &[ResourceMetadata] = &[
        ACCESS,
        ADMINISTRATION,
        ALERT,
        CLUSTER,
        COMPLIANCE,
        DEPLOYMENT,
        DEPLOYMENT_EXTENSION,
        IMAGE,
        INTEGRATION,
        K8S_ROLE,
        NAMESPACE,
        NETWORK_GRAPH,
        NODE,
        NOTIFIER,
        PROCESS_BASELINE,
        SECRET,
    ];
}

lazy_static! {
    static ref REGISTRY: HashMap<&'static str, ResourceMetadata> =
        resources::ALL.iter().map(|md| (md.resource, *md)).collect();
}

/// Look up a resource by name in the static registry
pub fn resource_by_name(name: &str) -> Result<ResourceMetadata> {
    REGISTRY.get(name).copied().ok_or_else(|| SacError::UnknownResource(name.to_string()))
}

/// All registered resources, sorted by name
pub fn list_resources() -> Vec<ResourceMetadata> {
    let mut all: Vec<_> = REGISTRY.values().copied().collect();
    all.sort_by_key(|md| md.resource);
    all
}
