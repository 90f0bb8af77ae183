//! Keys used to descend the scope checker hierarchy.
//!
//! Descent order is fixed: global, access mode, resource, cluster,
//! namespace. Each level accepts exactly one key kind.

use crate::domain::{Access, ResourceMetadata};
use std::fmt;

/// Level of a node in the scope checker hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeKind {
    Global,
    AccessMode,
    Resource,
    Cluster,
    Namespace,
}

impl ScopeKind {
    /// The level reached by descending one key from `self`
    pub fn next(&self) -> Option<ScopeKind> {
        match self {
            ScopeKind::Global => Some(ScopeKind::AccessMode),
            ScopeKind::AccessMode => Some(ScopeKind::Resource),
            ScopeKind::Resource => Some(ScopeKind::Cluster),
            ScopeKind::Cluster => Some(ScopeKind::Namespace),
            ScopeKind::Namespace => None,
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScopeKind::Global => "Global",
            ScopeKind::AccessMode => "AccessMode",
            ScopeKind::Resource => "Resource",
            ScopeKind::Cluster => "Cluster",
            ScopeKind::Namespace => "Namespace",
        };
        f.write_str(s)
    }
}

/// One level's selector value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKey<'a> {
    AccessMode(Access),
    Resource(ResourceMetadata),
    /// Cluster id
    Cluster(&'a str),
    /// Namespace name
    Namespace(&'a str),
}

impl ScopeKey<'_> {
    /// The level this key selects into
    pub fn kind(&self) -> ScopeKind {
        match self {
            ScopeKey::AccessMode(_) => ScopeKind::AccessMode,
            ScopeKey::Resource(_) => ScopeKind::Resource,
            ScopeKey::Cluster(_) => ScopeKind::Cluster,
            ScopeKey::Namespace(_) => ScopeKind::Namespace,
        }
    }

    pub fn to_owned_key(&self) -> OwnedScopeKey {
        match *self {
            ScopeKey::AccessMode(access) => OwnedScopeKey::AccessMode(access),
            ScopeKey::Resource(resource) => OwnedScopeKey::Resource(resource),
            ScopeKey::Cluster(id) => OwnedScopeKey::Cluster(id.to_string()),
            ScopeKey::Namespace(ns) => OwnedScopeKey::Namespace(ns.to_string()),
        }
    }
}

impl fmt::Display for ScopeKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::AccessMode(access) => write!(f, "AccessMode({})", access),
            ScopeKey::Resource(resource) => write!(f, "Resource({})", resource),
            ScopeKey::Cluster(id) => write!(f, "Cluster({})", id),
            ScopeKey::Namespace(ns) => write!(f, "Namespace({})", ns),
        }
    }
}

/// Owned form of [`ScopeKey`], used where keys are stored
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwnedScopeKey {
    AccessMode(Access),
    Resource(ResourceMetadata),
    Cluster(String),
    Namespace(String),
}

impl OwnedScopeKey {
    pub fn as_key(&self) -> ScopeKey<'_> {
        match self {
            OwnedScopeKey::AccessMode(access) => ScopeKey::AccessMode(*access),
            OwnedScopeKey::Resource(resource) => ScopeKey::Resource(*resource),
            OwnedScopeKey::Cluster(id) => ScopeKey::Cluster(id),
            OwnedScopeKey::Namespace(ns) => ScopeKey::Namespace(ns),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.as_key().kind()
    }
}

impl fmt::Display for OwnedScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_key().fmt(f)
    }
}

/// Keys addressing one (access, resource, cluster, namespace) point
pub fn keys_for<'a>(
    access: Access,
    resource: ResourceMetadata,
    cluster_id: Option<&'a str>,
    namespace: Option<&'a str>,
) -> Vec<ScopeKey<'a>> {
    let mut keys = vec![ScopeKey::AccessMode(access), ScopeKey::Resource(resource)];
    if let Some(cluster_id) = cluster_id {
        keys.push(ScopeKey::Cluster(cluster_id));
        if let Some(namespace) = namespace {
            keys.push(ScopeKey::Namespace(namespace));
        }
    }
    keys
}
