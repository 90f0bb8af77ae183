//! Domain layer
//!
//! Plain data shared by the access control engine: access modes, the static
//! resource registry, directory records and resolved roles. Nothing here
//! performs I/O.

pub mod access;
pub mod cluster;
pub mod resource;
pub mod role;

pub use access::Access;
pub use cluster::{Cluster, Labels, NamespaceMetadata};
pub use resource::{
    list_resources, resource_by_name, resources, ResourceMetadata, ResourceScope,
    ResourceWithAccess,
};
pub use role::{
    NamespaceRule, PermissionSet, ResolvedRole, SelectorOperator, SelectorRequirement,
    SetBasedLabelSelector, SimpleAccessScope, SimpleAccessScopeRules, DENY_ALL_ACCESS_SCOPE_ID,
    UNRESTRICTED_ACCESS_SCOPE_ID,
};
