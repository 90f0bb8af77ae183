//! Roles, permission sets and access scope rules.

use crate::domain::{Access, ResourceMetadata};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Access scope id that grants every cluster and namespace
pub const UNRESTRICTED_ACCESS_SCOPE_ID: &str = "io.fleetscope.authz.accessscope.unrestricted";

/// Access scope id that grants nothing
pub const DENY_ALL_ACCESS_SCOPE_ID: &str = "io.fleetscope.authz.accessscope.denyall";

/// Set-based selector operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectorOperator {
    In,
    NotIn,
    Exists,
    NotExists,
}

/// One requirement of a set-based label selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRequirement {
    pub key: String,
    pub op: SelectorOperator,
    #[serde(default)]
    pub values: Vec<String>,
}

impl SelectorRequirement {
    pub fn new<I, S>(key: impl Into<String>, op: SelectorOperator, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { key: key.into(), op, values: values.into_iter().map(Into::into).collect() }
    }
}

/// Requirements that must all hold for the selector to match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBasedLabelSelector {
    #[serde(default)]
    pub requirements: Vec<SelectorRequirement>,
}

impl SetBasedLabelSelector {
    pub fn new(requirements: Vec<SelectorRequirement>) -> Self {
        Self { requirements }
    }
}

/// A namespace included by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRule {
    pub cluster_name: String,
    pub namespace_name: String,
}

impl NamespaceRule {
    pub fn new(cluster_name: impl Into<String>, namespace_name: impl Into<String>) -> Self {
        Self { cluster_name: cluster_name.into(), namespace_name: namespace_name.into() }
    }
}

/// Declarative access scope rules. Every list is OR'd with the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleAccessScopeRules {
    pub included_clusters: Vec<String>,
    pub included_namespaces: Vec<NamespaceRule>,
    pub cluster_label_selectors: Vec<SetBasedLabelSelector>,
    pub namespace_label_selectors: Vec<SetBasedLabelSelector>,
}

/// A named access scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleAccessScope {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rules: Option<SimpleAccessScopeRules>,
}

impl SimpleAccessScope {
    pub fn new(id: impl Into<String>, rules: Option<SimpleAccessScopeRules>) -> Self {
        let id = id.into();
        Self { name: id.clone(), id, rules }
    }

    /// The well-known scope granting everything
    pub fn unrestricted() -> Self {
        Self::new(UNRESTRICTED_ACCESS_SCOPE_ID, None)
    }

    /// The well-known scope granting nothing
    pub fn deny_all() -> Self {
        Self::new(DENY_ALL_ACCESS_SCOPE_ID, None)
    }
}

/// Resource name to granted access
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub resource_to_access: HashMap<String, Access>,
}

impl PermissionSet {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self { name: id.clone(), id, resource_to_access: HashMap::new() }
    }

    pub fn grant(mut self, resource: &ResourceMetadata, access: Access) -> Self {
        self.resource_to_access.insert(resource.resource.to_string(), access);
        self
    }

    /// Access granted on `resource`, taking the replacing resource into account
    pub fn access_for(&self, resource: &ResourceMetadata) -> Access {
        let direct = self.resource_to_access.get(resource.resource).copied().unwrap_or_default();
        let replacing = resource
            .replacing
            .and_then(|r| self.resource_to_access.get(r.resource).copied())
            .unwrap_or_default();
        direct.max(replacing)
    }
}

/// A role merged with its permission set and access scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRole {
    pub role_name: String,
    pub permission_set: PermissionSet,
    #[serde(default)]
    pub access_scope: Option<SimpleAccessScope>,
}

impl ResolvedRole {
    pub fn new(
        role_name: impl Into<String>,
        permission_set: PermissionSet,
        access_scope: Option<SimpleAccessScope>,
    ) -> Self {
        Self { role_name: role_name.into(), permission_set, access_scope }
    }

    /// Id used to key cached trees; empty when the role has no access scope
    pub fn access_scope_id(&self) -> &str {
        self.access_scope.as_ref().map(|s| s.id.as_str()).unwrap_or("")
    }
}
