//! Built-in authorizer.
//!
//! Decides access from a principal's resolved roles. At the resource level
//! roles are narrowed to those whose permission set grants at least the
//! requested access. Cluster and namespace levels then consult each
//! surviving role's effective access scope tree; any role allowing is
//! enough. Trees are computed lazily and memoized per access scope id for
//! the lifetime of one authorizer instance.

use super::cache::EffectiveAccessScopeCache;
use super::directory::{Directories, FleetSnapshot};
use crate::domain::{
    Access, ResolvedRole, ResourceMetadata, ResourceWithAccess, DENY_ALL_ACCESS_SCOPE_ID,
    UNRESTRICTED_ACCESS_SCOPE_ID,
};
use crate::errors::{Result, SacError};
use crate::observability::SacMetrics;
use crate::sac::checker::{CheckerRef, ScopeCheckerCore, TryAllowedResult};
use crate::sac::effective_access_scope::{
    compute_effective_access_scope, Detail, ScopeState, ScopeTree,
};
use crate::sac::scope_key::{ScopeKey, ScopeKind};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// State shared by every node of one authorizer's hierarchy
struct AuthorizerState {
    roles: Vec<ResolvedRole>,
    fleet: FleetSnapshot,
    detail: Detail,
    cache: EffectiveAccessScopeCache,
}

impl AuthorizerState {
    fn tree_for(&self, role: &ResolvedRole) -> Result<Arc<ScopeTree>> {
        let (id, rules) = match &role.access_scope {
            Some(scope) => (scope.id.as_str(), scope.rules.as_ref()),
            None => ("", None),
        };
        if id == UNRESTRICTED_ACCESS_SCOPE_ID {
            return Ok(Arc::new(ScopeTree::unrestricted()));
        }
        if id == DENY_ALL_ACCESS_SCOPE_ID {
            return Ok(Arc::new(ScopeTree::deny_all()));
        }
        self.cache.get_or_compute(id, || {
            let _span = crate::eas_span!(id, role = %role.role_name).entered();
            compute_effective_access_scope(
                rules,
                &self.fleet.clusters,
                &self.fleet.namespaces,
                self.detail,
            )
        })
    }

    /// Indices of roles granting at least `access` on `resource`
    fn roles_granting(&self, access: Access, resource: &ResourceMetadata) -> Arc<[usize]> {
        self.roles
            .iter()
            .enumerate()
            .filter(|(_, role)| role.permission_set.access_for(resource).satisfies(access))
            .map(|(idx, _)| idx)
            .collect()
    }

    fn resource_allowed(&self, resource: &ResourceMetadata, roles: &[usize]) -> Result<bool> {
        if roles.is_empty() {
            return Ok(false);
        }
        if resource.is_global() {
            return Ok(true);
        }
        for &idx in roles {
            if self.tree_for(&self.roles[idx])?.state == ScopeState::Included {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn scope_allowed(
        &self,
        resource: &ResourceMetadata,
        roles: &[usize],
        cluster_id: &str,
        namespace: Option<&str>,
    ) -> Result<bool> {
        if resource.is_global() {
            return self.resource_allowed(resource, roles);
        }
        for &idx in roles {
            let tree = self.tree_for(&self.roles[idx])?;
            if tree.grants(resource.scope, cluster_id, namespace) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn effective_access_scope(&self, target: ResourceWithAccess) -> Result<ScopeTree> {
        let roles = self.roles_granting(target.access, &target.resource);
        if roles.is_empty() {
            return Ok(ScopeTree::deny_all());
        }
        if target.resource.is_global() {
            return Ok(ScopeTree::unrestricted());
        }
        let mut merged = ScopeTree::deny_all();
        for &idx in roles.iter() {
            merged.merge(&*self.tree_for(&self.roles[idx])?);
            if merged.is_unrestricted() {
                break;
            }
        }
        Ok(merged)
    }
}

/// Position in the hierarchy with the fields relevant at that level
#[derive(Debug, Clone)]
enum BuiltinLevel {
    Global,
    AccessMode {
        access: Access,
    },
    Resource {
        access: Access,
        resource: ResourceMetadata,
        roles: Arc<[usize]>,
    },
    Cluster {
        resource: ResourceMetadata,
        roles: Arc<[usize]>,
        cluster_id: String,
    },
    Namespace {
        resource: ResourceMetadata,
        roles: Arc<[usize]>,
        cluster_id: String,
        namespace: String,
    },
}

impl BuiltinLevel {
    fn kind(&self) -> ScopeKind {
        match self {
            BuiltinLevel::Global => ScopeKind::Global,
            BuiltinLevel::AccessMode { .. } => ScopeKind::AccessMode,
            BuiltinLevel::Resource { .. } => ScopeKind::Resource,
            BuiltinLevel::Cluster { .. } => ScopeKind::Cluster,
            BuiltinLevel::Namespace { .. } => ScopeKind::Namespace,
        }
    }
}

/// One node of the built-in authorizer hierarchy
#[derive(Clone)]
pub struct BuiltinChecker {
    state: Arc<AuthorizerState>,
    level: BuiltinLevel,
}

impl fmt::Debug for BuiltinChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinChecker")
            .field("level", &self.level)
            .field("roles", &self.state.roles.len())
            .field("cached_trees", &self.state.cache.len())
            .finish()
    }
}

impl BuiltinChecker {
    /// Global-level checker over `roles` and a captured fleet snapshot
    pub fn new(
        roles: Vec<ResolvedRole>,
        fleet: FleetSnapshot,
        detail: Detail,
        metrics: SacMetrics,
    ) -> Self {
        let state = AuthorizerState {
            roles,
            fleet,
            detail,
            cache: EffectiveAccessScopeCache::new(metrics),
        };
        Self { state: Arc::new(state), level: BuiltinLevel::Global }
    }

    /// Resolve `principal`'s roles and capture the fleet snapshot once
    pub async fn for_principal(
        directories: &Directories,
        principal: &str,
        detail: Detail,
        metrics: SacMetrics,
    ) -> Result<Self> {
        let (roles, fleet) = tokio::try_join!(
            directories.roles.resolve_roles(principal),
            FleetSnapshot::capture(directories.clusters.as_ref(), directories.namespaces.as_ref()),
        )?;
        debug!(
            principal,
            roles = roles.len(),
            clusters = fleet.clusters.len(),
            namespaces = fleet.namespaces.len(),
            "Built-in authorizer session bootstrapped"
        );
        Ok(Self::new(roles, fleet, detail, metrics))
    }

    /// Number of distinct trees computed so far
    pub fn cached_trees(&self) -> usize {
        self.state.cache.len()
    }

    fn child(&self, level: BuiltinLevel) -> CheckerRef {
        Arc::new(Self { state: self.state.clone(), level })
    }
}

#[async_trait]
impl ScopeCheckerCore for BuiltinChecker {
    fn sub_scope_checker(&self, key: ScopeKey<'_>) -> Result<CheckerRef> {
        let level = match (&self.level, key) {
            (BuiltinLevel::Global, ScopeKey::AccessMode(access)) => {
                BuiltinLevel::AccessMode { access }
            }
            (BuiltinLevel::AccessMode { access }, ScopeKey::Resource(resource)) => {
                BuiltinLevel::Resource {
                    access: *access,
                    resource,
                    roles: self.state.roles_granting(*access, &resource),
                }
            }
            (BuiltinLevel::Resource { resource, roles, .. }, ScopeKey::Cluster(cluster_id)) => {
                BuiltinLevel::Cluster {
                    resource: *resource,
                    roles: roles.clone(),
                    cluster_id: cluster_id.to_string(),
                }
            }
            (
                BuiltinLevel::Cluster { resource, roles, cluster_id },
                ScopeKey::Namespace(namespace),
            ) => BuiltinLevel::Namespace {
                resource: *resource,
                roles: roles.clone(),
                cluster_id: cluster_id.clone(),
                namespace: namespace.to_string(),
            },
            (level, key) => return Err(SacError::unexpected_key(level.kind(), key)),
        };
        Ok(self.child(level))
    }

    fn try_allowed(&self) -> Result<TryAllowedResult> {
        let allowed = match &self.level {
            BuiltinLevel::Global | BuiltinLevel::AccessMode { .. } => false,
            BuiltinLevel::Resource { resource, roles, .. } => {
                self.state.resource_allowed(resource, roles)?
            }
            BuiltinLevel::Cluster { resource, roles, cluster_id } => {
                self.state.scope_allowed(resource, roles, cluster_id, None)?
            }
            BuiltinLevel::Namespace { resource, roles, cluster_id, namespace } => {
                self.state.scope_allowed(resource, roles, cluster_id, Some(namespace))?
            }
        };
        Ok(TryAllowedResult::from_bool(allowed))
    }

    async fn perform_checks(&self, _cancel: &CancellationToken) -> Result<()> {
        Ok(())
    }

    fn effective_access_scope(&self, resource: ResourceWithAccess) -> Result<ScopeTree> {
        match &self.level {
            BuiltinLevel::Global => self.state.effective_access_scope(resource),
            BuiltinLevel::AccessMode { access } | BuiltinLevel::Resource { access, .. }
                if resource.access <= *access =>
            {
                self.state.effective_access_scope(resource)
            }
            BuiltinLevel::AccessMode { .. } | BuiltinLevel::Resource { .. } => {
                Ok(ScopeTree::deny_all())
            }
            level => Err(SacError::not_supported(format!(
                "effective access scope at {} level of the built-in authorizer",
                level.kind()
            ))),
        }
    }
}
