use super::{allow_all, deny_all, or_checker, CheckerRef, ScopeCheckerCore, TryAllowedResult};
use crate::domain::{resource_by_name, Access, ResourceMetadata, ResourceWithAccess};
use crate::errors::{Result, SacError};
use crate::sac::effective_access_scope::ScopeTree;
use crate::sac::scope_key::{OwnedScopeKey, ScopeKey, ScopeKind};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Allow-list checker over explicitly enumerated keys per level.
///
/// `levels[i]` lists the keys allowed at the i-th level below global (access
/// mode, resource, cluster, namespace). An empty list accepts any key at that
/// level. Once every level has been passed the checker allows everything
/// below; before that it denies. Nodes remember the access mode and resource
/// they were reached through so effective access scopes stay within them.
#[derive(Debug, Clone)]
pub struct FixedScopesChecker {
    levels: Arc<[Vec<OwnedScopeKey>]>,
    depth: usize,
    access: Option<Access>,
    resource: Option<ResourceMetadata>,
}

/// Checker allowing the cross product of the given per-level key lists
pub fn allow_fixed_scopes(levels: Vec<Vec<OwnedScopeKey>>) -> CheckerRef {
    if levels.is_empty() {
        return allow_all();
    }
    Arc::new(FixedScopesChecker { levels: levels.into(), depth: 0, access: None, resource: None })
}

impl FixedScopesChecker {
    fn remaining(&self) -> &[Vec<OwnedScopeKey>] {
        &self.levels[self.depth.min(self.levels.len())..]
    }

    fn level_kind(&self) -> ScopeKind {
        let mut kind = ScopeKind::Global;
        for _ in 0..self.depth {
            kind = kind.next().unwrap_or(ScopeKind::Namespace);
        }
        kind
    }

    fn level(&self, index: usize) -> Option<&Vec<OwnedScopeKey>> {
        if index < self.depth {
            return None;
        }
        self.levels.get(index)
    }

    fn allows_key(allowed: &[OwnedScopeKey], key: ScopeKey<'_>) -> bool {
        allowed.is_empty()
            || allowed.iter().any(|candidate| match (candidate.as_key(), key) {
                (ScopeKey::Resource(allowed), ScopeKey::Resource(requested)) => {
                    requested.matches(&allowed)
                }
                (candidate, key) => candidate == key,
            })
    }

    fn key_values<'a>(level: &'a [OwnedScopeKey]) -> impl Iterator<Item = &'a str> + 'a {
        level.iter().filter_map(|key| match key {
            OwnedScopeKey::Cluster(id) => Some(id.as_str()),
            OwnedScopeKey::Namespace(ns) => Some(ns.as_str()),
            _ => None,
        })
    }
}

#[async_trait]
impl ScopeCheckerCore for FixedScopesChecker {
    fn sub_scope_checker(&self, key: ScopeKey<'_>) -> Result<CheckerRef> {
        let current = self.level_kind();
        if current.next() != Some(key.kind()) {
            return Err(SacError::unexpected_key(current, key));
        }
        if let Some(allowed) = self.remaining().first() {
            if !Self::allows_key(allowed, key) {
                return Ok(deny_all());
            }
        }
        let depth = self.depth + 1;
        // access mode and resource nodes still answer effective access scopes
        if depth >= self.levels.len() && depth > 2 {
            return Ok(allow_all());
        }
        let mut child = FixedScopesChecker { depth, ..self.clone() };
        match key {
            ScopeKey::AccessMode(access) => child.access = Some(access),
            ScopeKey::Resource(resource) => child.resource = Some(resource),
            _ => {}
        }
        Ok(Arc::new(child))
    }

    fn try_allowed(&self) -> Result<TryAllowedResult> {
        Ok(TryAllowedResult::from_bool(self.remaining().is_empty()))
    }

    async fn perform_checks(&self, _cancel: &CancellationToken) -> Result<()> {
        Ok(())
    }

    fn effective_access_scope(&self, resource: ResourceWithAccess) -> Result<ScopeTree> {
        if self.depth > 2 {
            return Err(SacError::not_supported(
                "effective access scope below the resource level of a fixed scope checker",
            ));
        }
        if self.access.is_some_and(|access| resource.access > access) {
            return Ok(ScopeTree::deny_all());
        }
        if self.resource.is_some_and(|own| !resource.resource.matches(&own)) {
            return Ok(ScopeTree::deny_all());
        }
        if let Some(access_level) = self.level(0) {
            if !Self::allows_key(access_level, ScopeKey::AccessMode(resource.access)) {
                return Ok(ScopeTree::deny_all());
            }
        }
        if let Some(resource_level) = self.level(1) {
            if !Self::allows_key(resource_level, ScopeKey::Resource(resource.resource)) {
                return Ok(ScopeTree::deny_all());
            }
        }

        let clusters = self.levels.get(2).filter(|level| !level.is_empty());
        let namespaces = self.levels.get(3).filter(|level| !level.is_empty());
        match (clusters, namespaces) {
            (None, None) => Ok(ScopeTree::unrestricted()),
            (None, Some(_)) => Err(SacError::not_supported(
                "namespace allow-list under a wildcard cluster level",
            )),
            (Some(clusters), None) => {
                let ids: Vec<String> = Self::key_values(clusters).map(str::to_string).collect();
                Ok(ScopeTree::from_clusters_and_namespaces_map(&ids, &HashMap::new()))
            }
            (Some(clusters), Some(namespaces)) => {
                let names: Vec<String> =
                    Self::key_values(namespaces).map(str::to_string).collect();
                let map: HashMap<String, Vec<String>> = Self::key_values(clusters)
                    .map(|id| (id.to_string(), names.clone()))
                    .collect();
                Ok(ScopeTree::from_clusters_and_namespaces_map(&[], &map))
            }
        }
    }
}

/// Declarative grant map used to assemble checkers in tests and fixtures.
///
/// An access mode maps resource names to cluster ids, and a cluster id to
/// namespace names. An empty cluster map grants the whole resource and an
/// empty namespace list grants the whole cluster.
pub type TestScopeMap = HashMap<Access, BTreeMap<String, BTreeMap<String, Vec<String>>>>;

/// Or-combination of fixed scope checkers granting exactly `map`
pub fn scope_map_checker(map: &TestScopeMap) -> Result<CheckerRef> {
    let mut checkers = Vec::new();
    for (access, resources) in map {
        for (resource_name, clusters) in resources {
            let resource = resource_by_name(resource_name)?;
            let prefix = vec![
                vec![OwnedScopeKey::AccessMode(*access)],
                vec![OwnedScopeKey::Resource(resource)],
            ];
            if clusters.is_empty() {
                checkers.push(allow_fixed_scopes(prefix));
                continue;
            }
            for (cluster_id, namespaces) in clusters {
                let mut levels = prefix.clone();
                levels.push(vec![OwnedScopeKey::Cluster(cluster_id.clone())]);
                if !namespaces.is_empty() {
                    levels.push(namespaces.iter().cloned().map(OwnedScopeKey::Namespace).collect());
                }
                checkers.push(allow_fixed_scopes(levels));
            }
        }
    }
    Ok(or_checker(checkers))
}
