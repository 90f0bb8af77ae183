//! Convenience checks bound to one resource.

use crate::domain::{Access, NamespaceMetadata, ResourceMetadata, ResourceWithAccess};
use crate::errors::{Result, SacError};
use crate::sac::scope_checker::ScopeChecker;
use crate::sac::search::SearchHelper;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct ForResource {
    resource: ResourceMetadata,
}

pub fn for_resource(resource: ResourceMetadata) -> ForResource {
    ForResource { resource }
}

impl ForResource {
    pub fn resource(&self) -> ResourceMetadata {
        self.resource
    }

    /// Resource-level checker for `access` below the global-level `checker`
    pub fn scope_checker(&self, checker: &ScopeChecker, access: Access) -> ScopeChecker {
        checker.access_mode(access).resource(self.resource)
    }

    /// Whether `access` is granted on the resource everywhere
    pub async fn has_global_access(
        &self,
        checker: &ScopeChecker,
        access: Access,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.scope_checker(checker, access).allowed(cancel).await
    }

    pub async fn has_global_read(
        &self,
        checker: &ScopeChecker,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.has_global_access(checker, Access::ReadAccess, cancel).await
    }

    pub async fn has_global_write(
        &self,
        checker: &ScopeChecker,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.has_global_access(checker, Access::ReadWriteAccess, cancel).await
    }

    /// Namespaces in which `access` on the resource is granted.
    ///
    /// Globally scoped resources are not bound to namespaces: every namespace
    /// passes as soon as any part of the resource is accessible. Cluster
    /// scoped resources pass the namespaces of every cluster that is not
    /// excluded. Checkers without an effective access scope fall back to
    /// checking each namespace.
    pub async fn filter_accessible_namespaces(
        &self,
        checker: &ScopeChecker,
        access: Access,
        namespaces: Vec<NamespaceMetadata>,
        cancel: &CancellationToken,
    ) -> Result<Vec<NamespaceMetadata>> {
        let resource_checker = self.scope_checker(checker, access);
        if resource_checker.allowed(cancel).await? {
            return Ok(namespaces);
        }

        let target = ResourceWithAccess::new(self.resource, access);
        let tree = match checker.effective_access_scope(target) {
            Ok(tree) => tree,
            Err(SacError::NotSupported(_)) if !self.resource.is_global() => {
                return SearchHelper::new(self.resource)?
                    .filter_results(&resource_checker, namespaces, cancel)
                    .await;
            }
            Err(SacError::NotSupported(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        if self.resource.is_global() {
            return Ok(if tree.is_deny_all() { Vec::new() } else { namespaces });
        }
        Ok(namespaces
            .into_iter()
            .filter(|ns| tree.grants(self.resource.scope, &ns.cluster_id, Some(&ns.name)))
            .collect())
    }
}
