use super::{allow_all, CheckerRef, ErrorCore, ScopeCheckerCore, TryAllowedResult};
use crate::domain::{Access, ResourceMetadata, ResourceWithAccess};
use crate::errors::Result;
use crate::sac::effective_access_scope::ScopeTree;
use crate::sac::scope_key::{ScopeKey, ScopeKind};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Grants unrestricted access to one resource up to one access mode and
/// delegates everything else to the wrapped checker.
#[derive(Debug)]
pub struct FullAccessOverride {
    inner: CheckerRef,
    level: ScopeKind,
    access: Access,
    resource: ResourceMetadata,
}

/// Wrap a global-level checker so `resource` is readable everywhere
pub fn with_unrestricted_resource_read(inner: CheckerRef, resource: ResourceMetadata) -> CheckerRef {
    Arc::new(FullAccessOverride { inner, level: ScopeKind::Global, access: Access::ReadAccess, resource })
}

/// Wrap a global-level checker so `resource` is readable and writable everywhere
pub fn with_unrestricted_resource_read_write(
    inner: CheckerRef,
    resource: ResourceMetadata,
) -> CheckerRef {
    Arc::new(FullAccessOverride {
        inner,
        level: ScopeKind::Global,
        access: Access::ReadWriteAccess,
        resource,
    })
}

impl FullAccessOverride {
    fn covers(&self, target: &ResourceWithAccess) -> bool {
        target.access <= self.access && target.resource.answers_to(self.resource.resource)
    }
}

#[async_trait]
impl ScopeCheckerCore for FullAccessOverride {
    fn sub_scope_checker(&self, key: ScopeKey<'_>) -> Result<CheckerRef> {
        match (self.level, key) {
            (ScopeKind::Global, ScopeKey::AccessMode(access)) if access <= self.access => {
                // a failed inner descent only surfaces on the delegated path
                let inner = self
                    .inner
                    .sub_scope_checker(key)
                    .unwrap_or_else(|err| -> CheckerRef { Arc::new(ErrorCore::new(err)) });
                Ok(Arc::new(FullAccessOverride {
                    inner,
                    level: ScopeKind::AccessMode,
                    access,
                    resource: self.resource,
                }))
            }
            (ScopeKind::AccessMode, ScopeKey::Resource(resource))
                if resource.answers_to(self.resource.resource) =>
            {
                Ok(allow_all())
            }
            _ => self.inner.sub_scope_checker(key),
        }
    }

    fn try_allowed(&self) -> Result<TryAllowedResult> {
        self.inner.try_allowed()
    }

    async fn perform_checks(&self, cancel: &CancellationToken) -> Result<()> {
        self.inner.perform_checks(cancel).await
    }

    fn effective_access_scope(&self, resource: ResourceWithAccess) -> Result<ScopeTree> {
        if self.covers(&resource) {
            return Ok(ScopeTree::unrestricted());
        }
        self.inner.effective_access_scope(resource)
    }

    fn needs_post_filtering(&self) -> bool {
        self.inner.needs_post_filtering()
    }
}
