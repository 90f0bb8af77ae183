use super::{CheckerRef, ScopeCheckerCore, TryAllowedResult};
use crate::domain::ResourceWithAccess;
use crate::errors::Result;
use crate::sac::effective_access_scope::ScopeTree;
use crate::sac::scope_key::ScopeKey;
use async_trait::async_trait;
use lazy_static::lazy_static;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

lazy_static! {
    static ref ALLOW_ALL: CheckerRef = Arc::new(UniformChecker { allowed: true });
    static ref DENY_ALL: CheckerRef = Arc::new(UniformChecker { allowed: false });
}

/// Checker that answers the same at every level below it
#[derive(Debug, Clone, Copy)]
pub struct UniformChecker {
    allowed: bool,
}

/// Checker allowing everything
pub fn allow_all() -> CheckerRef {
    ALLOW_ALL.clone()
}

/// Checker denying everything
pub fn deny_all() -> CheckerRef {
    DENY_ALL.clone()
}

#[async_trait]
impl ScopeCheckerCore for UniformChecker {
    fn sub_scope_checker(&self, _key: ScopeKey<'_>) -> Result<CheckerRef> {
        Ok(if self.allowed { allow_all() } else { deny_all() })
    }

    fn try_allowed(&self) -> Result<TryAllowedResult> {
        Ok(TryAllowedResult::from_bool(self.allowed))
    }

    async fn perform_checks(&self, _cancel: &CancellationToken) -> Result<()> {
        Ok(())
    }

    fn effective_access_scope(&self, _resource: ResourceWithAccess) -> Result<ScopeTree> {
        Ok(if self.allowed { ScopeTree::unrestricted() } else { ScopeTree::deny_all() })
    }
}
