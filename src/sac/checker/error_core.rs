use super::{CheckerRef, ScopeCheckerCore, TryAllowedResult};
use crate::domain::ResourceWithAccess;
use crate::errors::{Result, SacError};
use crate::sac::effective_access_scope::ScopeTree;
use crate::sac::scope_key::ScopeKey;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Checker that failed to construct. Every method raises the stored error.
#[derive(Debug)]
pub struct ErrorCore {
    error: SacError,
}

impl ErrorCore {
    pub fn new(error: SacError) -> Self {
        Self { error }
    }

    pub fn error(&self) -> &SacError {
        &self.error
    }
}

#[async_trait]
impl ScopeCheckerCore for ErrorCore {
    fn sub_scope_checker(&self, _key: ScopeKey<'_>) -> Result<CheckerRef> {
        Err(self.error.replicate())
    }

    fn try_allowed(&self) -> Result<TryAllowedResult> {
        Err(self.error.replicate())
    }

    async fn perform_checks(&self, _cancel: &CancellationToken) -> Result<()> {
        Err(self.error.replicate())
    }

    fn effective_access_scope(&self, _resource: ResourceWithAccess) -> Result<ScopeTree> {
        Err(self.error.replicate())
    }
}
