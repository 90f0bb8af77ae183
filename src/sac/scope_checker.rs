//! Session-facing scope checker.
//!
//! [`ScopeChecker`] wraps a [`CheckerRef`] and keeps descent infallible: a
//! failed descent yields a checker whose terminal methods raise the failure.
//! Boolean conveniences route errors through the configured
//! [`InvariantPolicy`].

use crate::config::{InvariantPolicy, SacConfig};
use crate::domain::{Access, ResourceMetadata, ResourceWithAccess};
use crate::errors::{Result, SacError};
use crate::observability::SacMetrics;
use crate::sac::authorizer::{BuiltinChecker, Directories};
use crate::sac::checker::{
    allow_all, deny_all, CheckerRef, ErrorCore, ScopeCheckerCore, TryAllowedResult,
};
use crate::sac::effective_access_scope::ScopeTree;
use crate::sac::plugin::{plugin_scope_checker, AuthzPluginClient};
use crate::sac::scope_key::ScopeKey;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, Instrument};

#[derive(Debug, Clone)]
pub struct ScopeChecker {
    core: CheckerRef,
    policy: InvariantPolicy,
    metrics: SacMetrics,
}

impl ScopeChecker {
    pub fn new(core: CheckerRef, policy: InvariantPolicy, metrics: SacMetrics) -> Self {
        Self { core, policy, metrics }
    }

    /// Wrap `core` with the default policy and no metrics
    pub fn from_core(core: CheckerRef) -> Self {
        Self::new(core, InvariantPolicy::default(), SacMetrics::disabled())
    }

    pub fn allow_all() -> Self {
        Self::from_core(allow_all())
    }

    pub fn deny_all() -> Self {
        Self::from_core(deny_all())
    }

    pub fn core(&self) -> &CheckerRef {
        &self.core
    }

    pub fn policy(&self) -> InvariantPolicy {
        self.policy
    }

    pub fn with_policy(mut self, policy: InvariantPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn with_core(&self, core: CheckerRef) -> Self {
        Self { core, policy: self.policy, metrics: self.metrics }
    }

    /// Checker for the child scope selected by `key`
    pub fn sub_scope_checker(&self, key: ScopeKey<'_>) -> Self {
        match self.core.sub_scope_checker(key) {
            Ok(core) => self.with_core(core),
            Err(err) => {
                debug!(key = %key, error = %err, "Scope descent failed");
                self.with_core(Arc::new(ErrorCore::new(err)))
            }
        }
    }

    /// Descend through `keys` in order
    pub fn sub_scope_checkers(&self, keys: &[ScopeKey<'_>]) -> Self {
        keys.iter().fold(self.clone(), |checker, key| checker.sub_scope_checker(*key))
    }

    pub fn access_mode(&self, access: Access) -> Self {
        self.sub_scope_checker(ScopeKey::AccessMode(access))
    }

    pub fn resource(&self, resource: ResourceMetadata) -> Self {
        self.sub_scope_checker(ScopeKey::Resource(resource))
    }

    pub fn cluster_id(&self, cluster_id: &str) -> Self {
        self.sub_scope_checker(ScopeKey::Cluster(cluster_id))
    }

    pub fn namespace(&self, namespace: &str) -> Self {
        self.sub_scope_checker(ScopeKey::Namespace(namespace))
    }

    /// Answer without blocking
    pub fn try_allowed(&self) -> Result<TryAllowedResult> {
        let result = self.core.try_allowed();
        match &result {
            Ok(TryAllowedResult::Unknown) => {}
            Ok(decision) => self.metrics.record_decision(decision.as_str()),
            Err(err) => self.metrics.record_error(err.kind()),
        }
        result
    }

    /// [`try_allowed`](Self::try_allowed) after descending through `keys`
    pub fn try_allowed_keys(&self, keys: &[ScopeKey<'_>]) -> Result<TryAllowedResult> {
        self.sub_scope_checkers(keys).try_allowed()
    }

    /// Resolve every pending `Unknown` below this checker
    pub async fn perform_checks(&self, cancel: &CancellationToken) -> Result<()> {
        let result = self.core.perform_checks(cancel).await;
        if let Err(err) = &result {
            self.metrics.record_error(err.kind());
        }
        result
    }

    /// Decide, running deferred checks when the first answer is `Unknown`
    pub async fn allowed(&self, cancel: &CancellationToken) -> Result<bool> {
        match self.try_allowed()? {
            TryAllowedResult::Allow => return Ok(true),
            TryAllowedResult::Deny => return Ok(false),
            TryAllowedResult::Unknown => {}
        }

        self.perform_checks(cancel).await?;
        match self.try_allowed()? {
            TryAllowedResult::Allow => Ok(true),
            TryAllowedResult::Deny => Ok(false),
            TryAllowedResult::Unknown => {
                Err(SacError::internal("decision still unknown after performing checks"))
            }
        }
    }

    /// [`allowed`](Self::allowed) after descending through `keys`
    pub async fn allowed_keys(
        &self,
        cancel: &CancellationToken,
        keys: &[ScopeKey<'_>],
    ) -> Result<bool> {
        self.sub_scope_checkers(keys).allowed(cancel).await
    }

    /// Fail with [`SacError::ResourceAccessDenied`] unless allowed
    pub async fn check_allowed(&self, cancel: &CancellationToken) -> Result<()> {
        if self.allowed(cancel).await? {
            Ok(())
        } else {
            Err(SacError::ResourceAccessDenied)
        }
    }

    /// Boolean decision; errors resolve to denied or panic per policy
    pub async fn is_allowed(&self, cancel: &CancellationToken) -> bool {
        match self.allowed(cancel).await {
            Ok(allowed) => allowed,
            Err(err) => self.deny_on_error(err),
        }
    }

    /// Non-blocking boolean decision. `Unknown` reads as denied.
    pub fn try_is_allowed(&self) -> bool {
        match self.try_allowed() {
            Ok(decision) => decision == TryAllowedResult::Allow,
            Err(err) => self.deny_on_error(err),
        }
    }

    pub(crate) fn deny_on_error(&self, err: SacError) -> bool {
        if err.is_invariant_violation() && self.policy == InvariantPolicy::Panic {
            panic!("scoped access control invariant violated: {}", err);
        }
        error!(error = %err, kind = err.kind(), "Access check failed, denying");
        false
    }

    /// Clusters and namespaces in which `resource` may be accessed
    pub fn effective_access_scope(&self, resource: ResourceWithAccess) -> Result<ScopeTree> {
        let result = self.core.effective_access_scope(resource);
        if let Err(err) = &result {
            self.metrics.record_error(err.kind());
        }
        result
    }

    pub fn needs_post_filtering(&self) -> bool {
        self.core.needs_post_filtering()
    }
}

/// Build the session checker for `principal` from its resolved roles
pub async fn for_principal(
    directories: &Directories,
    principal: &str,
    config: &SacConfig,
    metrics: SacMetrics,
) -> Result<ScopeChecker> {
    let span = crate::sac_span!("for_principal", principal = principal);
    async {
        let builtin = BuiltinChecker::for_principal(directories, principal, config.detail, metrics)
            .await?;
        Ok(ScopeChecker::new(Arc::new(builtin), config.invariant_policy(), metrics))
    }
    .instrument(span)
    .await
}

/// Session checker delegating decisions to an authorization plugin
pub fn with_plugin(
    client: Arc<dyn AuthzPluginClient>,
    principal: &str,
    config: &SacConfig,
    metrics: SacMetrics,
) -> ScopeChecker {
    let core = plugin_scope_checker(client, principal, &config.plugin, metrics);
    ScopeChecker::new(core, config.invariant_policy(), metrics)
}
