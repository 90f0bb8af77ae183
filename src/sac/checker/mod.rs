//! Scope checker cores.
//!
//! A core is one node of the scope hierarchy. Descending with
//! [`ScopeCheckerCore::sub_scope_checker`] yields the node for the next
//! level; terminal methods answer whether access is granted at that node.

mod error_core;
mod fixed;
mod full_access;
mod or;
mod uniform;

pub use error_core::ErrorCore;
pub use fixed::{allow_fixed_scopes, scope_map_checker, FixedScopesChecker, TestScopeMap};
pub use full_access::{
    with_unrestricted_resource_read, with_unrestricted_resource_read_write, FullAccessOverride,
};
pub use or::{or_checker, OrChecker};
pub use uniform::{allow_all, deny_all, UniformChecker};

use crate::domain::ResourceWithAccess;
use crate::errors::Result;
use crate::sac::effective_access_scope::ScopeTree;
use crate::sac::scope_key::ScopeKey;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of a non-blocking access check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TryAllowedResult {
    Allow,
    Deny,
    /// The answer requires [`ScopeCheckerCore::perform_checks`]
    Unknown,
}

impl TryAllowedResult {
    pub fn from_bool(allowed: bool) -> Self {
        if allowed {
            TryAllowedResult::Allow
        } else {
            TryAllowedResult::Deny
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TryAllowedResult::Allow => "allow",
            TryAllowedResult::Deny => "deny",
            TryAllowedResult::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TryAllowedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared handle to a checker core
pub type CheckerRef = Arc<dyn ScopeCheckerCore>;

/// One node of the scope checker hierarchy.
///
/// Implementations must tolerate concurrent use of a node and its
/// descendants from independent tasks.
#[async_trait]
pub trait ScopeCheckerCore: Send + Sync + fmt::Debug {
    /// Checker for the child scope selected by `key`.
    ///
    /// Fails with [`crate::errors::SacError::UnexpectedScopeKey`] when `key`
    /// is not of the kind expected at this level.
    fn sub_scope_checker(&self, key: ScopeKey<'_>) -> Result<CheckerRef>;

    /// Answer without blocking; `Unknown` means
    /// [`perform_checks`](Self::perform_checks) must run first.
    fn try_allowed(&self) -> Result<TryAllowedResult>;

    /// Resolve every pending `Unknown` under this node. Cancellation resolves
    /// pending checks to deny.
    async fn perform_checks(&self, cancel: &CancellationToken) -> Result<()>;

    /// Clusters and namespaces in which `resource` may be accessed
    fn effective_access_scope(&self, resource: ResourceWithAccess) -> Result<ScopeTree>;

    /// Whether search results must be filtered one by one instead of through
    /// a query filter
    fn needs_post_filtering(&self) -> bool {
        false
    }
}
