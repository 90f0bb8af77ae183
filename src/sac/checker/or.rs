use super::{deny_all, CheckerRef, ErrorCore, ScopeCheckerCore, TryAllowedResult};
use crate::domain::ResourceWithAccess;
use crate::errors::{Result, SacError};
use crate::sac::effective_access_scope::ScopeTree;
use crate::sac::scope_key::ScopeKey;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Allows whatever any of its children allows
#[derive(Debug)]
pub struct OrChecker {
    children: Vec<CheckerRef>,
}

/// Combine checkers with OR semantics. An empty list denies everything.
pub fn or_checker(children: Vec<CheckerRef>) -> CheckerRef {
    match children.len() {
        0 => deny_all(),
        1 => children.into_iter().next().unwrap_or_else(deny_all),
        _ => Arc::new(OrChecker { children }),
    }
}

#[async_trait]
impl ScopeCheckerCore for OrChecker {
    fn sub_scope_checker(&self, key: ScopeKey<'_>) -> Result<CheckerRef> {
        let mut children = Vec::with_capacity(self.children.len());
        let mut errors = Vec::new();
        for child in &self.children {
            match child.sub_scope_checker(key) {
                Ok(sub) => children.push(sub),
                Err(err) => errors.push(err),
            }
        }
        if children.is_empty() {
            return Err(SacError::combine(errors)
                .unwrap_or_else(|| SacError::internal("or-combinator without children")));
        }
        // failed children stay in the combination and fail on first use
        children.extend(errors.into_iter().map(|err| Arc::new(ErrorCore::new(err)) as CheckerRef));
        Ok(or_checker(children))
    }

    fn try_allowed(&self) -> Result<TryAllowedResult> {
        let mut unknown = false;
        let mut errors = Vec::new();
        for child in &self.children {
            match child.try_allowed() {
                Ok(TryAllowedResult::Allow) => return Ok(TryAllowedResult::Allow),
                Ok(TryAllowedResult::Unknown) => unknown = true,
                Ok(TryAllowedResult::Deny) => {}
                Err(err) => errors.push(err),
            }
        }
        if let Some(err) = SacError::combine(errors) {
            return Err(err);
        }
        Ok(if unknown { TryAllowedResult::Unknown } else { TryAllowedResult::Deny })
    }

    async fn perform_checks(&self, cancel: &CancellationToken) -> Result<()> {
        let results = join_all(self.children.iter().map(|c| c.perform_checks(cancel))).await;
        match SacError::combine(results.into_iter().filter_map(|r| r.err()).collect()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn effective_access_scope(&self, resource: ResourceWithAccess) -> Result<ScopeTree> {
        let mut merged = ScopeTree::deny_all();
        let mut errors = Vec::new();
        for child in &self.children {
            match child.effective_access_scope(resource) {
                Ok(tree) => merged.merge(&tree),
                Err(err) => errors.push(err),
            }
        }
        match SacError::combine(errors) {
            Some(err) => Err(err),
            None => Ok(merged),
        }
    }

    fn needs_post_filtering(&self) -> bool {
        self.children.iter().any(|c| c.needs_post_filtering())
    }
}
