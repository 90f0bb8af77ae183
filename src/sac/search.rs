//! Scoped access control for search results.
//!
//! A search either runs unfiltered, runs with a pre-computed query filter,
//! or has its results checked one by one. Checking one by one takes two
//! passes: the first pass collects results whose decision is `Unknown`,
//! one `perform_checks` resolves them, and the second pass decides them.

use crate::domain::{
    Access, NamespaceMetadata, ResourceMetadata, ResourceScope, ResourceWithAccess,
};
use crate::errors::{Result, SacError};
use crate::sac::checker::TryAllowedResult;
use crate::sac::query_filter::{build_sac_query_filter, Query};
use crate::sac::scope_checker::ScopeChecker;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A search result carrying the fields access is decided on
pub trait ScopedResult {
    fn cluster_id(&self) -> Option<&str>;

    fn namespace(&self) -> Option<&str> {
        None
    }
}

impl ScopedResult for NamespaceMetadata {
    fn cluster_id(&self) -> Option<&str> {
        Some(&self.cluster_id)
    }

    fn namespace(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// How a search for one resource must be restricted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPlan {
    /// Every result is visible
    Unfiltered,
    /// Conjoin the search query with this filter
    PreFilter(Query),
    /// Check every result after searching
    PostFilter,
    /// Nothing is visible; skip the search
    Empty,
}

/// Applies read access control to searches over one resource
#[derive(Debug, Clone, Copy)]
pub struct SearchHelper {
    resource: ResourceMetadata,
}

impl SearchHelper {
    /// # Errors
    ///
    /// Returns [`SacError::NotSupported`] for globally scoped resources,
    /// which have no cluster or namespace to filter on.
    pub fn new(resource: ResourceMetadata) -> Result<Self> {
        if resource.is_global() {
            return Err(SacError::not_supported(format!(
                "search filtering for globally scoped resource {}",
                resource
            )));
        }
        Ok(Self { resource })
    }

    pub fn resource(&self) -> ResourceMetadata {
        self.resource
    }

    fn resource_checker(&self, checker: &ScopeChecker) -> ScopeChecker {
        checker.access_mode(Access::ReadAccess).resource(self.resource)
    }

    /// Decide how a search through the global-level `checker` is restricted
    pub async fn plan(
        &self,
        checker: &ScopeChecker,
        cancel: &CancellationToken,
    ) -> Result<SearchPlan> {
        if self.resource_checker(checker).allowed(cancel).await? {
            return Ok(SearchPlan::Unfiltered);
        }
        if checker.needs_post_filtering() {
            return Ok(SearchPlan::PostFilter);
        }

        let tree = match checker.effective_access_scope(ResourceWithAccess::read(self.resource)) {
            Ok(tree) => tree,
            Err(SacError::NotSupported(reason)) => {
                debug!(resource = %self.resource, reason = %reason, "Falling back to post filtering");
                return Ok(SearchPlan::PostFilter);
            }
            Err(err) => return Err(err),
        };
        Ok(match build_sac_query_filter(Some(&tree), self.resource.scope, false)? {
            None => SearchPlan::Unfiltered,
            Some(Query::MatchNone) => SearchPlan::Empty,
            Some(filter) => SearchPlan::PreFilter(filter),
        })
    }

    /// Run `search` restricted to what `checker` grants
    pub async fn apply<T, F, Fut>(
        &self,
        checker: &ScopeChecker,
        query: Option<Query>,
        cancel: &CancellationToken,
        search: F,
    ) -> Result<Vec<T>>
    where
        T: ScopedResult,
        F: FnOnce(Option<Query>) -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        match self.plan(checker, cancel).await? {
            SearchPlan::Unfiltered => search(query).await,
            SearchPlan::Empty => Ok(Vec::new()),
            SearchPlan::PreFilter(filter) => {
                let query = match query {
                    Some(query) => Query::and(vec![query, filter]),
                    None => filter,
                };
                search(Some(query)).await
            }
            SearchPlan::PostFilter => {
                let results = search(query).await?;
                self.filter_results(&self.resource_checker(checker), results, cancel).await
            }
        }
    }

    fn result_checker<T: ScopedResult>(
        &self,
        resource_checker: &ScopeChecker,
        result: &T,
    ) -> Option<ScopeChecker> {
        let cluster = resource_checker.cluster_id(result.cluster_id()?);
        match (self.resource.scope, result.namespace()) {
            (ResourceScope::Namespace, Some(namespace)) => Some(cluster.namespace(namespace)),
            _ => Some(cluster),
        }
    }

    fn decide(checker: &ScopeChecker) -> TryAllowedResult {
        match checker.try_allowed() {
            Ok(decision) => decision,
            Err(err) => {
                checker.deny_on_error(err);
                TryAllowedResult::Deny
            }
        }
    }

    /// Keep the results `resource_checker` allows, preserving order
    pub async fn filter_results<T: ScopedResult>(
        &self,
        resource_checker: &ScopeChecker,
        results: Vec<T>,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        let mut decided = Vec::with_capacity(results.len());
        let mut unknown = 0;
        for result in results {
            let Some(checker) = self.result_checker(resource_checker, &result) else {
                continue;
            };
            let decision = Self::decide(&checker);
            if decision == TryAllowedResult::Unknown {
                unknown += 1;
            }
            decided.push((result, checker, decision));
        }

        if unknown > 0 {
            debug!(resource = %self.resource, unknown, "Resolving deferred result checks");
            resource_checker.perform_checks(cancel).await?;
        }

        let mut allowed = Vec::with_capacity(decided.len());
        let mut still_unknown = 0;
        for (result, checker, decision) in decided {
            let decision = match decision {
                TryAllowedResult::Unknown => Self::decide(&checker),
                decision => decision,
            };
            match decision {
                TryAllowedResult::Allow => allowed.push(result),
                TryAllowedResult::Deny => {}
                TryAllowedResult::Unknown => still_unknown += 1,
            }
        }

        if still_unknown > 0 {
            resource_checker.deny_on_error(SacError::internal(format!(
                "{} results still undecided after performing checks",
                still_unknown
            )));
        }
        Ok(allowed)
    }
}
