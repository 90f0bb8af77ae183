//! Per-authorizer memoization of effective access scope trees.
//!
//! Trees are keyed by access scope id. Lookups take the read lock; a miss is
//! computed outside any lock and stored under the write lock. Two racing
//! misses may both compute; the first stored tree wins. The empty id is a
//! valid key.

use crate::errors::Result;
use crate::observability::SacMetrics;
use crate::sac::effective_access_scope::ScopeTree;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, error};

#[derive(Debug, Default)]
pub struct EffectiveAccessScopeCache {
    trees: RwLock<HashMap<String, Arc<ScopeTree>>>,
    metrics: SacMetrics,
}

impl EffectiveAccessScopeCache {
    pub fn new(metrics: SacMetrics) -> Self {
        Self { trees: RwLock::new(HashMap::new()), metrics }
    }

    /// Cached tree for `access_scope_id`
    pub fn get(&self, access_scope_id: &str) -> Option<Arc<ScopeTree>> {
        match self.trees.read() {
            Ok(trees) => trees.get(access_scope_id).cloned(),
            Err(_) => {
                error!(access_scope_id, "Effective access scope cache lock poisoned");
                None
            }
        }
    }

    /// Store `tree` unless another tree was stored first; returns the stored one
    pub fn insert(&self, access_scope_id: &str, tree: ScopeTree) -> Arc<ScopeTree> {
        let tree = Arc::new(tree);
        match self.trees.write() {
            Ok(mut trees) => {
                trees.entry(access_scope_id.to_string()).or_insert_with(|| tree.clone()).clone()
            }
            Err(_) => {
                error!(access_scope_id, "Effective access scope cache lock poisoned");
                tree
            }
        }
    }

    /// Cached tree, computing and storing it on a miss
    pub fn get_or_compute<F>(&self, access_scope_id: &str, compute: F) -> Result<Arc<ScopeTree>>
    where
        F: FnOnce() -> Result<ScopeTree>,
    {
        if let Some(tree) = self.get(access_scope_id) {
            debug!(access_scope_id, "Effective access scope cache hit");
            self.metrics.record_cache_lookup(true);
            return Ok(tree);
        }

        debug!(access_scope_id, "Effective access scope cache miss");
        self.metrics.record_cache_lookup(false);
        let tree = compute()?;
        Ok(self.insert(access_scope_id, tree))
    }

    pub fn len(&self) -> usize {
        self.trees.read().map(|trees| trees.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
