//! Checker backed by an external authorization plugin.
//!
//! Decisions are made in two phases. `try_allowed` on an undecided node
//! registers the node's scope with the session and answers `Unknown`;
//! `perform_checks` then sends every registered scope to the plugin in
//! batched round-trips and records the answers on the nodes. Scopes the
//! plugin does not explicitly allow resolve to deny, as do all scopes of a
//! batch that failed, timed out or was cancelled.

use crate::config::PluginConfig;
use crate::domain::{Access, ResourceMetadata, ResourceWithAccess};
use crate::errors::{Result, SacError};
use crate::observability::SacMetrics;
use crate::sac::checker::{allow_all, CheckerRef, ScopeCheckerCore, TryAllowedResult};
use crate::sac::effective_access_scope::ScopeTree;
use crate::sac::scope_key::{OwnedScopeKey, ScopeKey, ScopeKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One scope sent to the plugin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginScope {
    pub verb: Access,
    pub noun: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Plugin answer for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginCheckResult {
    pub allowed: Vec<PluginScope>,
    pub denied: Vec<PluginScope>,
}

/// Client of the external authorization plugin
#[async_trait]
pub trait AuthzPluginClient: Send + Sync {
    /// Check a batch of scopes for `principal`
    async fn for_user(&self, principal: &str, scopes: Vec<PluginScope>)
        -> Result<PluginCheckResult>;
}

/// Plugin-backed checker for `principal`, rooted at the global level
pub fn plugin_scope_checker(
    client: Arc<dyn AuthzPluginClient>,
    principal: impl Into<String>,
    config: &PluginConfig,
    metrics: SacMetrics,
) -> CheckerRef {
    let session = Arc::new(PluginSession {
        client,
        principal: principal.into(),
        timeout: config.timeout(),
        max_batch_size: config.max_batch_size,
        metrics,
        pending: Mutex::new(Vec::new()),
    });
    PluginNode::new(session, ScopeKind::Global, ScopePath::default())
}

/// State shared by every node of one plugin checker hierarchy
struct PluginSession {
    client: Arc<dyn AuthzPluginClient>,
    principal: String,
    timeout: Duration,
    max_batch_size: usize,
    metrics: SacMetrics,
    pending: Mutex<Vec<Weak<PluginNode>>>,
}

impl PluginSession {
    fn take_pending(&self) -> Result<Vec<Arc<PluginNode>>> {
        let mut pending = self.pending.lock().map_err(poisoned)?;
        Ok(pending.drain(..).filter_map(|node| node.upgrade()).collect())
    }

    async fn round_trip(
        &self,
        scopes: Vec<PluginScope>,
        cancel: &CancellationToken,
    ) -> Result<PluginCheckResult> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SacError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.client.for_user(&self.principal, scopes)) => {
                match result {
                    Ok(result) => result,
                    Err(_) => Err(SacError::plugin(format!(
                        "no answer within {}ms",
                        self.timeout.as_millis()
                    ))),
                }
            }
        }
    }
}

/// Keys collected while descending
#[derive(Debug, Clone, Default)]
struct ScopePath {
    access: Option<Access>,
    resource: Option<ResourceMetadata>,
    cluster_id: Option<String>,
    namespace: Option<String>,
}

impl ScopePath {
    fn child(&self, key: ScopeKey<'_>) -> Self {
        let mut path = self.clone();
        match key {
            ScopeKey::AccessMode(access) => path.access = Some(access),
            ScopeKey::Resource(resource) => path.resource = Some(resource),
            ScopeKey::Cluster(id) => path.cluster_id = Some(id.to_string()),
            ScopeKey::Namespace(ns) => path.namespace = Some(ns.to_string()),
        }
        path
    }

    /// The plugin only decides from the resource level down
    fn plugin_scope(&self) -> Option<PluginScope> {
        Some(PluginScope {
            verb: self.access?,
            noun: self.resource?.resource.to_string(),
            cluster_id: self.cluster_id.clone(),
            namespace: self.namespace.clone(),
        })
    }
}

#[derive(Default)]
struct NodeState {
    decision: Option<bool>,
    registered: bool,
    children: HashMap<OwnedScopeKey, Arc<PluginNode>>,
}

struct PluginNode {
    session: Arc<PluginSession>,
    kind: ScopeKind,
    path: ScopePath,
    state: RwLock<NodeState>,
    this: Weak<PluginNode>,
}

impl fmt::Debug for PluginNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginNode")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("principal", &self.session.principal)
            .finish()
    }
}

impl PluginNode {
    fn new(session: Arc<PluginSession>, kind: ScopeKind, path: ScopePath) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            session,
            kind,
            path,
            state: RwLock::new(NodeState::default()),
            this: this.clone(),
        })
    }

    fn resolve(&self, allowed: bool) -> Result<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.decision = Some(allowed);
        if allowed {
            state.children.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl ScopeCheckerCore for PluginNode {
    fn sub_scope_checker(&self, key: ScopeKey<'_>) -> Result<CheckerRef> {
        if self.kind.next() != Some(key.kind()) {
            return Err(SacError::unexpected_key(self.kind, key));
        }

        let owned = key.to_owned_key();
        {
            let state = self.state.read().map_err(poisoned)?;
            if state.decision == Some(true) {
                return Ok(allow_all());
            }
            if let Some(child) = state.children.get(&owned) {
                return Ok(child.clone());
            }
        }

        let mut state = self.state.write().map_err(poisoned)?;
        if state.decision == Some(true) {
            return Ok(allow_all());
        }
        let child = state
            .children
            .entry(owned)
            .or_insert_with(|| {
                PluginNode::new(self.session.clone(), key.kind(), self.path.child(key))
            })
            .clone();
        Ok(child)
    }

    fn try_allowed(&self) -> Result<TryAllowedResult> {
        if self.path.plugin_scope().is_none() {
            return Ok(TryAllowedResult::Deny);
        }
        if let Some(decision) = self.state.read().map_err(poisoned)?.decision {
            return Ok(TryAllowedResult::from_bool(decision));
        }

        let mut state = self.state.write().map_err(poisoned)?;
        if let Some(decision) = state.decision {
            return Ok(TryAllowedResult::from_bool(decision));
        }
        if !state.registered {
            state.registered = true;
            self.session.pending.lock().map_err(poisoned)?.push(self.this.clone());
        }
        Ok(TryAllowedResult::Unknown)
    }

    async fn perform_checks(&self, cancel: &CancellationToken) -> Result<()> {
        let pending = self.session.take_pending()?;
        if pending.is_empty() {
            return Ok(());
        }

        let mut errors = Vec::new();
        for batch in pending.chunks(self.session.max_batch_size.max(1)) {
            let scopes: Vec<PluginScope> =
                batch.iter().filter_map(|node| node.path.plugin_scope()).collect();
            let batch_size = scopes.len();

            let allowed: HashSet<PluginScope> = match self.session.round_trip(scopes, cancel).await
            {
                Ok(result) => {
                    self.session.metrics.record_plugin_batch(batch_size, true);
                    debug!(
                        principal = %self.session.principal,
                        batch_size,
                        allowed = result.allowed.len(),
                        denied = result.denied.len(),
                        "Authorization plugin batch resolved"
                    );
                    result.allowed.into_iter().collect()
                }
                Err(err) => {
                    self.session.metrics.record_plugin_batch(batch_size, false);
                    warn!(
                        principal = %self.session.principal,
                        batch_size,
                        error = %err,
                        "Authorization plugin batch failed, denying its scopes"
                    );
                    errors.push(err);
                    HashSet::new()
                }
            };

            for node in batch {
                let decision =
                    node.path.plugin_scope().is_some_and(|scope| allowed.contains(&scope));
                node.resolve(decision)?;
            }
        }

        match SacError::combine(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn effective_access_scope(&self, resource: ResourceWithAccess) -> Result<ScopeTree> {
        Err(SacError::not_supported(format!(
            "effective access scope of {} through an authorization plugin",
            resource
        )))
    }

    fn needs_post_filtering(&self) -> bool {
        true
    }
}

fn poisoned<T>(_: PoisonError<T>) -> SacError {
    SacError::internal("authorization plugin checker lock poisoned")
}
