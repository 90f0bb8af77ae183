use crate::support::*;
use async_trait::async_trait;
use fleetscope::config::{PluginConfig, SacConfig};
use fleetscope::domain::{resources, Access, NamespaceMetadata};
use fleetscope::errors::Result;
use fleetscope::observability::SacMetrics;
use fleetscope::sac::plugin::{AuthzPluginClient, PluginCheckResult, PluginScope};
use fleetscope::sac::{for_resource, with_plugin, SearchHelper, SearchPlan};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Allows reads of namespaces labeled `focus=melange`
struct MelangePlugin {
    namespaces: Vec<NamespaceMetadata>,
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl MelangePlugin {
    fn new() -> Self {
        Self { namespaces: namespaces(), calls: AtomicUsize::new(0), batch_sizes: Mutex::new(Vec::new()) }
    }

    fn allows(&self, scope: &PluginScope) -> bool {
        if scope.verb != Access::ReadAccess {
            return false;
        }
        let (Some(cluster_id), Some(namespace)) = (&scope.cluster_id, &scope.namespace) else {
            return false;
        };
        self.namespaces.iter().any(|ns| {
            &ns.cluster_id == cluster_id
                && &ns.name == namespace
                && ns.labels.get("focus").map(String::as_str) == Some("melange")
        })
    }
}

#[async_trait]
impl AuthzPluginClient for MelangePlugin {
    async fn for_user(&self, principal: &str, scopes: Vec<PluginScope>) -> Result<PluginCheckResult> {
        assert_eq!(principal, "leto");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(scopes.len());
        let (allowed, denied) = scopes.into_iter().partition(|scope| self.allows(scope));
        Ok(PluginCheckResult { allowed, denied })
    }
}

fn config(max_batch_size: usize) -> SacConfig {
    SacConfig {
        strict_invariants: Some(false),
        plugin: PluginConfig { max_batch_size, ..Default::default() },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_search_results_are_post_filtered_in_batches() {
    let plugin = Arc::new(MelangePlugin::new());
    let checker = with_plugin(plugin.clone(), "leto", &config(3), SacMetrics::disabled());
    let helper = SearchHelper::new(resources::NAMESPACE).unwrap();
    let cancel = CancellationToken::new();

    assert_eq!(helper.plan(&checker, &cancel).await.unwrap(), SearchPlan::PostFilter);
    let before = plugin.calls.load(Ordering::SeqCst);

    let visible = helper
        .apply(&checker, None, &cancel, |_| async { Ok(namespaces()) })
        .await
        .unwrap();
    let names: Vec<&str> = visible.iter().map(|ns| ns.name.as_str()).collect();
    assert_eq!(names, vec!["Atreides", "Harkonnen"]);

    // the resource level was already decided, ten namespaces in batches of three
    assert_eq!(plugin.calls.load(Ordering::SeqCst) - before, 4);
    let sizes = plugin.batch_sizes.lock().unwrap().clone();
    assert!(sizes.iter().all(|&size| size <= 3));
}

#[tokio::test]
async fn test_filter_accessible_namespaces_falls_back_to_plugin() {
    let plugin = Arc::new(MelangePlugin::new());
    let checker = with_plugin(plugin.clone(), "leto", &config(100), SacMetrics::disabled());
    let cancel = CancellationToken::new();

    let visible = for_resource(resources::DEPLOYMENT)
        .filter_accessible_namespaces(&checker, Access::ReadAccess, namespaces(), &cancel)
        .await
        .unwrap();
    assert_eq!(visible.len(), 2);
    // resource level, then one batch for every namespace
    assert_eq!(plugin.calls.load(Ordering::SeqCst), 2);

    let writable = for_resource(resources::DEPLOYMENT)
        .filter_accessible_namespaces(&checker, Access::ReadWriteAccess, namespaces(), &cancel)
        .await
        .unwrap();
    assert!(writable.is_empty());
}

#[tokio::test]
async fn test_cancelled_session_denies() {
    let plugin = Arc::new(MelangePlugin::new());
    let checker = with_plugin(plugin.clone(), "leto", &config(100), SacMetrics::disabled());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let atreides = checker
        .access_mode(Access::ReadAccess)
        .resource(resources::DEPLOYMENT)
        .cluster_id(ARRAKIS_ID)
        .namespace("Atreides");
    assert!(!atreides.is_allowed(&cancel).await);
    assert_eq!(plugin.calls.load(Ordering::SeqCst), 0);
}
