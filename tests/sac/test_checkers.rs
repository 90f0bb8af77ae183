use crate::support::*;
use fleetscope::config::{InvariantPolicy, SacConfig};
use fleetscope::domain::{resources, Access, ResolvedRole, ResourceWithAccess, SimpleAccessScope};
use fleetscope::observability::SacMetrics;
use fleetscope::sac::checker::{or_checker, with_unrestricted_resource_read, CheckerRef};
use fleetscope::sac::{
    for_principal, for_resource, keys_for, BuiltinChecker, Detail, ScopeChecker, SearchHelper,
    SearchPlan, TryAllowedResult,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn config() -> SacConfig {
    SacConfig { strict_invariants: Some(false), ..Default::default() }
}

fn melange_reader() -> ResolvedRole {
    role(
        "melange-reader",
        &[(resources::DEPLOYMENT, Access::ReadAccess)],
        Some(SimpleAccessScope::new("melange", Some(namespace_labels("focus", &["melange"])))),
    )
}

fn earth_writer() -> ResolvedRole {
    role(
        "earth-writer",
        &[(resources::DEPLOYMENT, Access::ReadWriteAccess), (resources::NODE, Access::ReadAccess)],
        Some(SimpleAccessScope::new("earth", Some(clusters_by_name(&["Earth"])))),
    )
}

async fn session(roles: Vec<ResolvedRole>) -> ScopeChecker {
    for_principal(&directories("paul", roles), "paul", &config(), SacMetrics::disabled())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_unrestricted_scope_allows_unknown_cluster() {
    let checker = session(vec![role(
        "admin",
        &[(resources::CLUSTER, Access::ReadAccess)],
        Some(SimpleAccessScope::unrestricted()),
    )])
    .await;

    let resource = checker.access_mode(Access::ReadAccess).resource(resources::CLUSTER);
    assert_eq!(resource.try_allowed().unwrap(), TryAllowedResult::Allow);
    assert_eq!(
        resource.cluster_id("unknown-id").try_allowed().unwrap(),
        TryAllowedResult::Allow
    );
    assert_eq!(
        resource.cluster_id("unknown-id").namespace("anything").try_allowed().unwrap(),
        TryAllowedResult::Allow
    );
}

#[tokio::test]
async fn test_namespace_decisions_follow_roles() {
    let checker = session(vec![melange_reader(), earth_writer()]).await;
    let cancel = CancellationToken::new();

    let cases = [
        (Access::ReadAccess, ARRAKIS_ID, "Atreides", true),
        (Access::ReadAccess, ARRAKIS_ID, "Fremen", false),
        (Access::ReadAccess, EARTH_ID, "CERN", true),
        (Access::ReadWriteAccess, EARTH_ID, "CERN", true),
        (Access::ReadWriteAccess, ARRAKIS_ID, "Atreides", false),
        (Access::ReadAccess, "not.found", "Not Found", false),
    ];
    for (access, cluster, namespace, expected) in cases {
        let keys = keys_for(access, resources::DEPLOYMENT, Some(cluster), Some(namespace));
        assert_eq!(
            checker.allowed_keys(&cancel, &keys).await.unwrap(),
            expected,
            "{} {}::{}",
            access,
            cluster,
            namespace
        );
    }

    // no role grants alerts
    let alerts = keys_for(Access::ReadAccess, resources::ALERT, Some(EARTH_ID), None);
    assert!(!checker.allowed_keys(&cancel, &alerts).await.unwrap());
}

#[tokio::test]
async fn test_cluster_scoped_resource_on_partial_cluster() {
    let checker = session(vec![role(
        "node-reader",
        &[(resources::NODE, Access::ReadAccess)],
        Some(SimpleAccessScope::new("melange", Some(namespace_labels("focus", &["melange"])))),
    )])
    .await;

    let nodes = checker.access_mode(Access::ReadAccess).resource(resources::NODE);
    assert!(nodes.cluster_id(ARRAKIS_ID).try_is_allowed());
    assert!(!nodes.cluster_id(EARTH_ID).try_is_allowed());
    assert!(!nodes.try_is_allowed());
}

#[tokio::test]
async fn test_effective_access_scope_is_union_of_roles() {
    let checker = session(vec![melange_reader(), earth_writer()]).await;

    let read = checker
        .effective_access_scope(ResourceWithAccess::read(resources::DEPLOYMENT))
        .unwrap();
    assert_eq!(read.to_string(), "Arrakis::{Atreides, Harkonnen}, Earth::*");

    let write = checker
        .access_mode(Access::ReadWriteAccess)
        .effective_access_scope(ResourceWithAccess::read_write(resources::DEPLOYMENT))
        .unwrap();
    assert_eq!(write.to_string(), "Earth::*");

    let none = checker
        .effective_access_scope(ResourceWithAccess::read(resources::ALERT))
        .unwrap();
    assert!(none.is_deny_all());
}

#[tokio::test]
async fn test_search_plan_from_builtin_scope() {
    let checker = session(vec![melange_reader()]).await;
    let helper = SearchHelper::new(resources::DEPLOYMENT).unwrap();

    let SearchPlan::PreFilter(filter) =
        helper.plan(&checker, &CancellationToken::new()).await.unwrap()
    else {
        panic!("expected a pre-filter");
    };
    assert_eq!(
        filter.to_string(),
        "(Cluster ID:planet.arrakis AND (Namespace:Atreides OR Namespace:Harkonnen))"
    );
}

#[tokio::test]
async fn test_filter_accessible_namespaces_with_builtin() {
    let checker = session(vec![melange_reader(), earth_writer()]).await;
    let cancel = CancellationToken::new();

    let visible = for_resource(resources::DEPLOYMENT)
        .filter_accessible_namespaces(&checker, Access::ReadWriteAccess, namespaces(), &cancel)
        .await
        .unwrap();
    let names: Vec<&str> = visible.iter().map(|ns| ns.name.as_str()).collect();
    assert_eq!(names, vec!["Skunk Works", "Fraunhofer", "CERN", "JPL"]);

    assert!(!for_resource(resources::DEPLOYMENT).has_global_read(&checker, &cancel).await.unwrap());
}

#[tokio::test]
async fn test_full_access_override_composes_with_builtin() {
    let builtin = BuiltinChecker::new(
        vec![melange_reader()],
        fleet(),
        Detail::Minimal,
        SacMetrics::disabled(),
    );
    let core: CheckerRef = with_unrestricted_resource_read(Arc::new(builtin), resources::NODE);
    let checker = ScopeChecker::from_core(core).with_policy(InvariantPolicy::Deny);

    assert!(checker.access_mode(Access::ReadAccess).resource(resources::NODE).try_is_allowed());
    assert!(!checker
        .access_mode(Access::ReadWriteAccess)
        .resource(resources::NODE)
        .try_is_allowed());
    assert!(checker
        .access_mode(Access::ReadAccess)
        .resource(resources::DEPLOYMENT)
        .cluster_id(ARRAKIS_ID)
        .namespace("Harkonnen")
        .try_is_allowed());
}

#[tokio::test]
async fn test_or_of_builtin_sessions() {
    let melange = BuiltinChecker::new(
        vec![melange_reader()],
        fleet(),
        Detail::Minimal,
        SacMetrics::disabled(),
    );
    let earth =
        BuiltinChecker::new(vec![earth_writer()], fleet(), Detail::Minimal, SacMetrics::disabled());
    let checker = ScopeChecker::from_core(or_checker(vec![Arc::new(melange), Arc::new(earth)]))
        .with_policy(InvariantPolicy::Deny);

    let deployments = checker.access_mode(Access::ReadAccess).resource(resources::DEPLOYMENT);
    assert!(deployments.cluster_id(EARTH_ID).namespace("JPL").try_is_allowed());
    assert!(deployments.cluster_id(ARRAKIS_ID).namespace("Atreides").try_is_allowed());
    assert!(!deployments.cluster_id(ARRAKIS_ID).namespace("Fremen").try_is_allowed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checks_share_one_tree() {
    let builtin = BuiltinChecker::for_principal(
        &directories("paul", vec![melange_reader()]),
        "paul",
        Detail::Minimal,
        SacMetrics::disabled(),
    )
    .await
    .unwrap();
    let checker = ScopeChecker::from_core(Arc::new(builtin.clone()))
        .with_policy(InvariantPolicy::Deny)
        .access_mode(Access::ReadAccess)
        .resource(resources::DEPLOYMENT);

    let mut handles = Vec::new();
    for i in 0..64 {
        let checker = checker.clone();
        handles.push(tokio::spawn(async move {
            let (namespace, expected) =
                if i % 2 == 0 { ("Atreides", true) } else { ("Fremen", false) };
            let allowed = checker
                .cluster_id(ARRAKIS_ID)
                .namespace(namespace)
                .is_allowed(&CancellationToken::new())
                .await;
            (allowed, expected)
        }));
    }
    for handle in handles {
        let (allowed, expected) = handle.await.unwrap();
        assert_eq!(allowed, expected);
    }
    assert_eq!(builtin.cached_trees(), 1);
}
