use crate::support::*;
use fleetscope::domain::{
    resources, Access, NamespaceRule, ResourceScope, SelectorOperator, SetBasedLabelSelector,
    SimpleAccessScope, SimpleAccessScopeRules,
};
use fleetscope::observability::SacMetrics;
use fleetscope::sac::{
    compute_effective_access_scope, BuiltinChecker, Detail, ScopeChecker, ScopeState, ScopeTree,
    ScopeTreeCompacted,
};
use proptest::prelude::*;
use proptest::sample::subsequence;
use std::sync::Arc;

fn cluster_names() -> Vec<String> {
    ["Earth", "Arrakis", "Caladan"].iter().map(|s| s.to_string()).collect()
}

fn namespace_rules() -> Vec<NamespaceRule> {
    let mut rules: Vec<NamespaceRule> =
        namespaces().iter().map(|ns| NamespaceRule::new(&ns.cluster_name, &ns.name)).collect();
    rules.push(NamespaceRule::new("Caladan", "Castle"));
    rules
}

fn namespace_selectors() -> Vec<SetBasedLabelSelector> {
    vec![
        selector("focus", SelectorOperator::In, &["melange"]),
        selector("focus", SelectorOperator::NotIn, &["physics"]),
        selector("region", SelectorOperator::In, &["EU", "NA"]),
        selector("clearance", SelectorOperator::Exists, &[]),
        selector("founded", SelectorOperator::NotExists, &[]),
        SetBasedLabelSelector::default(),
    ]
}

fn cluster_selectors() -> Vec<SetBasedLabelSelector> {
    vec![
        selector("focus", SelectorOperator::In, &["melange"]),
        selector("focus", SelectorOperator::NotExists, &[]),
    ]
}

prop_compose! {
    fn arb_rules()(
        included_clusters in subsequence(cluster_names(), 0..=2),
        included_namespaces in subsequence(namespace_rules(), 0..=4),
        cluster_label_selectors in subsequence(cluster_selectors(), 0..=1),
        namespace_label_selectors in subsequence(namespace_selectors(), 0..=2),
    ) -> SimpleAccessScopeRules {
        SimpleAccessScopeRules {
            included_clusters,
            included_namespaces,
            cluster_label_selectors,
            namespace_label_selectors,
        }
    }
}

fn arb_detail() -> impl Strategy<Value = Detail> {
    prop_oneof![Just(Detail::Minimal), Just(Detail::Standard), Just(Detail::High)]
}

fn compute(rules: &SimpleAccessScopeRules, detail: Detail) -> ScopeTree {
    compute_effective_access_scope(Some(rules), &clusters(), &namespaces(), detail).unwrap()
}

fn union(a: &SimpleAccessScopeRules, b: &SimpleAccessScopeRules) -> SimpleAccessScopeRules {
    let mut merged = a.clone();
    merged.included_clusters.extend(b.included_clusters.iter().cloned());
    merged.included_namespaces.extend(b.included_namespaces.iter().cloned());
    merged.cluster_label_selectors.extend(b.cluster_label_selectors.iter().cloned());
    merged.namespace_label_selectors.extend(b.namespace_label_selectors.iter().cloned());
    merged
}

fn granted_namespaces(tree: &ScopeTree) -> Vec<(String, String)> {
    namespaces()
        .into_iter()
        .filter(|ns| tree.grants(ResourceScope::Namespace, &ns.cluster_id, Some(&ns.name)))
        .map(|ns| (ns.cluster_id, ns.name))
        .collect()
}

proptest! {
    #[test]
    fn states_bubble_up(rules in arb_rules(), detail in arb_detail()) {
        let tree = compute(&rules, detail);
        let mut any_cluster = false;
        for cluster in tree.clusters.values() {
            let any_namespace = cluster.namespaces.values().any(|ns| ns.state != ScopeState::Excluded);
            match cluster.state {
                ScopeState::Included => {
                    prop_assert!(cluster.namespaces.values().all(|ns| ns.state == ScopeState::Included));
                }
                ScopeState::Partial => prop_assert!(any_namespace),
                ScopeState::Excluded => prop_assert!(!any_namespace),
            }
            any_cluster |= cluster.state != ScopeState::Excluded;
        }
        prop_assert_eq!(tree.state == ScopeState::Partial, any_cluster);
        prop_assert_ne!(tree.state, ScopeState::Included);
    }

    #[test]
    fn detail_does_not_change_decisions(rules in arb_rules()) {
        let minimal = compute(&rules, Detail::Minimal);
        let high = compute(&rules, Detail::High);
        prop_assert_eq!(minimal.compactify(), high.compactify());
        prop_assert_eq!(granted_namespaces(&minimal), granted_namespaces(&high));
        prop_assert!(minimal.clusters.values().all(|c| c.state != ScopeState::Excluded));
    }

    #[test]
    fn adding_rules_never_removes_access(a in arb_rules(), b in arb_rules()) {
        let before = granted_namespaces(&compute(&a, Detail::Minimal));
        let after = granted_namespaces(&compute(&union(&a, &b), Detail::Minimal));
        for granted in &before {
            prop_assert!(after.contains(granted), "{:?} lost", granted);
        }
    }

    #[test]
    fn merge_matches_union_of_rules(a in arb_rules(), b in arb_rules(), detail in arb_detail()) {
        let mut merged = compute(&a, detail);
        merged.merge(&compute(&b, detail));
        let expected = compute(&union(&a, &b), Detail::Minimal);
        prop_assert_eq!(merged.compactify(), expected.compactify());
        prop_assert_eq!(granted_namespaces(&merged), granted_namespaces(&expected));
    }

    #[test]
    fn merge_is_commutative_and_idempotent(a in arb_rules(), b in arb_rules()) {
        let ta = compute(&a, Detail::High);
        let tb = compute(&b, Detail::High);

        let ab = ScopeTree::merge_all([&ta, &tb]);
        let ba = ScopeTree::merge_all([&tb, &ta]);
        prop_assert_eq!(ab.compactify(), ba.compactify());

        let aa = ScopeTree::merge_all([&ta, &ta]);
        prop_assert_eq!(aa.compactify(), ta.compactify());
        prop_assert!(aa.clusters.values().all(|c| c.attributes.labels.is_empty()));
    }

    #[test]
    fn json_form_parses_back_to_compacted(rules in arb_rules(), detail in arb_detail()) {
        let tree = compute(&rules, detail);
        let parsed: ScopeTreeCompacted = serde_json::from_str(&tree.to_json().unwrap()).unwrap();
        prop_assert_eq!(parsed, tree.compactify());
    }

    #[test]
    fn compute_is_deterministic(rules in arb_rules(), detail in arb_detail()) {
        let first = compute(&rules, detail);
        let second = compute(&rules, detail);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn checker_descent_agrees_with_tree(rules in arb_rules()) {
        let tree = compute(&rules, Detail::Minimal);
        let role = role(
            "prop",
            &[(resources::DEPLOYMENT, Access::ReadAccess)],
            Some(SimpleAccessScope::new("prop-scope", Some(rules))),
        );
        let checker = tokio_test::block_on(BuiltinChecker::for_principal(
            &directories("duncan", vec![role]),
            "duncan",
            Detail::Minimal,
            SacMetrics::disabled(),
        ))
        .unwrap();
        let deployments = ScopeChecker::from_core(Arc::new(checker))
            .access_mode(Access::ReadAccess)
            .resource(resources::DEPLOYMENT);

        for ns in namespaces() {
            let allowed = deployments.cluster_id(&ns.cluster_id).namespace(&ns.name).try_is_allowed();
            prop_assert_eq!(
                allowed,
                tree.grants(ResourceScope::Namespace, &ns.cluster_id, Some(&ns.name)),
                "{}::{}", ns.cluster_name, ns.name
            );
        }
    }
}
