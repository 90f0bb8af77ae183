use crate::support::*;
use fleetscope::domain::{
    Cluster, NamespaceRule, SelectorOperator, SelectorRequirement, SetBasedLabelSelector,
    SimpleAccessScopeRules,
};
use fleetscope::errors::SacError;
use fleetscope::sac::effective_access_scope::NodeAttributes;
use fleetscope::sac::{compute_effective_access_scope, Detail, ScopeState, ScopeTree};

fn compute(rules: Option<&SimpleAccessScopeRules>, detail: Detail) -> ScopeTree {
    compute_effective_access_scope(rules, &clusters(), &namespaces(), detail).unwrap()
}

fn assert_scope(rules: &SimpleAccessScopeRules, expected: &str) {
    for detail in [Detail::Minimal, Detail::Standard, Detail::High] {
        let tree = compute(Some(rules), detail);
        assert_eq!(tree.to_string(), expected, "detail {}", detail);
    }
}

#[test]
fn test_missing_rules_exclude_everything() {
    let tree = compute(None, Detail::High);
    assert_eq!(tree.state, ScopeState::Excluded);
    assert!(tree.clusters.values().all(|c| c.state == ScopeState::Excluded));
    assert!(tree
        .clusters
        .values()
        .flat_map(|c| c.namespaces.values())
        .all(|ns| ns.state == ScopeState::Excluded));
    assert_eq!(tree.to_string(), "");
    assert_eq!(tree.to_json().unwrap(), "{}");
}

#[test]
fn test_empty_rules_and_empty_selector_exclude_everything() {
    let empty = SimpleAccessScopeRules::default();
    assert_eq!(compute(Some(&empty), Detail::High).state, ScopeState::Excluded);

    let empty_selector = SimpleAccessScopeRules {
        namespace_label_selectors: vec![Default::default()],
        ..Default::default()
    };
    let tree = compute(Some(&empty_selector), Detail::High);
    assert_eq!(tree.state, ScopeState::Excluded);
    assert_eq!(tree.to_json().unwrap(), "{}");
}

#[test]
fn test_cluster_included_by_name() {
    let tree = compute(Some(&clusters_by_name(&["Arrakis"])), Detail::High);

    assert_eq!(tree.state, ScopeState::Partial);
    let arrakis = tree.get_cluster("Arrakis").unwrap();
    assert_eq!(arrakis.state, ScopeState::Included);
    assert_eq!(arrakis.namespaces.len(), 5);
    assert!(arrakis.namespaces.values().all(|ns| ns.state == ScopeState::Included));

    let earth = tree.get_cluster("Earth").unwrap();
    assert_eq!(earth.state, ScopeState::Excluded);
    assert_eq!(earth.namespaces.len(), 4);
    assert!(earth.namespaces.values().all(|ns| ns.state == ScopeState::Excluded));

    assert_eq!(tree.to_string(), "Arrakis::*");
    assert_eq!(tree.to_json().unwrap(), r#"{"Arrakis":["*"]}"#);
}

#[test]
fn test_cluster_included_by_label_at_minimal_detail() {
    let rules = SimpleAccessScopeRules {
        cluster_label_selectors: vec![selector("focus", SelectorOperator::In, &["melange"])],
        ..Default::default()
    };
    let tree = compute(Some(&rules), Detail::Minimal);

    assert_eq!(tree.to_string(), "Arrakis::*");
    assert_eq!(tree.clusters.len(), 1);
    let arrakis = tree.get_cluster("Arrakis").unwrap();
    assert!(arrakis.namespaces.is_empty());
    assert_eq!(arrakis.attributes, NodeAttributes::id_only(ARRAKIS_ID));
    assert_eq!(tree.get_cluster_ids(), vec![ARRAKIS_ID.to_string()]);
}

#[test]
fn test_namespace_included_by_name() {
    let rules = SimpleAccessScopeRules {
        included_namespaces: vec![NamespaceRule::new("Arrakis", "Atreides")],
        ..Default::default()
    };
    let tree = compute(Some(&rules), Detail::High);

    let arrakis = tree.get_cluster("Arrakis").unwrap();
    assert_eq!(arrakis.state, ScopeState::Partial);
    assert_eq!(arrakis.included_namespaces(), vec!["Atreides".to_string()]);
    assert_eq!(tree.get_cluster("Earth").unwrap().state, ScopeState::Excluded);
    assert_eq!(tree.to_json().unwrap(), r#"{"Arrakis":["Atreides"]}"#);
}

#[test]
fn test_namespaces_included_by_label() {
    let tree = compute(Some(&namespace_labels("focus", &["melange"])), Detail::High);

    assert_eq!(tree.state, ScopeState::Partial);
    let arrakis = tree.get_cluster("Arrakis").unwrap();
    assert_eq!(arrakis.state, ScopeState::Partial);
    assert_eq!(
        arrakis.included_namespaces(),
        vec!["Atreides".to_string(), "Harkonnen".to_string()]
    );
    assert_eq!(tree.get_cluster("Earth").unwrap().state, ScopeState::Excluded);
    assert_eq!(tree.to_string(), "Arrakis::{Atreides, Harkonnen}");
    assert_eq!(tree.to_json().unwrap(), r#"{"Arrakis":["Atreides","Harkonnen"]}"#);
}

#[test]
fn test_label_inclusion_across_clusters() {
    assert_scope(
        &namespace_labels("focus", &["transportation"]),
        "Arrakis::Spacing Guild, Earth::Skunk Works",
    );
}

#[test]
fn test_requirements_are_anded_and_values_ored() {
    let rules = SimpleAccessScopeRules {
        namespace_label_selectors: vec![SetBasedLabelSelector::new(vec![
            SelectorRequirement::new(
                "focus",
                SelectorOperator::In,
                ["transportation", "applied_research"],
            ),
            SelectorRequirement::new(
                "region",
                SelectorOperator::In,
                ["NA", "dune_universe"],
            ),
        ])],
        ..Default::default()
    };
    assert_scope(&rules, "Arrakis::Spacing Guild, Earth::{JPL, Skunk Works}");
}

#[test]
fn test_exists_not_exists_and_not_in() {
    let rules = SimpleAccessScopeRules {
        namespace_label_selectors: vec![SetBasedLabelSelector::new(vec![
            SelectorRequirement::new(
                "focus",
                SelectorOperator::NotIn,
                ["physics", "melange"],
            ),
            SelectorRequirement::new(
                "clearance",
                SelectorOperator::Exists,
                Vec::<String>::new(),
            ),
            SelectorRequirement::new(
                "founded",
                SelectorOperator::NotExists,
                Vec::<String>::new(),
            ),
        ])],
        ..Default::default()
    };
    assert_scope(&rules, "Earth::Skunk Works");
}

#[test]
fn test_selectors_are_ored() {
    let rules = SimpleAccessScopeRules {
        namespace_label_selectors: vec![
            SetBasedLabelSelector::new(vec![
                SelectorRequirement::new(
                    "focus",
                    SelectorOperator::In,
                    ["transportation"],
                ),
                SelectorRequirement::new("region", SelectorOperator::In, ["NA"]),
            ]),
            selector("region", SelectorOperator::In, &["EU"]),
            selector("founded", SelectorOperator::In, &["1949"]),
        ],
        ..Default::default()
    };
    assert_scope(&rules, "Earth::{CERN, Fraunhofer, Skunk Works}");
}

#[test]
fn test_rule_kinds_are_ored() {
    let rules = SimpleAccessScopeRules {
        included_namespaces: vec![NamespaceRule::new("Earth", "Skunk Works")],
        cluster_label_selectors: vec![selector("focus", SelectorOperator::In, &["melange"])],
        namespace_label_selectors: vec![selector("region", SelectorOperator::In, &["EU"])],
        ..Default::default()
    };
    let tree = compute(Some(&rules), Detail::High);
    assert_eq!(tree.to_string(), "Arrakis::*, Earth::{CERN, Fraunhofer, Skunk Works}");
    assert_eq!(
        tree.to_json().unwrap(),
        r#"{"Arrakis":["*"],"Earth":["CERN","Fraunhofer","Skunk Works"]}"#
    );
    // every namespace of an included cluster is included
    assert!(tree
        .get_cluster("Arrakis")
        .unwrap()
        .namespaces
        .values()
        .all(|ns| ns.state == ScopeState::Included));
}

#[test]
fn test_detail_levels_shape_attributes() {
    let rules = namespace_labels("focus", &["melange"]);

    let minimal = compute(Some(&rules), Detail::Minimal);
    assert_eq!(minimal.clusters.len(), 1);
    let arrakis = minimal.get_cluster("Arrakis").unwrap();
    assert_eq!(arrakis.namespaces.len(), 2);
    assert_eq!(arrakis.attributes, NodeAttributes::id_only(ARRAKIS_ID));
    assert_eq!(
        arrakis.namespaces["Atreides"].attributes,
        NodeAttributes::id_only("house.atreides")
    );

    let standard = compute(Some(&rules), Detail::Standard);
    assert_eq!(standard.clusters.len(), 3);
    let arrakis = standard.get_cluster("Arrakis").unwrap();
    assert_eq!(arrakis.namespaces.len(), 5);
    assert_eq!(arrakis.attributes.name, "Arrakis");
    assert!(arrakis.attributes.labels.is_empty());

    let high = compute(Some(&rules), Detail::High);
    let arrakis = high.get_cluster("Arrakis").unwrap();
    assert_eq!(arrakis.attributes.labels.get("focus").map(String::as_str), Some("melange"));
    assert_eq!(
        arrakis.namespaces["Atreides"].attributes.labels.get("homeworld").map(String::as_str),
        Some("Caladan")
    );
}

#[test]
fn test_namespace_with_unknown_cluster_is_hosted_under_excluded_node() {
    let tree = compute(Some(&clusters_by_name(&["Arrakis"])), Detail::Standard);

    let missing = tree.get_cluster("Not Found").unwrap();
    assert_eq!(missing.state, ScopeState::Excluded);
    assert_eq!(missing.attributes.name, "Not Found");
    assert!(missing.attributes.id.is_empty());
    assert_eq!(missing.namespaces["Not Found"].state, ScopeState::Excluded);
    assert!(tree.get_cluster_by_id("not.found").is_none());
}

#[test]
fn test_including_unknown_cluster_by_name_does_not_include_it() {
    // the synthesized node never runs through cluster selectors
    let tree = compute(Some(&clusters_by_name(&["Not Found"])), Detail::Standard);
    assert_eq!(tree.state, ScopeState::Excluded);
}

#[test]
fn test_invalid_selectors_are_rejected() {
    let cluster_rules = SimpleAccessScopeRules {
        cluster_label_selectors: vec![selector("", SelectorOperator::In, &["melange"])],
        ..Default::default()
    };
    let namespace_rules = SimpleAccessScopeRules {
        namespace_label_selectors: vec![selector("", SelectorOperator::In, &["melange"])],
        ..Default::default()
    };
    for rules in [cluster_rules, namespace_rules] {
        let result = compute_effective_access_scope(
            Some(&rules),
            &clusters(),
            &namespaces(),
            Detail::High,
        );
        assert!(matches!(result, Err(SacError::SelectorComputation { .. })));
    }
}

#[test]
fn test_inputs_are_not_mutated() {
    let fleet_clusters = clusters();
    let fleet_namespaces = namespaces();
    let rules = namespace_labels("focus", &["melange"]);

    compute_effective_access_scope(Some(&rules), &fleet_clusters, &fleet_namespaces, Detail::High)
        .unwrap();

    assert_eq!(fleet_clusters, clusters());
    assert_eq!(fleet_namespaces, namespaces());
}

#[test]
fn test_duplicate_cluster_name_keeps_last() {
    let first = Cluster::new("first.id", "Twin");
    let second = Cluster::new("second.id", "Twin").with_labels([("keep", "me")]);
    let rules = SimpleAccessScopeRules {
        cluster_label_selectors: vec![selector("keep", SelectorOperator::Exists, &[])],
        ..Default::default()
    };
    let tree =
        compute_effective_access_scope(Some(&rules), &[first, second], &[], Detail::Minimal)
            .unwrap();

    assert_eq!(tree.get_cluster_ids(), vec!["second.id".to_string()]);
    assert_eq!(tree.get_cluster("Twin").unwrap().state, ScopeState::Included);
}

#[test]
fn test_merge_of_computed_trees() {
    let melange = compute(Some(&namespace_labels("focus", &["melange"])), Detail::High);
    let earth = compute(Some(&clusters_by_name(&["Earth"])), Detail::High);

    let merged = ScopeTree::merge_all([&melange, &earth]);
    assert_eq!(merged.to_string(), "Arrakis::{Atreides, Harkonnen}, Earth::*");
    assert!(merged
        .clusters
        .values()
        .all(|c| c.attributes.name.is_empty() && c.attributes.labels.is_empty()));

    let unrestricted = ScopeTree::merge_all([&melange, &ScopeTree::unrestricted()]);
    assert!(unrestricted.is_unrestricted());
    assert!(ScopeTree::merge_all(std::iter::empty()).is_deny_all());
}
