//! Shared fleet fixture: two planets, nine namespaces and one namespace
//! whose cluster is missing from the cluster directory.

#![allow(dead_code)]

use fleetscope::domain::{
    Access, Cluster, NamespaceMetadata, PermissionSet, ResolvedRole, ResourceMetadata,
    SelectorOperator, SelectorRequirement, SetBasedLabelSelector, SimpleAccessScope,
    SimpleAccessScopeRules,
};
use fleetscope::sac::{Directories, FleetSnapshot, StaticDirectory};

pub const EARTH_ID: &str = "planet.earth";
pub const ARRAKIS_ID: &str = "planet.arrakis";

pub fn earth() -> Cluster {
    Cluster::new(EARTH_ID, "Earth")
}

pub fn arrakis() -> Cluster {
    Cluster::new(ARRAKIS_ID, "Arrakis").with_labels([("focus", "melange")])
}

pub fn clusters() -> Vec<Cluster> {
    vec![earth(), arrakis()]
}

pub fn namespaces() -> Vec<NamespaceMetadata> {
    let earth = earth();
    let arrakis = arrakis();
    let missing = Cluster::new("not.found", "Not Found");
    vec![
        NamespaceMetadata::new("lab.skunkworks", "Skunk Works", &earth).with_labels([
            ("focus", "transportation"),
            ("region", "NA"),
            ("clearance", "yes"),
        ]),
        NamespaceMetadata::new("lab.fraunhofer", "Fraunhofer", &earth).with_labels([
            ("focus", "applied_research"),
            ("region", "EU"),
            ("clearance", "no"),
            ("founded", "1949"),
        ]),
        NamespaceMetadata::new("lab.cern", "CERN", &earth)
            .with_labels([("focus", "physics"), ("region", "EU")]),
        NamespaceMetadata::new("lab.jpl", "JPL", &earth)
            .with_labels([("focus", "applied_research"), ("region", "NA")]),
        NamespaceMetadata::new("house.atreides", "Atreides", &arrakis)
            .with_labels([("focus", "melange"), ("homeworld", "Caladan")]),
        NamespaceMetadata::new("house.harkonnen", "Harkonnen", &arrakis)
            .with_labels([("focus", "melange")]),
        NamespaceMetadata::new("org.spacingguild", "Spacing Guild", &arrakis).with_labels([
            ("focus", "transportation"),
            ("region", "dune_universe"),
            ("depend-on", "melange"),
        ]),
        NamespaceMetadata::new("org.benegesserit", "Bene Gesserit", &arrakis)
            .with_labels([("region", "dune_universe"), ("alias", "witches")]),
        NamespaceMetadata::new("tribe.fremen", "Fremen", &arrakis),
        NamespaceMetadata::new("not.found", "Not Found", &missing).with_labels([("code", "404")]),
    ]
}

pub fn fleet() -> FleetSnapshot {
    FleetSnapshot::new(clusters(), namespaces())
}

pub fn selector(key: &str, op: SelectorOperator, values: &[&str]) -> SetBasedLabelSelector {
    SetBasedLabelSelector::new(vec![SelectorRequirement::new(key, op, values.iter().copied())])
}

pub fn namespace_labels(key: &str, values: &[&str]) -> SimpleAccessScopeRules {
    SimpleAccessScopeRules {
        namespace_label_selectors: vec![selector(key, SelectorOperator::In, values)],
        ..Default::default()
    }
}

pub fn clusters_by_name(names: &[&str]) -> SimpleAccessScopeRules {
    SimpleAccessScopeRules {
        included_clusters: names.iter().map(|n| n.to_string()).collect(),
        ..Default::default()
    }
}

pub fn role(
    name: &str,
    grants: &[(ResourceMetadata, Access)],
    scope: Option<SimpleAccessScope>,
) -> ResolvedRole {
    let permissions = grants
        .iter()
        .fold(PermissionSet::new(format!("{}-permissions", name)), |ps, (resource, access)| {
            ps.grant(resource, *access)
        });
    ResolvedRole::new(name, permissions, scope)
}

pub fn directories(principal: &str, roles: Vec<ResolvedRole>) -> Directories {
    Directories::from_static(StaticDirectory::new(fleet()).with_roles(principal, roles))
}
