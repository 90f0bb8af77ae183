//! Effective access scope tree.
//!
//! A [`ScopeTree`] records, for one set of access scope rules, which clusters
//! and namespaces of the fleet are included. Every node carries a tri-state
//! [`ScopeState`]. A cluster is `Partial` when it is not included itself but
//! at least one of its namespaces is; the root is `Partial` when at least one
//! cluster is `Included` or `Partial`. An `Included` root means unrestricted
//! access and its cluster map is irrelevant.

use crate::domain::{Labels, ResourceScope};
use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Tri-state inclusion, ordered `Excluded < Partial < Included`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScopeState {
    Excluded,
    Partial,
    Included,
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScopeState::Excluded => "Excluded",
            ScopeState::Partial => "Partial",
            ScopeState::Included => "Included",
        };
        f.write_str(s)
    }
}

/// Attribute richness of computed trees.
///
/// `Minimal` keeps only ids and prunes excluded nodes, `Standard` adds names,
/// `High` adds labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Detail {
    #[serde(alias = "minimal")]
    Minimal,
    #[default]
    #[serde(alias = "standard")]
    Standard,
    #[serde(alias = "high")]
    High,
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Detail::Minimal => "MINIMAL",
            Detail::Standard => "STANDARD",
            Detail::High => "HIGH",
        };
        f.write_str(s)
    }
}

impl FromStr for Detail {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(Detail::Minimal),
            "standard" => Ok(Detail::Standard),
            "high" => Ok(Detail::High),
            other => Err(format!("unknown detail level '{}'", other)),
        }
    }
}

/// Identity and labels of a tree node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttributes {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

impl NodeAttributes {
    pub fn new(id: impl Into<String>, name: impl Into<String>, labels: Labels) -> Self {
        Self { id: id.into(), name: name.into(), labels }
    }

    pub fn id_only(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    fn reduce_to(&mut self, detail: Detail) {
        match detail {
            Detail::High => {}
            Detail::Standard => self.labels.clear(),
            Detail::Minimal => {
                self.name.clear();
                self.labels.clear();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceNode {
    pub state: ScopeState,
    #[serde(default)]
    pub attributes: NodeAttributes,
}

impl NamespaceNode {
    pub fn new(state: ScopeState, attributes: NodeAttributes) -> Self {
        Self { state, attributes }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub state: ScopeState,
    #[serde(default)]
    pub namespaces: HashMap<String, NamespaceNode>,
    #[serde(default)]
    pub attributes: NodeAttributes,
}

impl ClusterNode {
    pub fn new(state: ScopeState, attributes: NodeAttributes) -> Self {
        Self { state, namespaces: HashMap::new(), attributes }
    }

    pub fn with_namespace(mut self, name: impl Into<String>, node: NamespaceNode) -> Self {
        self.namespaces.insert(name.into(), node);
        self
    }

    /// State of a namespace, treating an `Included` cluster as covering all of them
    pub fn namespace_state(&self, namespace: &str) -> ScopeState {
        if self.state == ScopeState::Included {
            return ScopeState::Included;
        }
        self.namespaces.get(namespace).map(|ns| ns.state).unwrap_or(ScopeState::Excluded)
    }

    /// Names of included namespaces, sorted
    pub fn included_namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .namespaces
            .iter()
            .filter(|(_, ns)| ns.state == ScopeState::Included)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

/// The effective access scope of one rule set over one fleet snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeTree {
    pub state: ScopeState,
    /// Cluster nodes keyed by cluster name
    pub clusters: HashMap<String, ClusterNode>,
    #[serde(skip)]
    pub(crate) cluster_id_to_name: HashMap<String, String>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::deny_all()
    }
}

impl ScopeTree {
    pub fn new(state: ScopeState) -> Self {
        Self { state, clusters: HashMap::new(), cluster_id_to_name: HashMap::new() }
    }

    /// Tree granting every cluster and namespace
    pub fn unrestricted() -> Self {
        Self::new(ScopeState::Included)
    }

    /// Tree granting nothing
    pub fn deny_all() -> Self {
        Self::new(ScopeState::Excluded)
    }

    /// Insert a cluster node under `name`, indexing it by its id attribute
    pub fn with_cluster(mut self, name: impl Into<String>, node: ClusterNode) -> Self {
        self.insert_cluster(name.into(), node);
        self
    }

    pub(crate) fn insert_cluster(&mut self, name: String, node: ClusterNode) {
        if !node.attributes.id.is_empty() {
            self.cluster_id_to_name.insert(node.attributes.id.clone(), name.clone());
        }
        self.clusters.insert(name, node);
    }

    /// Build a minimal tree from included cluster ids and, per cluster id,
    /// included namespace names. Nodes are keyed by id.
    pub fn from_clusters_and_namespaces_map(
        included_clusters: &[String],
        included_namespaces: &HashMap<String, Vec<String>>,
    ) -> Self {
        let mut tree = Self::new(ScopeState::Excluded);

        for cluster_id in included_clusters {
            tree.insert_cluster(
                cluster_id.clone(),
                ClusterNode::new(ScopeState::Included, NodeAttributes::id_only(cluster_id.clone())),
            );
        }

        for (cluster_id, namespaces) in included_namespaces {
            if namespaces.is_empty() {
                continue;
            }
            if tree.clusters.get(cluster_id).is_some_and(|c| c.state == ScopeState::Included) {
                continue;
            }
            let mut node =
                ClusterNode::new(ScopeState::Partial, NodeAttributes::id_only(cluster_id.clone()));
            for namespace in namespaces {
                node.namespaces.insert(
                    namespace.clone(),
                    NamespaceNode::new(
                        ScopeState::Included,
                        NodeAttributes::id_only(namespace.clone()),
                    ),
                );
            }
            tree.insert_cluster(cluster_id.clone(), node);
        }

        tree.bubble_up();
        tree
    }

    pub fn is_unrestricted(&self) -> bool {
        self.state == ScopeState::Included
    }

    pub fn is_deny_all(&self) -> bool {
        self.state == ScopeState::Excluded
    }

    pub fn get_cluster(&self, name: &str) -> Option<&ClusterNode> {
        self.clusters.get(name)
    }

    /// Cluster node for a cluster id, `None` when unknown or pruned
    pub fn get_cluster_by_id(&self, cluster_id: &str) -> Option<&ClusterNode> {
        self.cluster_id_to_name.get(cluster_id).and_then(|name| self.clusters.get(name))
    }

    /// Ids of all indexed clusters, sorted
    pub fn get_cluster_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.cluster_id_to_name.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Effective state of a namespace addressed by cluster id
    pub fn namespace_state(&self, cluster_id: &str, namespace: &str) -> ScopeState {
        match self.state {
            ScopeState::Included => ScopeState::Included,
            ScopeState::Excluded => ScopeState::Excluded,
            ScopeState::Partial => self
                .get_cluster_by_id(cluster_id)
                .map(|c| c.namespace_state(namespace))
                .unwrap_or(ScopeState::Excluded),
        }
    }

    /// Whether a resource of `scope` is granted in `cluster_id` and, for
    /// namespace scoped resources, `namespace`.
    ///
    /// Cluster scoped resources are granted on any cluster that is not
    /// excluded. Globally scoped resources follow the root state only.
    pub fn grants(&self, scope: ResourceScope, cluster_id: &str, namespace: Option<&str>) -> bool {
        match (self.state, scope) {
            (ScopeState::Included, _) => return true,
            (ScopeState::Excluded, _) | (_, ResourceScope::Global) => return false,
            (ScopeState::Partial, _) => {}
        }
        let Some(cluster) = self.get_cluster_by_id(cluster_id) else {
            return false;
        };
        match (cluster.state, scope) {
            (ScopeState::Included, _) => true,
            (ScopeState::Excluded, _) => false,
            (ScopeState::Partial, ResourceScope::Cluster) => true,
            (ScopeState::Partial, _) => {
                namespace.is_some_and(|ns| cluster.namespace_state(ns) == ScopeState::Included)
            }
        }
    }

    /// Raise excluded nodes to `Partial` when they have non-excluded children
    pub(crate) fn bubble_up(&mut self) {
        let mut any_cluster_included = false;
        for cluster in self.clusters.values_mut() {
            if cluster.state == ScopeState::Excluded
                && cluster.namespaces.values().any(|ns| ns.state != ScopeState::Excluded)
            {
                cluster.state = ScopeState::Partial;
            }
            any_cluster_included |= cluster.state != ScopeState::Excluded;
        }
        if self.state == ScopeState::Excluded && any_cluster_included {
            self.state = ScopeState::Partial;
        }
    }

    /// Reduce node attributes to `detail` and, at `Minimal`, drop nodes that
    /// carry no information.
    pub(crate) fn populate_attributes_and_prune(&mut self, detail: Detail) {
        if detail == Detail::Minimal {
            self.clusters.retain(|_, cluster| cluster.state != ScopeState::Excluded);
        }
        for cluster in self.clusters.values_mut() {
            cluster.attributes.reduce_to(detail);
            if detail == Detail::Minimal {
                match cluster.state {
                    ScopeState::Included => cluster.namespaces.clear(),
                    _ => cluster.namespaces.retain(|_, ns| ns.state != ScopeState::Excluded),
                }
            }
            for ns in cluster.namespaces.values_mut() {
                ns.attributes.reduce_to(detail);
            }
        }
    }

    /// Collapse the tree into cluster name to included namespace names.
    ///
    /// An included cluster maps to `["*"]`, an unrestricted tree to
    /// `{"*": ["*"]}` and a deny-all tree to an empty map.
    pub fn compactify(&self) -> ScopeTreeCompacted {
        let mut compacted = BTreeMap::new();
        match self.state {
            ScopeState::Included => {
                compacted.insert(WILDCARD.to_string(), vec![WILDCARD.to_string()]);
            }
            ScopeState::Excluded => {}
            ScopeState::Partial => {
                for (name, cluster) in &self.clusters {
                    match cluster.state {
                        ScopeState::Included => {
                            compacted.insert(name.clone(), vec![WILDCARD.to_string()]);
                        }
                        ScopeState::Partial => {
                            compacted.insert(name.clone(), cluster.included_namespaces());
                        }
                        ScopeState::Excluded => {}
                    }
                }
            }
        }
        ScopeTreeCompacted(compacted)
    }

    /// JSON form of the compacted tree
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.compactify())?)
    }
}

impl fmt::Display for ScopeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.compactify().fmt(f)
    }
}

const WILDCARD: &str = "*";

/// Compacted, order-stable view of a [`ScopeTree`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeTreeCompacted(pub BTreeMap<String, Vec<String>>);

impl fmt::Display for ScopeTreeCompacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (cluster, namespaces) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            if namespaces.len() == 1 {
                write!(f, "{}::{}", cluster, namespaces[0])?;
            } else {
                write!(f, "{}::{{{}}}", cluster, namespaces.join(", "))?;
            }
        }
        Ok(())
    }
}
