//! Effective access scope computation.

use super::tree::{ClusterNode, Detail, NamespaceNode, NodeAttributes, ScopeState, ScopeTree};
use crate::domain::{Cluster, NamespaceMetadata, SelectorOperator, SimpleAccessScopeRules};
use crate::errors::Result;
use crate::sac::labels::{
    augmented_cluster_labels, augmented_namespace_labels, convert_selectors, match_labels,
    namespace_fqsn, Requirement, Selector, FQSN_LABEL_KEY,
};
use tracing::warn;

/// Compute the effective access scope of `rules` over a cluster and
/// namespace snapshot.
///
/// Missing rules yield a fully excluded tree. A namespace whose cluster is
/// included is included without evaluating namespace selectors. A namespace
/// that references an unknown cluster is hosted under a synthesized excluded
/// cluster node carrying only the cluster name. When names repeat, the last
/// cluster or namespace processed wins.
///
/// # Errors
///
/// Returns [`crate::errors::SacError::SelectorComputation`] when a label
/// selector in `rules` is malformed.
pub fn compute_effective_access_scope(
    rules: Option<&SimpleAccessScopeRules>,
    clusters: &[Cluster],
    namespaces: &[NamespaceMetadata],
    detail: Detail,
) -> Result<ScopeTree> {
    let (cluster_selectors, namespace_selectors) = match rules {
        Some(rules) => (cluster_selectors(rules)?, namespace_selectors(rules)?),
        None => (Vec::new(), Vec::new()),
    };

    let mut tree = ScopeTree::new(ScopeState::Excluded);

    for cluster in clusters {
        let state = match_labels(&cluster_selectors, &augmented_cluster_labels(cluster));
        if let Some(previous) = tree.clusters.get(&cluster.name) {
            warn!(
                cluster_name = %cluster.name,
                previous_id = %previous.attributes.id,
                cluster_id = %cluster.id,
                "duplicate cluster name, keeping the last one"
            );
            let previous_id = previous.attributes.id.clone();
            tree.cluster_id_to_name.remove(&previous_id);
        }
        tree.insert_cluster(
            cluster.name.clone(),
            ClusterNode::new(
                state,
                NodeAttributes::new(cluster.id.clone(), cluster.name.clone(), cluster.labels.clone()),
            ),
        );
    }

    for namespace in namespaces {
        let parent = tree.clusters.entry(namespace.cluster_name.clone()).or_insert_with(|| {
            warn!(
                namespace = %namespace.name,
                cluster_name = %namespace.cluster_name,
                cluster_id = %namespace.cluster_id,
                "namespace references an unknown cluster"
            );
            ClusterNode::new(
                ScopeState::Excluded,
                NodeAttributes { name: namespace.cluster_name.clone(), ..Default::default() },
            )
        });

        let state = if parent.state == ScopeState::Included {
            ScopeState::Included
        } else {
            match_labels(&namespace_selectors, &augmented_namespace_labels(namespace))
        };

        if parent.namespaces.contains_key(&namespace.name) {
            warn!(
                namespace = %namespace.name,
                cluster_name = %namespace.cluster_name,
                "duplicate namespace name, keeping the last one"
            );
        }
        parent.namespaces.insert(
            namespace.name.clone(),
            NamespaceNode::new(
                state,
                NodeAttributes::new(
                    namespace.id.clone(),
                    namespace.name.clone(),
                    namespace.labels.clone(),
                ),
            ),
        );
    }

    tree.bubble_up();
    tree.populate_attributes_and_prune(detail);
    Ok(tree)
}

fn cluster_selectors(rules: &SimpleAccessScopeRules) -> Result<Vec<Selector>> {
    let mut selectors = convert_selectors(&rules.cluster_label_selectors)?;
    if !rules.included_clusters.is_empty() {
        selectors.push(Selector::new(vec![Requirement::new_unvalidated(
            FQSN_LABEL_KEY,
            SelectorOperator::In,
            rules.included_clusters.iter().cloned(),
        )]));
    }
    Ok(selectors)
}

fn namespace_selectors(rules: &SimpleAccessScopeRules) -> Result<Vec<Selector>> {
    let mut selectors = convert_selectors(&rules.namespace_label_selectors)?;
    if !rules.included_namespaces.is_empty() {
        selectors.push(Selector::new(vec![Requirement::new_unvalidated(
            FQSN_LABEL_KEY,
            SelectorOperator::In,
            rules
                .included_namespaces
                .iter()
                .map(|rule| namespace_fqsn(&rule.cluster_name, &rule.namespace_name)),
        )]));
    }
    Ok(selectors)
}
