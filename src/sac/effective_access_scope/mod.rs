//! Effective access scope: the materialized inclusion tree of one rule set
//! over the fleet's clusters and namespaces.

mod algebra;
pub mod compute;
pub mod tree;

pub use compute::compute_effective_access_scope;
pub use tree::{
    ClusterNode, Detail, NamespaceNode, NodeAttributes, ScopeState, ScopeTree, ScopeTreeCompacted,
};
