//! Union of effective access scope trees.

use super::tree::{Detail, ScopeState, ScopeTree};

impl ScopeTree {
    /// Union `other` into `self`.
    ///
    /// An included root or cluster on either side wins. For clusters that are
    /// partial on both sides only included namespaces of `other` are added.
    /// Nodes taken from `other` are cloned. The result is always reduced to
    /// [`Detail::Minimal`].
    pub fn merge(&mut self, other: &ScopeTree) {
        if self.state == ScopeState::Included || other.state == ScopeState::Included {
            *self = ScopeTree::unrestricted();
            return;
        }

        for (name, theirs) in &other.clusters {
            if theirs.state == ScopeState::Excluded {
                continue;
            }

            if theirs.state == ScopeState::Included || !self.clusters.contains_key(name) {
                self.insert_cluster(name.clone(), theirs.clone());
                continue;
            }
            let Some(ours) = self.clusters.get_mut(name) else {
                continue;
            };
            if ours.state == ScopeState::Included {
                continue;
            }

            ours.state = ScopeState::Partial;
            for (ns_name, ns) in &theirs.namespaces {
                if ns.state == ScopeState::Included {
                    ours.namespaces.insert(ns_name.clone(), ns.clone());
                }
            }
        }

        self.bubble_up();
        self.populate_attributes_and_prune(Detail::Minimal);
    }

    /// Union of all `trees`; a deny-all tree when empty
    pub fn merge_all<'a>(trees: impl IntoIterator<Item = &'a ScopeTree>) -> ScopeTree {
        let mut merged = ScopeTree::deny_all();
        for tree in trees {
            merged.merge(tree);
            if merged.is_unrestricted() {
                break;
            }
        }
        merged
    }
}
