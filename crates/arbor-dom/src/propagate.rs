//! Moving subtrees between domains

use std::sync::{Arc, Weak};

use crate::domain::Domain;
use crate::node::Node;

/// Rewrites the domain of every node in a subtree
pub(crate) struct DomainPropagator;

impl DomainPropagator {
    /// Point every node under `subtree_root` at `new_domain`
    ///
    /// The caller must hold write locks on both the old and the new domain.
    /// Nodes are visited in document order with an explicit stack. Each node
    /// loses its wire id and cached output, and gets a fresh hierarchy
    /// position. With `detach`, the subtree root is also unlinked from its
    /// parent and marked as detached. Returns the number of nodes visited.
    pub(crate) fn reassign(subtree_root: &Node, new_domain: &Arc<Domain>, detach: bool) -> usize {
        let previous = subtree_root.domain_id();
        let mut stack = vec![subtree_root.clone()];
        let mut visited = 0usize;

        while let Some(node) = stack.pop() {
            let mut state = node.state();
            state.domain = Arc::clone(new_domain);
            state.hierarchy_position = new_domain.hierarchy_position();
            state.wire_id = None;
            state.open_form = None;
            state.rendered = None;
            if detach && visited == 0 {
                state.parent = Weak::new();
                state.ever_detached = true;
            }
            stack.extend(state.children.iter().rev().cloned());
            visited += 1;
        }

        tracing::debug!(
            from = %previous,
            to = %new_domain.id(),
            nodes = visited,
            detach,
            "subtree reassigned"
        );
        visited
    }
}
