//! Structural and content mutation
//!
//! Every operation follows the same shape: lock all involved domains through
//! the [`LockCoordinator`], validate with the locks held, commit, bump the
//! generation of every held domain, then notify listeners before the locks
//! are released. Validation failures leave the tree untouched.

use std::collections::HashSet;
use std::sync::Arc;

use crate::coordinator::{LockCoordinator, LockSet};
use crate::domain::Domain;
use crate::listener::{self, ChangeSink, MutationEvent, StructureListener};
use crate::node::{Node, NodeId, validate_attribute_name};
use crate::propagate::DomainPropagator;
use crate::TreeError;

/// Where an attached node goes among its new siblings
enum Position<'a> {
    End,
    Before(&'a Node),
    After(&'a Node),
}

/// Link `child` under `parent`, unlinking it from any previous parent
///
/// Moves the child's subtree into the parent's domain when they differ.
/// Returns the previous parent.
fn attach(parent: &Node, child: &Node, position: Position<'_>) -> Option<Node> {
    let previous = child.parent_unlocked();
    if let Some(old) = &previous {
        old.state().children.shift_remove(child);
    }

    let parent_domain = {
        let mut state = parent.state();
        let index = match position {
            Position::End => None,
            Position::Before(anchor) => state.children.get_index_of(anchor),
            Position::After(anchor) => state.children.get_index_of(anchor).map(|i| i + 1),
        };
        match index {
            Some(index) => {
                state.children.shift_insert(index, child.clone());
            }
            None => {
                state.children.insert(child.clone());
            }
        }
        Arc::clone(&state.domain)
    };

    let moves_domain = {
        let mut state = child.state();
        state.parent = Arc::downgrade(&parent.0);
        !Arc::ptr_eq(&state.domain, &parent_domain)
    };
    if moves_domain {
        DomainPropagator::reassign(child, &parent_domain, false);
    }
    previous
}

/// Unlink `child` from `parent` and give its subtree a fresh domain
fn detach_from(parent: &Node, child: &Node, locks: &mut LockSet) {
    parent.state().children.shift_remove(child);
    let domain = Domain::new(Arc::downgrade(&child.0));
    locks.adopt(Arc::clone(&domain));
    DomainPropagator::reassign(child, &domain, true);
}

/// Reject duplicate arguments and insertions that would create a cycle
///
/// A node can only be an ancestor of `parent` if it shares `parent`'s
/// domain, so the parent chain is walked only for such nodes.
fn validate_insertion(parent: &Node, nodes: &[Node]) -> Result<(), TreeError> {
    if !parent.is_element() {
        return Err(TreeError::NotAnElement);
    }

    let mut seen: HashSet<NodeId> = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !seen.insert(node.id()) {
            return Err(TreeError::DuplicateNode);
        }
    }
    if seen.contains(&parent.id()) {
        return Err(TreeError::Cycle);
    }

    let domain = parent.domain_id();
    if !nodes.iter().any(|n| n.domain_id() == domain) {
        return Ok(());
    }
    let mut cursor = parent.parent_unlocked();
    while let Some(ancestor) = cursor {
        if seen.contains(&ancestor.id()) {
            return Err(TreeError::Cycle);
        }
        cursor = ancestor.parent_unlocked();
    }
    Ok(())
}

/// Bump every held domain and notify the listeners of `domain`
fn commit(locks: &LockSet, domain: &Domain, events: &[MutationEvent]) {
    for held in locks.domains() {
        held.bump_generation();
    }
    for event in events {
        tracing::trace!(domain = %domain.id(), event = event.kind(), target = event.target().id().value(), "mutation committed");
    }
    listener::dispatch(domain, events);
}

impl Node {
    /// Append `child` as the last child
    ///
    /// Returns `Ok(false)` if it already is a child of this node. A child of
    /// another parent is moved.
    pub fn append_child(&self, child: &Node) -> Result<bool, TreeError> {
        let locks = LockCoordinator::acquire(self, std::slice::from_ref(child));
        if child.parent_unlocked().as_ref() == Some(self) {
            return Ok(false);
        }
        validate_insertion(self, std::slice::from_ref(child))?;

        let event = match attach(self, child, Position::End) {
            Some(previous_parent) => MutationEvent::ChildMoved {
                previous_parent,
                parent: self.clone(),
                child: child.clone(),
            },
            None => MutationEvent::ChildAppended {
                parent: self.clone(),
                child: child.clone(),
            },
        };
        commit(&locks, &self.domain(), &[event]);
        Ok(true)
    }

    /// Append several children at once
    ///
    /// Nodes that already are children of this node stay where they are.
    pub fn append_children(&self, children: &[Node]) -> Result<(), TreeError> {
        if children.is_empty() {
            return Ok(());
        }
        let locks = LockCoordinator::acquire(self, children);
        validate_insertion(self, children)?;

        let mut appended = Vec::with_capacity(children.len());
        let mut previous_parents = Vec::with_capacity(children.len());
        for child in children {
            if child.parent_unlocked().as_ref() == Some(self) {
                continue;
            }
            previous_parents.push(attach(self, child, Position::End));
            appended.push(child.clone());
        }
        if appended.is_empty() {
            return Ok(());
        }

        let event = MutationEvent::ChildrenAppended {
            parent: self.clone(),
            children: appended,
            previous_parents,
        };
        commit(&locks, &self.domain(), &[event]);
        Ok(())
    }

    /// Insert `nodes`, in order, directly before this node
    pub fn insert_before(&self, nodes: &[Node]) -> Result<bool, TreeError> {
        self.insert_sibling(nodes, true)
    }

    /// Insert `nodes`, in order, directly after this node
    pub fn insert_after(&self, nodes: &[Node]) -> Result<bool, TreeError> {
        self.insert_sibling(nodes, false)
    }

    /// Like [`insert_before`](Self::insert_before) but `false` on a root
    pub fn insert_before_if_attached(&self, nodes: &[Node]) -> Result<bool, TreeError> {
        match self.insert_before(nodes) {
            Err(TreeError::NoParent) => Ok(false),
            other => other,
        }
    }

    /// Like [`insert_after`](Self::insert_after) but `false` on a root
    pub fn insert_after_if_attached(&self, nodes: &[Node]) -> Result<bool, TreeError> {
        match self.insert_after(nodes) {
            Err(TreeError::NoParent) => Ok(false),
            other => other,
        }
    }

    fn insert_sibling(&self, nodes: &[Node], before: bool) -> Result<bool, TreeError> {
        let locks = LockCoordinator::acquire(self, nodes);
        let parent = self.parent_unlocked().ok_or(TreeError::NoParent)?;
        if nodes.contains(self) {
            return Err(TreeError::SelfInsertion);
        }
        if nodes.is_empty() {
            return Ok(false);
        }
        validate_insertion(&parent, nodes)?;

        let mut anchor = self.clone();
        for node in nodes {
            if before {
                attach(&parent, node, Position::Before(self));
            } else {
                attach(&parent, node, Position::After(&anchor));
                anchor = node.clone();
            }
        }

        let event = if before {
            MutationEvent::InsertedBefore {
                parent: parent.clone(),
                target: self.clone(),
                inserted: nodes.to_vec(),
            }
        } else {
            MutationEvent::InsertedAfter {
                parent: parent.clone(),
                target: self.clone(),
                inserted: nodes.to_vec(),
            }
        };
        commit(&locks, &parent.domain(), &[event]);
        Ok(true)
    }

    /// Replace this node in its parent with `nodes`
    ///
    /// This node ends up detached in a domain of its own.
    pub fn replace_with(&self, nodes: &[Node]) -> Result<bool, TreeError> {
        let mut locks = LockCoordinator::acquire(self, nodes);
        let parent = self.parent_unlocked().ok_or(TreeError::NoParent)?;
        if nodes.contains(self) {
            return Err(TreeError::SelfInsertion);
        }
        validate_insertion(&parent, nodes)?;

        let mut anchor = self.clone();
        for node in nodes {
            attach(&parent, node, Position::After(&anchor));
            anchor = node.clone();
        }
        detach_from(&parent, self, &mut locks);

        let event = MutationEvent::Replaced {
            parent: parent.clone(),
            replaced: self.clone(),
            replacements: nodes.to_vec(),
        };
        commit(&locks, &parent.domain(), &[event]);
        Ok(true)
    }

    /// Like [`replace_with`](Self::replace_with) but `false` on a root
    pub fn replace_with_if_attached(&self, nodes: &[Node]) -> Result<bool, TreeError> {
        match self.replace_with(nodes) {
            Err(TreeError::NoParent) => Ok(false),
            other => other,
        }
    }

    /// Detach `child` if it is a child of this node
    pub fn remove_child(&self, child: &Node) -> bool {
        let mut locks = LockCoordinator::acquire(self, &[]);
        if child.parent_unlocked().as_ref() != Some(self) {
            return false;
        }
        detach_from(self, child, &mut locks);

        let event = MutationEvent::ChildRemoved {
            parent: self.clone(),
            child: child.clone(),
        };
        commit(&locks, &self.domain(), &[event]);
        true
    }

    /// Detach every listed node that is a child of this node
    pub fn remove_children(&self, children: &[Node]) -> bool {
        let mut locks = LockCoordinator::acquire(self, &[]);
        let mut events = Vec::new();
        for child in children {
            if child.parent_unlocked().as_ref() != Some(self) {
                continue;
            }
            detach_from(self, child, &mut locks);
            events.push(MutationEvent::ChildRemoved {
                parent: self.clone(),
                child: child.clone(),
            });
        }
        if events.is_empty() {
            return false;
        }
        commit(&locks, &self.domain(), &events);
        true
    }

    /// Detach all children; returns how many were removed
    pub fn remove_all_children(&self) -> usize {
        let mut locks = LockCoordinator::acquire(self, &[]);
        let children: Vec<Node> = self.state().children.iter().cloned().collect();
        if children.is_empty() {
            return 0;
        }
        for child in &children {
            detach_from(self, child, &mut locks);
        }

        let removed = children.len();
        let event = MutationEvent::AllChildrenRemoved {
            parent: self.clone(),
            children,
        };
        commit(&locks, &self.domain(), &[event]);
        removed
    }

    /// Detach this node from its parent
    ///
    /// Returns `false` for a root.
    pub fn detach(&self) -> bool {
        let mut locks = LockCoordinator::acquire(self, &[]);
        let Some(parent) = self.parent_unlocked() else {
            return false;
        };
        detach_from(&parent, self, &mut locks);

        let event = MutationEvent::ChildRemoved {
            parent: parent.clone(),
            child: self.clone(),
        };
        commit(&locks, &parent.domain(), &[event]);
        true
    }

    /// Replace all children with `inner`
    pub fn add_inner(&self, inner: &Node) -> Result<(), TreeError> {
        let mut locks = LockCoordinator::acquire(self, std::slice::from_ref(inner));
        validate_insertion(self, std::slice::from_ref(inner))?;

        let children: Vec<Node> = self.state().children.iter().cloned().collect();
        for child in &children {
            detach_from(self, child, &mut locks);
        }
        attach(self, inner, Position::End);

        let event = MutationEvent::InnerReplaced {
            parent: self.clone(),
            inner: inner.clone(),
        };
        commit(&locks, &self.domain(), &[event]);
        Ok(())
    }

    /// Set one attribute, replacing any previous value
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), TreeError> {
        self.add_attributes(&[(name, value)])
    }

    /// Set several attributes in one mutation
    pub fn add_attributes(&self, attributes: &[(&str, &str)]) -> Result<(), TreeError> {
        for (name, _) in attributes {
            validate_attribute_name(name)?;
        }
        let locks = LockCoordinator::acquire(self, &[]);
        {
            let mut state = self.state();
            let element = state.content.as_element_mut().ok_or(TreeError::NotAnElement)?;
            for (name, value) in attributes {
                element.set_attribute(name, value);
            }
            state.open_form = None;
        }

        let event = MutationEvent::AttributesAdded {
            node: self.clone(),
            names: attributes.iter().map(|(n, _)| n.to_string()).collect(),
        };
        commit(&locks, &self.domain(), &[event]);
        Ok(())
    }

    /// Remove the named attributes; `Ok(false)` if none were present
    pub fn remove_attributes(&self, names: &[&str]) -> Result<bool, TreeError> {
        let locks = LockCoordinator::acquire(self, &[]);
        let removed: Vec<String> = {
            let mut state = self.state();
            let element = state.content.as_element_mut().ok_or(TreeError::NotAnElement)?;
            let removed = names
                .iter()
                .filter(|name| element.remove_attribute(name))
                .map(|name| name.to_string())
                .collect::<Vec<_>>();
            if !removed.is_empty() {
                state.open_form = None;
            }
            removed
        };
        if removed.is_empty() {
            return Ok(false);
        }

        let event = MutationEvent::AttributesRemoved {
            node: self.clone(),
            names: removed,
        };
        commit(&locks, &self.domain(), &[event]);
        Ok(true)
    }

    /// Replace a leaf's text, keeping its kind
    pub fn set_text(&self, content: &str) -> Result<(), TreeError> {
        self.update_leaf(content, None)
    }

    /// Replace a leaf's text and mark it as html
    pub fn set_html(&self, content: &str) -> Result<(), TreeError> {
        self.update_leaf(content, Some(true))
    }

    /// Replace a leaf's text and kind
    pub fn set_leaf_content(&self, content: &str, is_html: bool) -> Result<(), TreeError> {
        self.update_leaf(content, Some(is_html))
    }

    fn update_leaf(&self, content: &str, is_html: Option<bool>) -> Result<(), TreeError> {
        let locks = LockCoordinator::acquire(self, &[]);
        {
            let mut state = self.state();
            let leaf = state.content.as_leaf_mut().ok_or(TreeError::NotALeaf)?;
            leaf.text.clear();
            leaf.text.push_str(content);
            if let Some(is_html) = is_html {
                leaf.is_html = is_html;
            }
            state.open_form = None;
        }

        let event = MutationEvent::ContentChanged { node: self.clone() };
        commit(&locks, &self.domain(), &[event]);
        Ok(())
    }

    /// Register a listener on this node's current domain
    ///
    /// The listener stays with the domain: it is discarded if the domain is
    /// absorbed into another one, and detached subtrees start without it.
    pub fn add_structure_listener(&self, listener: Arc<dyn StructureListener>) {
        let _locks = LockCoordinator::acquire(self, &[]);
        self.domain().add_listener(listener);
    }

    pub fn remove_structure_listener(&self, listener: &Arc<dyn StructureListener>) -> bool {
        let _locks = LockCoordinator::acquire(self, &[]);
        self.domain().remove_listener(listener)
    }

    /// Install or clear the change sink of this node's current domain
    pub fn set_change_sink(&self, sink: Option<Arc<dyn ChangeSink>>) {
        let _locks = LockCoordinator::acquire(self, &[]);
        self.domain().set_sink(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn element(name: &str) -> Node {
        Node::element(name, &[]).unwrap()
    }

    fn names(nodes: &[Node]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| n.name().or_else(|| n.leaf_text()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_append_joins_parent_domain() {
        let parent = element("div");
        let child = element("span");
        let grandchild = Node::text("x");
        child.append_child(&grandchild).unwrap();

        assert!(parent.append_child(&child).unwrap());
        assert_eq!(child.domain_id(), parent.domain_id());
        assert_eq!(grandchild.domain_id(), parent.domain_id());
        assert_eq!(child.parent(), Some(parent.clone()));
        assert!(parent.is_consistent());
    }

    #[test]
    fn test_append_existing_child_is_noop() {
        let parent = element("div");
        let child = Node::text("x");
        assert!(parent.append_child(&child).unwrap());
        let generation = parent.domain().generation();
        assert!(!parent.append_child(&child).unwrap());
        assert_eq!(parent.domain().generation(), generation);
        assert_eq!(parent.child_count(), 1);
    }

    #[test]
    fn test_move_between_parents() {
        let a = element("a");
        let b = element("b");
        let child = element("i");
        a.append_child(&child).unwrap();
        b.append_child(&child).unwrap();
        assert_eq!(a.child_count(), 0);
        assert_eq!(b.children(), vec![child.clone()]);
        assert_eq!(child.domain_id(), b.domain_id());
    }

    #[test]
    fn test_cycle_rejected() {
        let outer = element("div");
        let inner = element("span");
        outer.append_child(&inner).unwrap();
        assert_eq!(inner.append_child(&outer), Err(TreeError::Cycle));
        assert_eq!(inner.append_child(&inner), Err(TreeError::Cycle));
        assert_eq!(outer.children(), vec![inner.clone()]);
    }

    #[test]
    fn test_leaf_cannot_have_children() {
        let leaf = Node::text("x");
        let child = Node::text("y");
        assert_eq!(leaf.append_child(&child), Err(TreeError::NotAnElement));
    }

    #[test]
    fn test_insert_before_and_after_keep_order() {
        let parent = element("ul");
        let middle = element("m");
        parent.append_child(&middle).unwrap();

        let (a, b) = (element("a"), element("b"));
        let (c, d) = (element("c"), element("d"));
        assert!(middle.insert_before(&[a.clone(), b.clone()]).unwrap());
        assert!(middle.insert_after(&[c.clone(), d.clone()]).unwrap());

        assert_eq!(names(&parent.children()), vec!["a", "b", "m", "c", "d"]);
        assert_eq!(middle.previous_sibling(), Some(b));
        assert_eq!(middle.next_sibling(), Some(c));
    }

    #[test]
    fn test_insert_on_root() {
        let root = element("div");
        let other = element("p");
        assert_eq!(root.insert_before(&[other.clone()]), Err(TreeError::NoParent));
        assert_eq!(root.insert_after_if_attached(&[other.clone()]), Ok(false));
        assert_eq!(root.replace_with_if_attached(&[other]), Ok(false));
    }

    #[test]
    fn test_insert_rejects_bad_arguments() {
        let parent = element("div");
        let target = element("p");
        parent.append_child(&target).unwrap();
        let x = element("x");

        assert_eq!(target.insert_before(&[target.clone()]), Err(TreeError::SelfInsertion));
        assert_eq!(
            target.insert_after(&[x.clone(), x.clone()]),
            Err(TreeError::DuplicateNode)
        );
        assert_eq!(target.insert_before(&[parent.clone()]), Err(TreeError::Cycle));
        assert_eq!(parent.child_count(), 1);
        assert!(x.parent().is_none());
    }

    #[test]
    fn test_replace_with() {
        let parent = element("div");
        let old = element("old");
        let tail = element("tail");
        parent.append_children(&[old.clone(), tail.clone()]).unwrap();

        let (a, b) = (element("a"), element("b"));
        assert!(old.replace_with(&[a.clone(), b.clone()]).unwrap());
        assert_eq!(names(&parent.children()), vec!["a", "b", "tail"]);
        assert!(old.parent().is_none());
        assert!(old.ever_detached());
        assert_ne!(old.domain_id(), parent.domain_id());
    }

    #[test]
    fn test_detach_creates_new_domain() {
        let root = element("div");
        let branch = element("section");
        let leaf = Node::text("x");
        root.append_child(&branch).unwrap();
        branch.append_child(&leaf).unwrap();
        let before = root.domain_id();

        assert!(branch.detach());
        assert!(!branch.detach());
        assert!(branch.domain_id() > before);
        assert_eq!(leaf.domain_id(), branch.domain_id());
        assert_eq!(root.domain_id(), before);
        assert_eq!(root.child_count(), 0);
        assert!(branch.ever_detached());
        assert!(!leaf.ever_detached());
    }

    #[test]
    fn test_remove_children() {
        let parent = element("div");
        let kids: Vec<Node> = (0..3).map(|i| Node::text(i.to_string())).collect();
        parent.append_children(&kids).unwrap();
        let stranger = Node::text("s");

        assert!(!parent.remove_child(&stranger));
        assert!(parent.remove_child(&kids[1]));
        assert!(parent.remove_children(&[kids[0].clone(), stranger]));
        assert_eq!(parent.children(), vec![kids[2].clone()]);
        assert_eq!(parent.remove_all_children(), 1);
        assert_eq!(parent.remove_all_children(), 0);
        let domains: HashSet<_> = kids.iter().map(Node::domain_id).collect();
        assert_eq!(domains.len(), 3);
    }

    #[test]
    fn test_add_inner() {
        let parent = element("div");
        let old: Vec<Node> = (0..2).map(|_| element("p")).collect();
        parent.append_children(&old).unwrap();
        let inner = Node::text("new");

        parent.add_inner(&inner).unwrap();
        assert_eq!(parent.children(), vec![inner.clone()]);
        assert!(old.iter().all(|n| n.parent().is_none()));

        // Re-adding an existing child as the only child keeps it.
        parent.add_inner(&inner).unwrap();
        assert_eq!(parent.children(), vec![inner.clone()]);
        assert_eq!(inner.domain_id(), parent.domain_id());
    }

    #[test]
    fn test_attributes() {
        let node = element("div");
        node.add_attributes(&[("id", "a"), ("class", "b")]).unwrap();
        node.set_attribute("id", "c").unwrap();
        assert_eq!(node.attribute("id").as_deref(), Some("c"));
        assert_eq!(node.remove_attributes(&["class", "missing"]), Ok(true));
        assert_eq!(node.remove_attributes(&["class"]), Ok(false));
        assert_eq!(node.attributes().len(), 1);

        let leaf = Node::text("x");
        assert_eq!(leaf.set_attribute("id", "a"), Err(TreeError::NotAnElement));
        assert!(matches!(
            node.set_attribute("bad name", "a"),
            Err(TreeError::InvalidAttributeName(_))
        ));
    }

    #[test]
    fn test_leaf_content() {
        let leaf = Node::text("a");
        leaf.set_text("b").unwrap();
        assert_eq!(leaf.leaf_text().as_deref(), Some("b"));
        assert!(!leaf.is_html());
        leaf.set_html("<i>c</i>").unwrap();
        assert!(leaf.is_html());
        leaf.set_text("d").unwrap();
        assert!(leaf.is_html());
        assert_eq!(element("div").set_text("x"), Err(TreeError::NotALeaf));
    }

    #[test]
    fn test_listener_sees_committed_events() {
        let root = element("div");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener: Arc<dyn StructureListener> = {
            let seen = Arc::clone(&seen);
            Arc::new(move |event: &MutationEvent| -> Result<(), TreeError> {
                seen.lock().push(event.kind());
                Ok(())
            })
        };
        root.add_structure_listener(Arc::clone(&listener));

        let child = Node::text("x");
        root.append_child(&child).unwrap();
        child.set_text("y").unwrap();
        child.detach();
        assert_eq!(
            *seen.lock(),
            vec!["child_appended", "content_changed", "child_removed"]
        );

        assert!(root.remove_structure_listener(&listener));
        root.append_child(&child).unwrap();
        assert_eq!(seen.lock().len(), 3);
    }

    #[test]
    fn test_failing_listener_does_not_abort() {
        let root = element("div");
        root.add_structure_listener(Arc::new(|_: &MutationEvent| -> Result<(), TreeError> {
            Err(TreeError::ListenerFailed("boom".into()))
        }));
        root.add_structure_listener(Arc::new(|_: &MutationEvent| -> Result<(), TreeError> {
            panic!("listener panic")
        }));

        let child = Node::text("x");
        assert!(root.append_child(&child).unwrap());
        assert!(!root.domain().lock().is_write_locked());
        assert_eq!(root.child_count(), 1);
    }

    #[test]
    fn test_change_sink_once_per_mutation() {
        struct Counter(Mutex<usize>);
        impl ChangeSink for Counter {
            fn changed(&self, _domain: crate::DomainId) {
                *self.0.lock() += 1;
            }
        }

        let root = element("div");
        let counter = Arc::new(Counter(Mutex::new(0)));
        root.set_change_sink(Some(counter.clone() as Arc<dyn ChangeSink>));
        let kids: Vec<Node> = (0..3).map(|_| Node::text("x")).collect();
        root.append_children(&kids).unwrap();
        root.remove_children(&kids);
        assert_eq!(*counter.0.lock(), 2);
    }

    #[test]
    fn test_absorbed_domain_drops_listeners() {
        let root = element("div");
        let branch = element("p");
        let fired = Arc::new(Mutex::new(0));
        {
            let fired = Arc::clone(&fired);
            branch.add_structure_listener(Arc::new(move |_: &MutationEvent| -> Result<(), TreeError> {
                *fired.lock() += 1;
                Ok(())
            }));
        }
        root.append_child(&branch).unwrap();
        branch.append_child(&Node::text("x")).unwrap();
        assert_eq!(*fired.lock(), 0);
    }
}
