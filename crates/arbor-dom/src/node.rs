//! Tree nodes
//!
//! A [`Node`] is a cheap handle to shared node storage. The parent link is a
//! weak back-reference and children are strong handles, so a tree owns its
//! subtrees and nothing owns its parent. Node storage sits behind a short-held
//! mutex for memory safety; logical consistency comes from the domain locks,
//! which are always taken before any node mutex and never while one is held.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::{Mutex, MutexGuard};

use crate::coordinator::LockCoordinator;
use crate::domain::{Domain, DomainId};
use crate::generation::Generation;
use crate::TreeError;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identifier, increasing in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// How an element's markup is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagType {
    /// `<x></x>`
    #[default]
    OpeningClosing,
    /// `<x/>`
    SelfClosing,
    /// `<x>`
    NonClosing,
}

/// Attribute name/value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Element-specific data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    tag_type: TagType,
    /// Insertion order, unique names
    attributes: Vec<Attribute>,
}

impl Element {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn tag_type(&self) -> TagType {
        self.tag_type
    }

    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Get an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing any existing value
    pub(crate) fn set_attribute(&mut self, name: &str, value: &str) {
        for attr in self.attributes.iter_mut() {
            if attr.name == name {
                attr.value = value.to_string();
                return;
            }
        }
        self.attributes.push(Attribute::new(name, value));
    }

    pub(crate) fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| a.name != name);
        self.attributes.len() != before
    }
}

/// Raw leaf content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub(crate) text: String,
    pub(crate) is_html: bool,
}

impl Leaf {
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the text is emitted as markup rather than escaped
    #[inline]
    pub fn is_html(&self) -> bool {
        self.is_html
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(Element),
    Leaf(Leaf),
}

impl Content {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Content::Element(e) => Some(e),
            Content::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Content::Leaf(l) => Some(l),
            Content::Element(_) => None,
        }
    }

    pub(crate) fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Content::Element(e) => Some(e),
            Content::Leaf(_) => None,
        }
    }

    pub(crate) fn as_leaf_mut(&mut self) -> Option<&mut Leaf> {
        match self {
            Content::Leaf(l) => Some(l),
            Content::Element(_) => None,
        }
    }
}

/// Last rendered text of a subtree root
#[derive(Debug, Clone)]
pub(crate) struct Rendered {
    pub(crate) domain: DomainId,
    pub(crate) generation: Generation,
    pub(crate) text: Arc<str>,
}

pub(crate) struct NodeState {
    pub(crate) parent: Weak<NodeInner>,
    pub(crate) children: IndexSet<Node>,
    pub(crate) domain: Arc<Domain>,
    pub(crate) content: Content,
    pub(crate) ever_detached: bool,
    pub(crate) hierarchy_position: u64,
    pub(crate) wire_id: Option<u32>,
    /// Cached opening form, cleared when the node's own content changes
    pub(crate) open_form: Option<Arc<str>>,
    pub(crate) rendered: Option<Rendered>,
}

pub struct NodeInner {
    id: NodeId,
    state: Mutex<NodeState>,
}

impl Drop for NodeInner {
    // Unlink children iteratively so dropping a very deep tree cannot
    // overflow the stack.
    fn drop(&mut self) {
        let mut stack: Vec<Node> = self.state.get_mut().children.drain(..).collect();
        while let Some(node) = stack.pop() {
            if let Ok(mut inner) = Arc::try_unwrap(node.0) {
                stack.extend(inner.state.get_mut().children.drain(..));
            }
        }
    }
}

/// Handle to a tree node
#[derive(Clone)]
pub struct Node(pub(crate) Arc<NodeInner>);

impl Node {
    fn with_content(content: Content) -> Node {
        let inner = Arc::new_cyclic(|weak| {
            let domain = Domain::new(weak.clone());
            let hierarchy_position = domain.hierarchy_position();
            NodeInner {
                id: NodeId::next(),
                state: Mutex::new(NodeState {
                    parent: Weak::new(),
                    children: IndexSet::new(),
                    domain,
                    content,
                    ever_detached: false,
                    hierarchy_position,
                    wire_id: None,
                    open_form: None,
                    rendered: None,
                }),
            }
        });
        Node(inner)
    }

    /// Create an element with the given attributes
    pub fn element(name: &str, attributes: &[(&str, &str)]) -> Result<Node, TreeError> {
        Self::element_with_type(name, TagType::OpeningClosing, attributes)
    }

    /// Create an element with an explicit closing style
    pub fn element_with_type(
        name: &str,
        tag_type: TagType,
        attributes: &[(&str, &str)],
    ) -> Result<Node, TreeError> {
        validate_tag_name(name)?;
        let mut element = Element {
            name: name.to_string(),
            tag_type,
            attributes: Vec::with_capacity(attributes.len()),
        };
        for (attr_name, value) in attributes {
            validate_attribute_name(attr_name)?;
            element.set_attribute(attr_name, value);
        }
        Ok(Self::with_content(Content::Element(element)))
    }

    /// Create a text leaf (escaped on output)
    pub fn text(content: impl Into<String>) -> Node {
        Self::leaf(content, false)
    }

    /// Create an html leaf (emitted raw)
    pub fn html(content: impl Into<String>) -> Node {
        Self::leaf(content, true)
    }

    pub fn leaf(content: impl Into<String>, is_html: bool) -> Node {
        Self::with_content(Content::Leaf(Leaf {
            text: content.into(),
            is_html,
        }))
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, NodeState> {
        self.0.state.lock()
    }

    pub(crate) fn from_weak(weak: &Weak<NodeInner>) -> Option<Node> {
        weak.upgrade().map(Node)
    }

    /// Parent without taking the domain lock; callers hold it already
    pub(crate) fn parent_unlocked(&self) -> Option<Node> {
        Node::from_weak(&self.state().parent)
    }

    /// Current domain (read without locking)
    pub fn domain(&self) -> Arc<Domain> {
        Arc::clone(&self.state().domain)
    }

    /// Current domain id (read without locking)
    pub fn domain_id(&self) -> DomainId {
        self.state().domain.id()
    }

    /// Whether this node has ever been detached from a parent
    pub fn ever_detached(&self) -> bool {
        self.state().ever_detached
    }

    /// Position stamped when the node last joined its domain
    pub fn hierarchy_position(&self) -> u64 {
        self.state().hierarchy_position
    }

    /// Stable wire id within the current domain, allocated on first use
    ///
    /// Takes the domain's write lock, since it may allocate a slot id.
    pub fn wire_id(&self) -> u32 {
        let _locks = LockCoordinator::acquire(self, &[]);
        let mut state = self.state();
        match state.wire_id {
            Some(id) => id,
            None => {
                let id = state.domain.next_slot_id();
                state.wire_id = Some(id);
                id
            }
        }
    }

    /// Snapshot of the node's content
    pub fn content(&self) -> Content {
        let _guard = LockCoordinator::read(self);
        self.state().content.clone()
    }

    pub fn is_element(&self) -> bool {
        matches!(self.state().content, Content::Element(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.state().content, Content::Leaf(_))
    }

    /// Tag name for elements
    pub fn name(&self) -> Option<String> {
        self.state()
            .content
            .as_element()
            .map(|e| e.name().to_string())
    }

    /// Leaf text for leaves
    pub fn leaf_text(&self) -> Option<String> {
        let _guard = LockCoordinator::read(self);
        self.state().content.as_leaf().map(|l| l.text().to_string())
    }

    /// Whether this is an html leaf
    pub fn is_html(&self) -> bool {
        self.state().content.as_leaf().is_some_and(Leaf::is_html)
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        let _guard = LockCoordinator::read(self);
        self.state()
            .content
            .as_element()
            .and_then(|e| e.attribute(name))
            .map(str::to_string)
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        let _guard = LockCoordinator::read(self);
        self.state()
            .content
            .as_element()
            .map(|e| e.attributes().to_vec())
            .unwrap_or_default()
    }

    pub fn parent(&self) -> Option<Node> {
        let _guard = LockCoordinator::read(self);
        self.parent_unlocked()
    }

    pub fn children(&self) -> Vec<Node> {
        let _guard = LockCoordinator::read(self);
        self.state().children.iter().cloned().collect()
    }

    pub fn child_count(&self) -> usize {
        let _guard = LockCoordinator::read(self);
        self.state().children.len()
    }

    pub fn first_child(&self) -> Option<Node> {
        let _guard = LockCoordinator::read(self);
        self.state().children.first().cloned()
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let _guard = LockCoordinator::read(self);
        let parent = self.parent_unlocked()?;
        sibling_at(&parent, self, 1)
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let _guard = LockCoordinator::read(self);
        let parent = self.parent_unlocked()?;
        sibling_at(&parent, self, -1)
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// Number of ancestors
    pub fn depth(&self) -> usize {
        let _guard = LockCoordinator::read(self);
        let mut depth = 0;
        let mut cursor = self.parent_unlocked();
        while let Some(node) = cursor {
            depth += 1;
            cursor = node.parent_unlocked();
        }
        depth
    }

    /// Topmost ancestor (or self)
    pub fn root(&self) -> Node {
        let _guard = LockCoordinator::read(self);
        let mut current = self.clone();
        while let Some(parent) = current.parent_unlocked() {
            current = parent;
        }
        current
    }

    /// Whether `other` is this node or one of its descendants
    pub fn contains(&self, other: &Node) -> bool {
        let _guard = LockCoordinator::read(other);
        let mut cursor = Some(other.clone());
        while let Some(node) = cursor {
            if node == *self {
                return true;
            }
            cursor = node.parent_unlocked();
        }
        false
    }

    /// Check parent links and domain references across the subtree
    ///
    /// Every child must point back at its parent and share its parent's
    /// domain.
    pub fn is_consistent(&self) -> bool {
        let _guard = LockCoordinator::read(self);
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            let (domain, children) = {
                let state = node.state();
                (state.domain.id(), state.children.iter().cloned().collect::<Vec<_>>())
            };
            for child in children {
                let state = child.state();
                let back = Node::from_weak(&state.parent);
                if back.as_ref() != Some(&node) || state.domain.id() != domain {
                    return false;
                }
                drop(state);
                stack.push(child);
            }
        }
        true
    }

    /// Number of nodes in this subtree
    pub fn subtree_len(&self) -> usize {
        let _guard = LockCoordinator::read(self);
        let mut stack = vec![self.clone()];
        let mut count = 0;
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.state().children.iter().cloned());
        }
        count
    }
}

/// Sibling of `node` at `offset` within `parent`'s children
pub(crate) fn sibling_at(parent: &Node, node: &Node, offset: isize) -> Option<Node> {
    let state = parent.state();
    let index = state.children.get_index_of(node)?;
    let target = index.checked_add_signed(offset)?;
    state.children.get_index(target).cloned()
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Node");
        out.field("id", &self.0.id.0);
        // Never block inside Debug; the state may be held by this thread.
        if let Some(state) = self.0.state.try_lock() {
            match &state.content {
                Content::Element(e) => out.field("element", &e.name),
                Content::Leaf(l) => out.field("leaf", &l.text),
            };
            out.field("domain", &state.domain.id());
        }
        out.finish()
    }
}

/// Tag names are non-empty and free of markup delimiters
pub fn validate_tag_name(name: &str) -> Result<(), TreeError> {
    if name.is_empty() {
        return Err(TreeError::EmptyTagName);
    }
    if name.chars().any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '/' | '"' | '\'' | '=')) {
        return Err(TreeError::InvalidTagName(name.to_string()));
    }
    Ok(())
}

/// Attribute names are non-empty and free of markup delimiters
pub fn validate_attribute_name(name: &str) -> Result<(), TreeError> {
    if name.is_empty()
        || name.chars().any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '/' | '"' | '\'' | '='))
    {
        return Err(TreeError::InvalidAttributeName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_nodes_get_distinct_domains() {
        let a = Node::text("a");
        let b = Node::text("b");
        assert_ne!(a.domain_id(), b.domain_id());
        assert!(a.id() < b.id());
    }

    #[test]
    fn test_element_attributes_keep_order_and_replace() {
        let div = Node::element("div", &[("id", "x"), ("class", "a"), ("id", "y")]).unwrap();
        let attrs = div.attributes();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0], Attribute::new("id", "y"));
        assert_eq!(attrs[1], Attribute::new("class", "a"));
    }

    #[test]
    fn test_tag_name_validation() {
        assert_eq!(Node::element("", &[]).unwrap_err(), TreeError::EmptyTagName);
        assert!(matches!(
            Node::element("a b", &[]),
            Err(TreeError::InvalidTagName(_))
        ));
        assert!(matches!(
            Node::element("div", &[("a=b", "")]),
            Err(TreeError::InvalidAttributeName(_))
        ));
    }

    #[test]
    fn test_leaf_kinds() {
        let text = Node::text("hi");
        let html = Node::html("<b>hi</b>");
        assert!(text.is_leaf());
        assert!(!text.is_html());
        assert!(html.is_html());
        assert_eq!(html.leaf_text().as_deref(), Some("<b>hi</b>"));
        assert_eq!(text.name(), None);
    }

    #[test]
    fn test_wire_id_is_stable() {
        let node = Node::text("a");
        let first = node.wire_id();
        assert_eq!(node.wire_id(), first);
    }

    #[test]
    fn test_drop_deep_chain() {
        let root = Node::element("div", &[]).unwrap();
        let mut current = root.clone();
        for _ in 0..100_000 {
            let child = Node::element("div", &[]).unwrap();
            current.append_child(&child).unwrap();
            current = child;
        }
        drop(current);
        drop(root);
    }
}
