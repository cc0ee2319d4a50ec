//! Consistency domains
//!
//! A domain is the unit of mutual exclusion for one connected subtree. Every
//! node points at exactly one domain; a freshly constructed root gets a new
//! domain, a detached subtree gets a new domain, and an attached subtree
//! adopts the domain of its new parent. Domain ids only ever increase and are
//! the single key used to order lock acquisition.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::generation::{AtomicGeneration, Generation};
use crate::listener::{ChangeSink, StructureListener};
use crate::lock::DomainLock;
use crate::node::{Node, NodeInner};

static NEXT_DOMAIN_ID: AtomicU64 = AtomicU64::new(1);

/// Creation-ordered domain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainId(u64);

impl DomainId {
    /// Raw id value
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

/// Shared state of one consistency domain
pub struct Domain {
    id: DomainId,
    /// Node the domain was created for
    root: Weak<NodeInner>,
    hierarchy: AtomicU64,
    next_slot: AtomicU32,
    lock: DomainLock,
    generation: AtomicGeneration,
    listeners: Mutex<Vec<Arc<dyn StructureListener>>>,
    sink: Mutex<Option<Arc<dyn ChangeSink>>>,
}

impl Domain {
    /// Allocate the next domain for `owner`
    pub(crate) fn new(owner: Weak<NodeInner>) -> Arc<Self> {
        let id = DomainId(NEXT_DOMAIN_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(domain = %id, "domain created");
        Arc::new(Self {
            id,
            root: owner,
            hierarchy: AtomicU64::new(0),
            next_slot: AtomicU32::new(0),
            lock: DomainLock::new(),
            generation: AtomicGeneration::new(),
            listeners: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
        })
    }

    #[inline]
    pub fn id(&self) -> DomainId {
        self.id
    }

    /// The domain's read/write lock
    ///
    /// Locking two domains by hand bypasses the ordering rule; multi-domain
    /// work goes through [`LockCoordinator`](crate::LockCoordinator).
    #[inline]
    pub fn lock(&self) -> &DomainLock {
        &self.lock
    }

    /// Node this domain was created for, if it is still alive
    pub fn root(&self) -> Option<Node> {
        self.root.upgrade().map(Node)
    }

    /// Next wire-protocol slot id
    pub fn next_slot_id(&self) -> u32 {
        self.next_slot.fetch_add(1, Ordering::Relaxed)
    }

    /// Next position in this domain's hierarchy order
    pub fn hierarchy_position(&self) -> u64 {
        self.hierarchy.fetch_add(1, Ordering::Relaxed)
    }

    /// Current mutation generation
    pub fn generation(&self) -> Generation {
        self.generation.get()
    }

    /// Whether a mutation committed here after `seen`
    pub fn is_changed_since(&self, seen: Generation) -> bool {
        self.generation.is_changed_since(seen)
    }

    pub(crate) fn bump_generation(&self) -> Generation {
        self.generation.bump()
    }

    pub(crate) fn add_listener(&self, listener: Arc<dyn StructureListener>) {
        self.listeners.lock().push(listener);
    }

    pub(crate) fn remove_listener(&self, listener: &Arc<dyn StructureListener>) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub(crate) fn listeners(&self) -> Vec<Arc<dyn StructureListener>> {
        self.listeners.lock().clone()
    }

    pub(crate) fn set_sink(&self, sink: Option<Arc<dyn ChangeSink>>) {
        *self.sink.lock() = sink;
    }

    pub(crate) fn sink(&self) -> Option<Arc<dyn ChangeSink>> {
        self.sink.lock().clone()
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("id", &self.id)
            .field("generation", &self.generation.get())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let a = Domain::new(Weak::new());
        let b = Domain::new(Weak::new());
        let c = Domain::new(Weak::new());
        assert!(a.id() < b.id());
        assert!(b.id() < c.id());
    }

    #[test]
    fn test_counters_increase() {
        let d = Domain::new(Weak::new());
        assert_eq!(d.next_slot_id(), 0);
        assert_eq!(d.next_slot_id(), 1);
        let first = d.hierarchy_position();
        assert!(d.hierarchy_position() > first);
    }

    #[test]
    fn test_root_tracks_owner() {
        let node = Node::text("x");
        assert_eq!(node.domain().root(), Some(node.clone()));
        assert!(Domain::new(Weak::new()).root().is_none());
    }
}
