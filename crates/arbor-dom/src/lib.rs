//! arbor DOM - concurrent document tree
//!
//! A mutable tree of elements and leaves that many threads can read and
//! restructure at once. Each connected subtree belongs to one consistency
//! domain; operations spanning several domains lock them in a global order,
//! so concurrent moves between trees cannot deadlock.

mod config;
mod coordinator;
mod domain;
mod generation;
mod listener;
mod lock;
mod mutation;
mod node;
mod propagate;
mod queue;
mod shared;
mod walker;

pub use config::{Config, WalkMode};
pub use coordinator::{LockCoordinator, LockEvent, LockMode, LockSet, LockTracer, ReadLock, set_lock_tracer};
pub use domain::{Domain, DomainId};
pub use generation::{AtomicGeneration, Generation};
pub use listener::{ChangeSink, MutationEvent, StructureListener};
pub use lock::{DomainLock, ReadGuard, WriteGuard};
pub use node::{
    Attribute, Content, Element, Leaf, Node, NodeId, TagType, validate_attribute_name,
    validate_tag_name,
};
pub use queue::PendingQueue;
pub use shared::{ContentFormatter, PendingOperation, SharedContent};
pub use walker::{ByteSink, Sink, TreeWalker, walk_iterative, walk_recursive};

/// Structural and content errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node has no parent")]
    NoParent,

    #[error("insertion would make a node its own ancestor")]
    Cycle,

    #[error("a node cannot be inserted relative to itself")]
    SelfInsertion,

    #[error("operation requires an element")]
    NotAnElement,

    #[error("operation requires a leaf")]
    NotALeaf,

    #[error("tag name is empty")]
    EmptyTagName,

    #[error("invalid tag name: {0:?}")]
    InvalidTagName(String),

    #[error("invalid attribute name: {0:?}")]
    InvalidAttributeName(String),

    #[error("node listed more than once")]
    DuplicateNode,

    #[error("listener failed: {0}")]
    ListenerFailed(String),
}

/// Output errors from streaming walkers
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
