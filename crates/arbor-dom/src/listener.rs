//! Structural change notification
//!
//! Listeners are registered on a domain and fired after a mutation commits,
//! while the domain's write lock is still held. A listener must therefore not
//! call back into the mutation API for nodes of the same domain from another
//! thread and wait on it.

use std::panic::{self, AssertUnwindSafe};

use crate::domain::{Domain, DomainId};
use crate::{Node, TreeError};

/// One committed structural change
#[derive(Debug, Clone)]
pub enum MutationEvent {
    ChildAppended {
        parent: Node,
        child: Node,
    },
    /// Batched append; `previous_parents[i]` is where `children[i]` came from
    ChildrenAppended {
        parent: Node,
        children: Vec<Node>,
        previous_parents: Vec<Option<Node>>,
    },
    ChildMoved {
        previous_parent: Node,
        parent: Node,
        child: Node,
    },
    ChildRemoved {
        parent: Node,
        child: Node,
    },
    AllChildrenRemoved {
        parent: Node,
        children: Vec<Node>,
    },
    InsertedBefore {
        parent: Node,
        target: Node,
        inserted: Vec<Node>,
    },
    InsertedAfter {
        parent: Node,
        target: Node,
        inserted: Vec<Node>,
    },
    Replaced {
        parent: Node,
        replaced: Node,
        replacements: Vec<Node>,
    },
    InnerReplaced {
        parent: Node,
        inner: Node,
    },
    AttributesAdded {
        node: Node,
        names: Vec<String>,
    },
    AttributesRemoved {
        node: Node,
        names: Vec<String>,
    },
    ContentChanged {
        node: Node,
    },
}

impl MutationEvent {
    /// Node whose children or content changed
    pub fn target(&self) -> &Node {
        match self {
            Self::ChildAppended { parent, .. }
            | Self::ChildrenAppended { parent, .. }
            | Self::ChildMoved { parent, .. }
            | Self::ChildRemoved { parent, .. }
            | Self::AllChildrenRemoved { parent, .. }
            | Self::InsertedBefore { parent, .. }
            | Self::InsertedAfter { parent, .. }
            | Self::Replaced { parent, .. }
            | Self::InnerReplaced { parent, .. } => parent,
            Self::AttributesAdded { node, .. }
            | Self::AttributesRemoved { node, .. }
            | Self::ContentChanged { node } => node,
        }
    }

    /// Short event name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChildAppended { .. } => "child_appended",
            Self::ChildrenAppended { .. } => "children_appended",
            Self::ChildMoved { .. } => "child_moved",
            Self::ChildRemoved { .. } => "child_removed",
            Self::AllChildrenRemoved { .. } => "all_children_removed",
            Self::InsertedBefore { .. } => "inserted_before",
            Self::InsertedAfter { .. } => "inserted_after",
            Self::Replaced { .. } => "replaced",
            Self::InnerReplaced { .. } => "inner_replaced",
            Self::AttributesAdded { .. } => "attributes_added",
            Self::AttributesRemoved { .. } => "attributes_removed",
            Self::ContentChanged { .. } => "content_changed",
        }
    }
}

/// Receives every committed mutation of a domain
pub trait StructureListener: Send + Sync {
    fn on_mutation(&self, event: &MutationEvent) -> Result<(), TreeError>;
}

impl<F> StructureListener for F
where
    F: Fn(&MutationEvent) -> Result<(), TreeError> + Send + Sync,
{
    fn on_mutation(&self, event: &MutationEvent) -> Result<(), TreeError> {
        self(event)
    }
}

/// Told once per committed mutation that a domain changed
///
/// Used by transports to decide whether there is anything to push.
pub trait ChangeSink: Send + Sync {
    fn changed(&self, domain: DomainId);
}

/// Fire listeners for each event, then the change sink of `domain` once
///
/// Failures and panics are logged and swallowed: the mutation has already
/// committed and the caller's locks are released normally.
pub(crate) fn dispatch(domain: &Domain, events: &[MutationEvent]) {
    let listeners = domain.listeners();
    for event in events {
        for listener in &listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_mutation(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(domain = %domain.id(), event = event.kind(), error = %err, "structure listener failed");
                }
                Err(_) => {
                    tracing::warn!(domain = %domain.id(), event = event.kind(), "structure listener panicked");
                }
            }
        }
    }

    if events.is_empty() {
        return;
    }
    if let Some(sink) = domain.sink() {
        if panic::catch_unwind(AssertUnwindSafe(|| sink.changed(domain.id()))).is_err() {
            tracing::warn!(domain = %domain.id(), "change sink panicked");
        }
    }
}
