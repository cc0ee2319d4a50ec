//! Content shared by many leaves
//!
//! A [`SharedContent`] holds one textual value and keeps every subscribed
//! leaf showing it. All changes go through a [`PendingQueue`], so they reach
//! the leaves in submission order no matter which thread submitted them, and
//! each leaf is updated through the normal mutation API under its own
//! domain's lock.

use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::Mutex;

use crate::config::Config;
use crate::node::Node;
use crate::queue::PendingQueue;
use crate::TreeError;

/// Change waiting to be applied to the subscribers
#[derive(Debug, Clone)]
pub enum PendingOperation {
    SetContent { content: String, is_html: bool },
    AddListener(Node),
    RemoveListener(Node),
    /// Unsubscribe everyone, optionally clearing their text
    Detach { remove_content: bool },
}

/// Per-leaf rendering of the shared value; `None` falls back to the raw value
pub type ContentFormatter = dyn Fn(&str, &Node) -> Option<String> + Send + Sync;

struct State {
    content: String,
    is_html: bool,
    subscribers: IndexSet<Node>,
    formatter: Option<Arc<ContentFormatter>>,
}

/// One value mirrored into many leaves
pub struct SharedContent {
    state: Arc<Mutex<State>>,
    queue: PendingQueue<PendingOperation>,
}

impl SharedContent {
    pub fn new(content: impl Into<String>, config: &Config) -> Self {
        Self::build(content.into(), None, config)
    }

    /// Like [`new`](Self::new) with a per-leaf formatter
    ///
    /// The formatter runs on every update of every leaf. A `None` result is
    /// not remembered; the formatter is asked again next time.
    pub fn with_formatter<F>(content: impl Into<String>, config: &Config, formatter: F) -> Self
    where
        F: Fn(&str, &Node) -> Option<String> + Send + Sync + 'static,
    {
        let formatter: Arc<ContentFormatter> = Arc::new(formatter);
        Self::build(content.into(), Some(formatter), config)
    }

    fn build(content: String, formatter: Option<Arc<ContentFormatter>>, config: &Config) -> Self {
        let state = Arc::new(Mutex::new(State {
            content,
            is_html: false,
            subscribers: IndexSet::new(),
            formatter,
        }));
        let queue = {
            let state = Arc::clone(&state);
            PendingQueue::new("shared-content", config, move |op| apply(&state, op))
        };
        Self { state, queue }
    }

    /// Replace the value with plain text
    pub fn set_content(&self, content: impl Into<String>) {
        self.queue.submit(PendingOperation::SetContent {
            content: content.into(),
            is_html: false,
        });
    }

    /// Replace the value with markup
    pub fn set_html_content(&self, content: impl Into<String>) {
        self.queue.submit(PendingOperation::SetContent {
            content: content.into(),
            is_html: true,
        });
    }

    /// Mirror the value into `leaf`
    pub fn subscribe(&self, leaf: &Node) -> Result<(), TreeError> {
        if !leaf.is_leaf() {
            return Err(TreeError::NotALeaf);
        }
        self.queue.submit(PendingOperation::AddListener(leaf.clone()));
        Ok(())
    }

    /// Stop mirroring into `leaf`; its current text stays
    pub fn unsubscribe(&self, leaf: &Node) {
        self.queue.submit(PendingOperation::RemoveListener(leaf.clone()));
    }

    /// Unsubscribe every leaf
    pub fn detach_all(&self, remove_content: bool) {
        self.queue.submit(PendingOperation::Detach { remove_content });
    }

    /// Last applied value
    pub fn content(&self) -> String {
        self.state.lock().content.clone()
    }

    pub fn is_html(&self) -> bool {
        self.state.lock().is_html
    }

    pub fn subscribers(&self) -> Vec<Node> {
        self.state.lock().subscribers.iter().cloned().collect()
    }

    /// Block until every submitted change has been applied
    pub fn wait_idle(&self) {
        self.queue.wait_idle();
    }
}

fn render(leaf: &Node, content: &str, is_html: bool, formatter: Option<&ContentFormatter>) {
    let formatted = formatter.and_then(|f| f(content, leaf));
    let text = formatted.as_deref().unwrap_or(content);
    if let Err(err) = leaf.set_leaf_content(text, is_html) {
        tracing::warn!(node = leaf.id().value(), error = %err, "shared content not applied");
    }
}

// Leaves are updated outside the state lock; listeners on their domains may
// read the shared value.
fn apply(state: &Mutex<State>, op: PendingOperation) {
    match op {
        PendingOperation::SetContent { content, is_html } => {
            let (subscribers, formatter) = {
                let mut state = state.lock();
                state.content.clone_from(&content);
                state.is_html = is_html;
                (
                    state.subscribers.iter().cloned().collect::<Vec<_>>(),
                    state.formatter.clone(),
                )
            };
            for leaf in &subscribers {
                render(leaf, &content, is_html, formatter.as_deref());
            }
            tracing::debug!(subscribers = subscribers.len(), "shared content updated");
        }
        PendingOperation::AddListener(leaf) => {
            let (content, is_html, formatter) = {
                let mut state = state.lock();
                if !state.subscribers.insert(leaf.clone()) {
                    return;
                }
                (state.content.clone(), state.is_html, state.formatter.clone())
            };
            render(&leaf, &content, is_html, formatter.as_deref());
        }
        PendingOperation::RemoveListener(leaf) => {
            state.lock().subscribers.shift_remove(&leaf);
        }
        PendingOperation::Detach { remove_content } => {
            let subscribers = std::mem::take(&mut state.lock().subscribers);
            if remove_content {
                for leaf in &subscribers {
                    if let Err(err) = leaf.set_text("") {
                        tracing::warn!(node = leaf.id().value(), error = %err, "shared content not cleared");
                    }
                }
            }
            tracing::debug!(subscribers = subscribers.len(), remove_content, "shared content detached");
        }
    }
}
