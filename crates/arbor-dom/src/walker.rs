//! Tree walkers
//!
//! Renders a subtree to its text form through a [`Sink`]. The recursive
//! walker is a plain pre-order traversal; the iterative walker moves a single
//! cursor through the tree and never grows the call stack, so it handles
//! arbitrarily deep trees. Both produce identical output.
//!
//! Key features:
//! - String and byte sinks
//! - Per-node opening form caching
//! - Whole-subtree caching keyed by domain generation

use std::convert::Infallible;
use std::io::Write;
use std::sync::Arc;

use crate::config::{Config, WalkMode};
use crate::coordinator::LockCoordinator;
use crate::node::{Content, Element, Node, Rendered, TagType, sibling_at};
use crate::WalkError;

/// Output target of a walk
pub trait Sink {
    type Error;

    fn emit(&mut self, part: &str) -> Result<(), Self::Error>;
}

impl Sink for String {
    type Error = Infallible;

    fn emit(&mut self, part: &str) -> Result<(), Self::Error> {
        self.push_str(part);
        Ok(())
    }
}

/// Streams UTF-8 output into an [`std::io::Write`]
pub struct ByteSink<W: Write> {
    out: W,
    flush_each_write: bool,
}

impl<W: Write> ByteSink<W> {
    pub fn new(out: W, flush_each_write: bool) -> Self {
        Self { out, flush_each_write }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Sink for ByteSink<W> {
    type Error = WalkError;

    fn emit(&mut self, part: &str) -> Result<(), Self::Error> {
        self.out.write_all(part.as_bytes())?;
        if self.flush_each_write {
            self.out.flush()?;
        }
        Ok(())
    }
}

/// Escape leaf text
fn escape_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(c),
        }
    }
}

/// Escape attribute value
fn escape_attribute(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(c),
        }
    }
}

fn open_tag(element: &Element, output: &mut String) {
    output.push('<');
    output.push_str(element.name());
    for attr in element.attributes() {
        output.push(' ');
        output.push_str(&attr.name);
        if !attr.value.is_empty() {
            output.push_str("=\"");
            escape_attribute(&attr.value, output);
            output.push('"');
        }
    }
    match element.tag_type() {
        TagType::SelfClosing => output.push_str("/>"),
        TagType::OpeningClosing | TagType::NonClosing => output.push('>'),
    }
}

/// Opening and closing form of one node
fn forms(node: &Node, rebuild: bool) -> (Arc<str>, Option<String>) {
    let mut state = node.state();
    let close = match &state.content {
        Content::Element(e) if e.tag_type() == TagType::OpeningClosing => {
            Some(format!("</{}>", e.name()))
        }
        _ => None,
    };
    if !rebuild {
        if let Some(open) = &state.open_form {
            return (Arc::clone(open), close);
        }
    }

    let mut output = String::new();
    match &state.content {
        Content::Element(e) => open_tag(e, &mut output),
        Content::Leaf(l) if l.is_html() => output.push_str(l.text()),
        Content::Leaf(l) => escape_text(l.text(), &mut output),
    }
    let open: Arc<str> = output.into();
    state.open_form = Some(Arc::clone(&open));
    (open, close)
}

fn emit_close<S: Sink>(node: &Node, sink: &mut S) -> Result<(), S::Error> {
    let (_, close) = forms(node, false);
    match close {
        Some(close) => sink.emit(&close),
        None => Ok(()),
    }
}

fn walk_recursive_locked<S: Sink>(node: &Node, sink: &mut S, rebuild: bool) -> Result<(), S::Error> {
    let (open, close) = forms(node, rebuild);
    sink.emit(&open)?;
    let children: Vec<Node> = node.state().children.iter().cloned().collect();
    for child in &children {
        walk_recursive_locked(child, sink, rebuild)?;
    }
    if let Some(close) = close {
        sink.emit(&close)?;
    }
    Ok(())
}

fn walk_iterative_locked<S: Sink>(start: &Node, sink: &mut S, rebuild: bool) -> Result<(), S::Error> {
    let mut current = start.clone();
    loop {
        let (open, _) = forms(&current, rebuild);
        sink.emit(&open)?;
        let first = current.state().children.first().cloned();
        if let Some(first) = first {
            current = first;
            continue;
        }

        // Bottom reached: close it, then find the next sibling on the way up.
        emit_close(&current, sink)?;
        loop {
            if current == *start {
                return Ok(());
            }
            let Some(parent) = current.parent_unlocked() else {
                return Ok(());
            };
            if let Some(next) = sibling_at(&parent, &current, 1) {
                current = next;
                break;
            }
            emit_close(&parent, sink)?;
            current = parent;
        }
    }
}

/// Whether any node lies more than `limit` levels below `root`
fn deeper_than(root: &Node, limit: usize) -> bool {
    let mut stack = vec![(root.clone(), 0usize)];
    while let Some((node, depth)) = stack.pop() {
        if depth > limit {
            return true;
        }
        stack.extend(node.state().children.iter().map(|c| (c.clone(), depth + 1)));
    }
    false
}

/// Render `root` with the recursive walker
pub fn walk_recursive<S: Sink>(root: &Node, sink: &mut S) -> Result<(), S::Error> {
    let _guard = LockCoordinator::read(root);
    walk_recursive_locked(root, sink, false)
}

/// Render `root` with the iterative walker
pub fn walk_iterative<S: Sink>(root: &Node, sink: &mut S) -> Result<(), S::Error> {
    let _guard = LockCoordinator::read(root);
    walk_iterative_locked(root, sink, false)
}

/// Renders subtrees according to a [`Config`]
#[derive(Debug, Clone, Default)]
pub struct TreeWalker {
    config: Config,
}

impl TreeWalker {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Render `root` into `sink` under its domain's read lock
    pub fn walk<S: Sink>(&self, root: &Node, sink: &mut S) -> Result<(), S::Error> {
        let _guard = LockCoordinator::read(root);
        self.walk_locked(root, sink, false)
    }

    /// Text form of `root`, reusing the last rendering while its domain is unchanged
    pub fn to_text(&self, root: &Node) -> String {
        let _guard = LockCoordinator::read(root);
        let domain = root.domain();
        let generation = domain.generation();
        {
            let state = root.state();
            if let Some(rendered) = &state.rendered {
                if rendered.domain == domain.id() && !domain.is_changed_since(rendered.generation) {
                    tracing::trace!(domain = %domain.id(), "text cache hit");
                    return rendered.text.to_string();
                }
            }
        }

        let text = self.render(root, false);
        root.state().rendered = Some(Rendered {
            domain: domain.id(),
            generation,
            text: Arc::from(text.as_str()),
        });
        text
    }

    /// Text form of `root`, re-walking every node
    pub fn to_text_rebuild(&self, root: &Node) -> String {
        let _guard = LockCoordinator::read(root);
        self.render(root, true)
    }

    /// Stream the text form of `root` into `out`
    pub fn write_to<W: Write>(&self, root: &Node, out: W) -> Result<W, WalkError> {
        let mut sink = ByteSink::new(out, self.config.flush_each_write);
        self.walk(root, &mut sink)?;
        Ok(sink.into_inner())
    }

    fn render(&self, root: &Node, rebuild: bool) -> String {
        let mut text = String::new();
        match self.walk_locked(root, &mut text, rebuild) {
            Ok(()) => text,
            Err(never) => match never {},
        }
    }

    fn walk_locked<S: Sink>(&self, root: &Node, sink: &mut S, rebuild: bool) -> Result<(), S::Error> {
        let iterative = match self.config.walk_mode {
            WalkMode::Recursive => false,
            WalkMode::Iterative => true,
            WalkMode::Auto => deeper_than(root, self.config.recursion_limit),
        };
        if iterative {
            walk_iterative_locked(root, sink, rebuild)
        } else {
            walk_recursive_locked(root, sink, rebuild)
        }
    }
}

impl Node {
    /// Text form of this subtree
    pub fn to_text(&self) -> String {
        TreeWalker::default().to_text(self)
    }

    /// Text form of this subtree, ignoring cached output
    pub fn to_text_rebuild(&self) -> String {
        TreeWalker::default().to_text_rebuild(self)
    }
}
