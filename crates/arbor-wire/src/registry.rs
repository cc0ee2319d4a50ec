//! Name registry - tag and attribute names to small integers
//!
//! Common tag and attribute names are registered up front so the indexed
//! wire versions can send them as one byte. Index 0 is the empty name and
//! doubles as the "not registered" sentinel; indexes 1 to 4 are the leaf
//! markers. Encoder and decoder must use registries with identical contents.

use std::collections::HashMap;

/// Marker of a text leaf
pub const TEXT_MARKER: &str = "#";
/// Marker of an html leaf
pub const HTML_MARKER: &str = "@";
/// Marker of an html leaf holding an integer
pub const NUMERIC_HTML_MARKER: &str = "$";
/// Marker of a text leaf holding an integer
pub const NUMERIC_TEXT_MARKER: &str = "%";

/// First index available to ordinary names
pub const FIRST_NAME_INDEX: u32 = 5;

const COMMON_TAGS: &[&str] = &[
    "html", "head", "body", "div", "span", "p", "a", "img",
    "ul", "ol", "li", "table", "tr", "td", "th", "thead", "tbody",
    "form", "input", "button", "select", "option", "textarea",
    "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "footer", "nav", "main", "section", "article", "aside",
    "script", "style", "link", "meta", "title",
    "br", "hr", "strong", "em", "b", "i", "u",
    "video", "audio", "canvas", "svg", "iframe",
];

const COMMON_ATTRS: &[&str] = &[
    "id", "class", "style", "href", "src", "alt", "title",
    "type", "name", "value", "placeholder", "disabled", "checked",
    "width", "height", "data", "role", "aria-label",
    "onclick", "onload", "onsubmit",
];

/// Bidirectional name <-> index table
#[derive(Debug, Clone)]
pub struct NameRegistry {
    names: Vec<Box<str>>,
    map: HashMap<Box<str>, u32>,
}

impl NameRegistry {
    /// Registry with only the reserved entries
    pub fn empty() -> Self {
        let mut registry = Self {
            names: Vec::with_capacity(128),
            map: HashMap::with_capacity(128),
        };
        for reserved in ["", TEXT_MARKER, HTML_MARKER, NUMERIC_HTML_MARKER, NUMERIC_TEXT_MARKER] {
            registry.register(reserved);
        }
        registry
    }

    /// Registry with common HTML tag and attribute names
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for name in COMMON_TAGS.iter().chain(COMMON_ATTRS) {
            registry.register(name);
        }
        registry
    }

    /// Register a name, returning its index
    /// If the name is already registered, returns the existing index
    pub fn register(&mut self, name: &str) -> u32 {
        if let Some(&index) = self.map.get(name) {
            return index;
        }
        let index = self.names.len() as u32;
        self.names.push(name.into());
        self.map.insert(name.into(), index);
        index
    }

    /// Index of an ordinary (non-reserved) name
    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.map.get(name).copied().filter(|&i| i >= FIRST_NAME_INDEX)
    }

    /// Index of any registered entry, markers included
    pub(crate) fn entry_index(&self, name: &str) -> Option<u32> {
        self.map.get(name).copied()
    }

    #[inline]
    pub fn name(&self, index: u32) -> Option<&str> {
        self.names.get(index as usize).map(|n| &**n)
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::new()
    }
}
