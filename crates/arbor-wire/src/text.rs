//! Text form parser
//!
//! Rebuilds a tree from the markup produced by the tree walker. Closing tags
//! must match the innermost open element; names in the void set open
//! `NonClosing` elements that take no children. Only the five entities the
//! walker can emit are decoded, anything else after `&` stays literal.
//!
//! Html leaves come back as parsed markup and adjacent text leaves come back
//! merged, so only trees without either round-trip exactly.

use std::collections::HashSet;

use arbor_dom::{Node, TagType, TreeError};

/// HTML elements without content or closing tag
pub const HTML_VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const ENTITIES: &[(&str, char)] = &[
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&#39;", '\''),
];

/// Parse failure with the byte offset where it was detected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at byte {offset}")]
pub struct TextParseError {
    pub offset: usize,
    pub kind: TextParseErrorKind,
}

impl TextParseError {
    fn new(offset: usize, kind: TextParseErrorKind) -> Self {
        Self { offset, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextParseErrorKind {
    #[error("unexpected end of input inside a tag")]
    UnexpectedEnd,

    #[error("closing tag </{found}> does not match <{expected}>")]
    MismatchedClose { expected: String, found: String },

    #[error("closing tag </{0}> without an open element")]
    UnexpectedClose(String),

    #[error("element <{0}> is never closed")]
    UnclosedTag(String),

    #[error("malformed tag")]
    InvalidTag,

    #[error("more than one top-level node")]
    MultipleRoots,

    #[error("no top-level node")]
    EmptyDocument,

    #[error(transparent)]
    Tree(#[from] TreeError),
}

struct OpenTag<'a> {
    name: &'a str,
    attributes: Vec<(&'a str, String)>,
    self_closing: bool,
}

/// Iterative markup parser
#[derive(Debug, Clone)]
pub struct TextParser {
    void_tags: HashSet<String>,
}

impl Default for TextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TextParser {
    /// Parser treating the HTML void elements as non-closing
    pub fn new() -> Self {
        Self::with_void_tags(HTML_VOID_TAGS.iter().copied())
    }

    pub fn with_void_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            void_tags: tags.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn is_void(&self, name: &str) -> bool {
        self.void_tags.contains(name)
    }

    /// Parse exactly one top-level node
    ///
    /// Whitespace-only text outside the top-level element is ignored.
    pub fn parse(&self, input: &str) -> Result<Node, TextParseError> {
        let bytes = input.as_bytes();
        let mut open: Vec<(Node, &str, usize)> = Vec::new();
        let mut top: Vec<(Node, usize)> = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            let start = pos;
            if bytes[pos] != b'<' {
                let end = find(bytes, pos, b'<').unwrap_or(bytes.len());
                let leaf = Node::text(unescape(&input[pos..end]));
                place(&open, &mut top, leaf, start)?;
                pos = end;
                continue;
            }

            if bytes.get(pos + 1) == Some(&b'/') {
                let end = find(bytes, pos, b'>')
                    .ok_or_else(|| TextParseError::new(start, TextParseErrorKind::UnexpectedEnd))?;
                let found = input[pos + 2..end].trim();
                match open.pop() {
                    Some((_, expected, _)) if expected == found => {}
                    Some((_, expected, _)) => {
                        return Err(TextParseError::new(
                            start,
                            TextParseErrorKind::MismatchedClose {
                                expected: expected.to_string(),
                                found: found.to_string(),
                            },
                        ));
                    }
                    None => {
                        return Err(TextParseError::new(
                            start,
                            TextParseErrorKind::UnexpectedClose(found.to_string()),
                        ));
                    }
                }
                pos = end + 1;
                continue;
            }

            let (tag, next) = parse_open_tag(input, start)?;
            let tag_type = if tag.self_closing {
                TagType::SelfClosing
            } else if self.is_void(tag.name) {
                TagType::NonClosing
            } else {
                TagType::OpeningClosing
            };
            let attributes: Vec<(&str, &str)> =
                tag.attributes.iter().map(|(n, v)| (*n, v.as_str())).collect();
            let element = Node::element_with_type(tag.name, tag_type, &attributes)
                .map_err(|e| TextParseError::new(start, e.into()))?;
            place(&open, &mut top, element.clone(), start)?;
            if tag_type == TagType::OpeningClosing {
                open.push((element, tag.name, start));
            }
            pos = next;
        }

        if let Some((_, name, offset)) = open.pop() {
            return Err(TextParseError::new(
                offset,
                TextParseErrorKind::UnclosedTag(name.to_string()),
            ));
        }

        top.retain(|(node, _)| {
            node.leaf_text()
                .is_none_or(|text| !text.chars().all(char::is_whitespace))
        });
        let mut top = top.into_iter();
        match (top.next(), top.next()) {
            (Some((root, _)), None) => {
                tracing::debug!(nodes = root.subtree_len(), "text form parsed");
                Ok(root)
            }
            (Some(_), Some((_, offset))) => Err(TextParseError::new(
                offset,
                TextParseErrorKind::MultipleRoots,
            )),
            (None, _) => Err(TextParseError::new(
                input.len(),
                TextParseErrorKind::EmptyDocument,
            )),
        }
    }
}

fn place(
    open: &[(Node, &str, usize)],
    top: &mut Vec<(Node, usize)>,
    node: Node,
    offset: usize,
) -> Result<(), TextParseError> {
    match open.last() {
        Some((parent, _, _)) => {
            parent
                .append_child(&node)
                .map_err(|e| TextParseError::new(offset, e.into()))?;
        }
        None => top.push((node, offset)),
    }
    Ok(())
}

fn find(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|i| from + i)
}

fn scan(bytes: &[u8], from: usize, stop: impl Fn(u8) -> bool) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| stop(b))
        .map_or(bytes.len(), |i| from + i)
}

fn skip_whitespace(bytes: &[u8], from: usize) -> usize {
    scan(bytes, from, |b| !b.is_ascii_whitespace())
}

/// `<name attr="value" ...>` or `.../>` starting at `start`
fn parse_open_tag(input: &str, start: usize) -> Result<(OpenTag<'_>, usize), TextParseError> {
    let bytes = input.as_bytes();
    let end_of_input = || TextParseError::new(start, TextParseErrorKind::UnexpectedEnd);
    let invalid = |at| TextParseError::new(at, TextParseErrorKind::InvalidTag);

    let name_start = start + 1;
    let name_end = scan(bytes, name_start, |b| {
        b.is_ascii_whitespace() || b == b'>' || b == b'/'
    });
    if name_end == bytes.len() {
        return Err(end_of_input());
    }
    if name_end == name_start {
        return Err(invalid(start));
    }
    let mut tag = OpenTag {
        name: &input[name_start..name_end],
        attributes: Vec::new(),
        self_closing: false,
    };

    let mut pos = name_end;
    loop {
        pos = skip_whitespace(bytes, pos);
        match bytes.get(pos) {
            None => return Err(end_of_input()),
            Some(b'>') => return Ok((tag, pos + 1)),
            Some(b'/') => {
                return match bytes.get(pos + 1) {
                    Some(b'>') => {
                        tag.self_closing = true;
                        Ok((tag, pos + 2))
                    }
                    None => Err(end_of_input()),
                    Some(_) => Err(invalid(pos)),
                };
            }
            Some(_) => {
                let attr_end = scan(bytes, pos, |b| {
                    b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/')
                });
                if attr_end == pos {
                    return Err(invalid(pos));
                }
                let name = &input[pos..attr_end];
                pos = attr_end;

                let mut value = String::new();
                if bytes.get(pos) == Some(&b'=') {
                    pos += 1;
                    let quote = match bytes.get(pos) {
                        Some(&q @ (b'"' | b'\'')) => q,
                        None => return Err(end_of_input()),
                        Some(_) => return Err(invalid(pos)),
                    };
                    let close = find(bytes, pos + 1, quote).ok_or_else(end_of_input)?;
                    value = unescape(&input[pos + 1..close]);
                    pos = close + 1;
                }
                tag.attributes.push((name, value));
            }
        }
    }
}

fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, c)) => {
                out.push(*c);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
