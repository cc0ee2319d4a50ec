//! Binary tree codec
//!
//! A stream is a three byte header (version, name length width, value length
//! width) followed by one record per node in breadth-first order. A record's
//! name is its parent's slot as optimized integer bytes, empty for the root.
//! Its first value names the node: the tag name of an element or a marker for
//! a leaf. The remaining values are an element's attributes or a leaf's
//! content.

use std::collections::VecDeque;

use arbor_dom::{Attribute, Content, LockCoordinator, Node, TagType};

use crate::ints::{bytes_to_int, canonical_int, int_to_bytes};
use crate::message::{RecordReader, write_record};
use crate::registry::{
    FIRST_NAME_INDEX, HTML_MARKER, NUMERIC_HTML_MARKER, NUMERIC_TEXT_MARKER, NameRegistry,
    TEXT_MARKER,
};
use crate::{WireConfig, WireError, WireVersion};

const LEN_WIDTH: u8 = 4;

/// Leaf kinds as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafMarker {
    Text,
    Html,
    NumericText,
    NumericHtml,
}

impl LeafMarker {
    fn as_str(self) -> &'static str {
        match self {
            LeafMarker::Text => TEXT_MARKER,
            LeafMarker::Html => HTML_MARKER,
            LeafMarker::NumericText => NUMERIC_TEXT_MARKER,
            LeafMarker::NumericHtml => NUMERIC_HTML_MARKER,
        }
    }

    fn parse(marker: &str, version: WireVersion) -> Option<Self> {
        match marker {
            TEXT_MARKER => Some(LeafMarker::Text),
            HTML_MARKER => Some(LeafMarker::Html),
            NUMERIC_TEXT_MARKER if version == WireVersion::V3 => Some(LeafMarker::NumericText),
            NUMERIC_HTML_MARKER if version == WireVersion::V3 => Some(LeafMarker::NumericHtml),
            _ => None,
        }
    }

    fn is_html(self) -> bool {
        matches!(self, LeafMarker::Html | LeafMarker::NumericHtml)
    }
}

/// Encodes trees to and decodes trees from the binary wire format
#[derive(Debug, Clone, Default)]
pub struct WireCodec {
    config: WireConfig,
    registry: NameRegistry,
}

impl WireCodec {
    pub fn new(config: WireConfig) -> Self {
        Self {
            config,
            registry: NameRegistry::new(),
        }
    }

    /// Codec with a custom name registry
    pub fn with_registry(config: WireConfig, registry: NameRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    fn indexed(&self) -> bool {
        self.config.version != WireVersion::Plain
    }

    /// Encode the subtree under `root`
    ///
    /// The subtree is read-locked for the whole call, so the output is one
    /// consistent snapshot.
    pub fn encode(&self, root: &Node) -> Result<Vec<u8>, WireError> {
        let _guard = LockCoordinator::read(root);
        let mut out = vec![self.config.version.byte(), LEN_WIDTH, LEN_WIDTH];

        // Slots are assigned in pop order, so a parent's slot always precedes
        // its children's.
        let mut queue: VecDeque<(Node, Option<i32>)> = VecDeque::new();
        queue.push_back((root.clone(), None));
        let mut slot: i32 = 0;
        while let Some((node, parent)) = queue.pop_front() {
            let name = parent.map(int_to_bytes).unwrap_or_default();
            let values = self.node_values(&node.content())?;
            write_record(&mut out, &name, &values)?;

            for child in node.children() {
                queue.push_back((child, Some(slot)));
            }
            slot = slot.checked_add(1).ok_or(WireError::TooLarge)?;
        }

        tracing::debug!(
            version = ?self.config.version,
            records = slot,
            bytes = out.len(),
            "tree encoded"
        );
        Ok(out)
    }

    fn node_values(&self, content: &Content) -> Result<Vec<Vec<u8>>, WireError> {
        match content {
            Content::Element(element) => {
                let mut values = Vec::with_capacity(element.attributes().len() + 1);
                values.push(self.encode_tag_name(element.name())?);
                for attr in element.attributes() {
                    values.push(self.encode_attribute(attr)?);
                }
                Ok(values)
            }
            Content::Leaf(leaf) => {
                let numeric = match self.config.version {
                    WireVersion::V3 => canonical_int(leaf.text()),
                    WireVersion::Plain | WireVersion::V2 => None,
                };
                let (marker, value) = match (numeric, leaf.is_html()) {
                    (Some(n), true) => (LeafMarker::NumericHtml, int_to_bytes(n)),
                    (Some(n), false) => (LeafMarker::NumericText, int_to_bytes(n)),
                    (None, is_html) => {
                        let mut bytes = Vec::with_capacity(leaf.text().len());
                        self.config.charset.encode(leaf.text(), &mut bytes)?;
                        let marker = if is_html { LeafMarker::Html } else { LeafMarker::Text };
                        (marker, bytes)
                    }
                };
                Ok(vec![self.encode_marker(marker)?, value])
            }
        }
    }

    fn encode_marker(&self, marker: LeafMarker) -> Result<Vec<u8>, WireError> {
        if !self.indexed() {
            return Ok(marker.as_str().as_bytes().to_vec());
        }
        let index = self
            .registry
            .entry_index(marker.as_str())
            .ok_or(WireError::InvalidMarker)?;
        Ok(index_bytes(index))
    }

    fn encode_tag_name(&self, name: &str) -> Result<Vec<u8>, WireError> {
        let charset = self.config.charset;
        if !self.indexed() {
            if LeafMarker::parse(name, self.config.version).is_some() {
                return Err(WireError::ReservedName(name.to_string()));
            }
            let mut bytes = Vec::with_capacity(name.len());
            charset.encode(name, &mut bytes)?;
            return Ok(bytes);
        }
        match self.registry.index_of(name) {
            Some(index) => Ok(index_bytes(index)),
            None => {
                let mut bytes = Vec::with_capacity(name.len() + 1);
                bytes.push(0);
                charset.encode(name, &mut bytes)?;
                Ok(bytes)
            }
        }
    }

    fn encode_attribute(&self, attr: &Attribute) -> Result<Vec<u8>, WireError> {
        let charset = self.config.charset;
        let mut bytes = Vec::with_capacity(attr.name.len() + attr.value.len() + 2);
        match self.registry.index_of(&attr.name).filter(|_| self.indexed()) {
            Some(index) => {
                let index = int_to_bytes(index_to_i32(index)?);
                bytes.push(index.len() as u8);
                bytes.extend_from_slice(&index);
            }
            None => {
                if self.indexed() {
                    bytes.push(0);
                }
                charset.encode(&attr.name, &mut bytes)?;
                bytes.push(b'=');
            }
        }
        charset.encode(&attr.value, &mut bytes)?;
        Ok(bytes)
    }

    /// Decode one tree
    ///
    /// Fails without returning a partial tree on any malformed record.
    pub fn decode(&self, bytes: &[u8]) -> Result<Node, WireError> {
        let header = match bytes {
            [] => return Err(WireError::Empty),
            [version, name_width, value_width, ..] => (*version, *name_width, *value_width),
            _ => return Err(WireError::Truncated),
        };
        let found = WireVersion::from_byte(header.0).ok_or(WireError::UnsupportedVersion(header.0))?;
        if found != self.config.version {
            return Err(WireError::VersionMismatch {
                expected: self.config.version,
                found,
            });
        }
        if header.1 != LEN_WIDTH || header.2 != LEN_WIDTH {
            return Err(WireError::InvalidHeader);
        }

        let mut reader = RecordReader::new(&bytes[3..]);
        let mut slots: Vec<Node> = Vec::new();
        while let Some(record) = reader.next_record()? {
            let index = slots.len();
            let parent = if index == 0 {
                if !record.name.is_empty() {
                    return Err(WireError::MissingRootSentinel);
                }
                None
            } else {
                if record.name.is_empty() {
                    return Err(WireError::MissingParentSlot(index));
                }
                let parent = bytes_to_int(&record.name)?;
                let known = usize::try_from(parent).ok().filter(|&p| p < index);
                let Some(known) = known else {
                    return Err(WireError::ForwardParentReference { record: index, parent });
                };
                Some(known)
            };

            let node = self.build_node(&record.values)?;
            if let Some(parent) = parent {
                slots[parent].append_child(&node)?;
            }
            slots.push(node);
        }

        tracing::debug!(version = ?found, records = slots.len(), "tree decoded");
        slots.into_iter().next().ok_or(WireError::MissingRootSentinel)
    }

    fn build_node(&self, values: &[Vec<u8>]) -> Result<Node, WireError> {
        let (head, rest) = values.split_first().ok_or(WireError::Truncated)?;
        let name = self.decode_name(head)?;

        if let Some(marker) = name.as_deref().and_then(|n| LeafMarker::parse(n, self.config.version)) {
            let [content] = rest else {
                return Err(WireError::InvalidMarker);
            };
            let text = match marker {
                LeafMarker::NumericText | LeafMarker::NumericHtml => bytes_to_int(content)?.to_string(),
                LeafMarker::Text | LeafMarker::Html => self.config.charset.decode(content)?,
            };
            return Ok(Node::leaf(text, marker.is_html()));
        }

        let name = match name {
            Some(name) => name,
            None => self.config.charset.decode(&head[1..])?,
        };
        let mut attributes = Vec::with_capacity(rest.len());
        for raw in rest {
            attributes.push(self.decode_attribute(raw)?);
        }
        let borrowed: Vec<(&str, &str)> = attributes.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
        Ok(Node::element_with_type(&name, TagType::OpeningClosing, &borrowed)?)
    }

    /// Registered name or marker of the first value
    ///
    /// `None` means an unregistered tag name follows a `0` sentinel byte.
    fn decode_name(&self, bytes: &[u8]) -> Result<Option<String>, WireError> {
        if !self.indexed() {
            return Ok(Some(self.config.charset.decode(bytes)?));
        }
        let index = match bytes {
            [] => return Err(WireError::Truncated),
            [0, ..] => return Ok(None),
            [single] => u32::from(*single),
            [len, index @ ..] => {
                if index.len() != usize::from(*len) {
                    return Err(WireError::InvalidInteger(index.len()));
                }
                index_from_bytes(index)?
            }
        };
        let name = self.registry.name(index).ok_or(WireError::UnknownNameIndex(index))?;
        // Reserved slots only ever carry the markers this version writes.
        if index < FIRST_NAME_INDEX && LeafMarker::parse(name, self.config.version).is_none() {
            return Err(WireError::InvalidMarker);
        }
        Ok(Some(name.to_string()))
    }

    fn decode_attribute(&self, bytes: &[u8]) -> Result<(String, String), WireError> {
        let charset = self.config.charset;
        let raw = match bytes {
            [0, rest @ ..] if self.indexed() => rest,
            [len, rest @ ..] if self.indexed() => {
                let len = usize::from(*len);
                if rest.len() < len {
                    return Err(WireError::MalformedAttribute);
                }
                let index = index_from_bytes(&rest[..len])?;
                let name = self
                    .registry
                    .name(index)
                    .filter(|_| index >= FIRST_NAME_INDEX)
                    .ok_or(WireError::UnknownNameIndex(index))?;
                return Ok((name.to_string(), charset.decode(&rest[len..])?));
            }
            raw => raw,
        };
        let split = raw.iter().position(|&b| b == b'=').ok_or(WireError::MalformedAttribute)?;
        Ok((charset.decode(&raw[..split])?, charset.decode(&raw[split + 1..])?))
    }
}

fn index_to_i32(index: u32) -> Result<i32, WireError> {
    i32::try_from(index).map_err(|_| WireError::TooLarge)
}

/// Registry index as a tag-name value: one raw byte, or length-prefixed
fn index_bytes(index: u32) -> Vec<u8> {
    let bytes = int_to_bytes(index as i32);
    if bytes.len() == 1 {
        return bytes;
    }
    let mut out = Vec::with_capacity(bytes.len() + 1);
    out.push(bytes.len() as u8);
    out.extend_from_slice(&bytes);
    out
}

fn index_from_bytes(bytes: &[u8]) -> Result<u32, WireError> {
    let value = bytes_to_int(bytes)?;
    u32::try_from(value).map_err(|_| WireError::InvalidInteger(bytes.len()))
}
