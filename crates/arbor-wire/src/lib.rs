//! arbor wire - serialized forms of arbor trees
//!
//! The binary codec writes one tree as a stream of name-value records in
//! breadth-first order, with three format versions: plain names, registry
//! indexes for common names, and indexes plus compact integer leaves. The
//! text parser reads back the markup produced by the tree walker.

mod charset;
mod codec;
mod ints;
mod message;
mod registry;
mod text;

pub use charset::Charset;
pub use codec::WireCodec;
pub use ints::{bytes_to_int, canonical_int, int_to_bytes};
pub use message::{Record, RecordReader, write_record};
pub use registry::{
    FIRST_NAME_INDEX, HTML_MARKER, NUMERIC_HTML_MARKER, NUMERIC_TEXT_MARKER, NameRegistry,
    TEXT_MARKER,
};
pub use text::{HTML_VOID_TAGS, TextParseError, TextParseErrorKind, TextParser};

use arbor_dom::{Node, TreeError};

/// Format version, written as the first byte of every stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireVersion {
    /// Names and markers as raw strings
    Plain,
    /// Registered names as indexes
    V2,
    /// V2 plus integer leaves as optimized integer bytes
    #[default]
    V3,
}

impl WireVersion {
    pub fn byte(self) -> u8 {
        match self {
            WireVersion::Plain => 1,
            WireVersion::V2 => 2,
            WireVersion::V3 => 3,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(WireVersion::Plain),
            2 => Some(WireVersion::V2),
            3 => Some(WireVersion::V3),
            _ => None,
        }
    }
}

/// Codec settings; both ends of a stream must agree on them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WireConfig {
    pub version: WireVersion,
    pub charset: Charset,
}

/// Binary codec errors
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("empty input")]
    Empty,

    #[error("input ends inside a record")]
    Truncated,

    #[error("invalid header length widths")]
    InvalidHeader,

    #[error("stream version {found:?} does not match decoder version {expected:?}")]
    VersionMismatch {
        expected: WireVersion,
        found: WireVersion,
    },

    #[error("unsupported stream version {0}")]
    UnsupportedVersion(u8),

    #[error("first record is not an unnamed root")]
    MissingRootSentinel,

    #[error("record {0} has no parent slot")]
    MissingParentSlot(usize),

    #[error("record {record} refers to parent slot {parent} that is not yet decoded")]
    ForwardParentReference { record: usize, parent: i32 },

    #[error("unknown name index {0}")]
    UnknownNameIndex(u32),

    #[error("invalid leaf marker")]
    InvalidMarker,

    #[error("malformed attribute")]
    MalformedAttribute,

    #[error("invalid {0}-byte integer")]
    InvalidInteger(usize),

    #[error("text not representable in {0:?}")]
    Charset(Charset),

    #[error("element name {0:?} collides with a leaf marker")]
    ReservedName(String),

    #[error("value too large for the record format")]
    TooLarge,

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Encode with the default configuration
pub fn encode(root: &Node) -> Result<Vec<u8>, WireError> {
    WireCodec::default().encode(root)
}

/// Decode with the default configuration
pub fn decode(bytes: &[u8]) -> Result<Node, WireError> {
    WireCodec::default().decode(bytes)
}

/// Parse the text form with the HTML void elements
pub fn parse_text(input: &str) -> Result<Node, TextParseError> {
    TextParser::new().parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_bytes() {
        for version in [WireVersion::Plain, WireVersion::V2, WireVersion::V3] {
            assert_eq!(WireVersion::from_byte(version.byte()), Some(version));
        }
        assert_eq!(WireVersion::from_byte(0), None);
        assert_eq!(WireVersion::default(), WireVersion::V3);
    }

    #[test]
    fn test_default_round_trip() {
        let root = Node::element("ul", &[("class", "list")]).unwrap();
        root.append_child(&Node::element("li", &[]).unwrap()).unwrap();
        let decoded = decode(&encode(&root).unwrap()).unwrap();
        assert_eq!(decoded.to_text(), root.to_text());
    }
}
