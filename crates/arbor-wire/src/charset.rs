//! Text encodings for names and values

use crate::WireError;

/// Byte encoding of textual record content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    /// ISO-8859-1; only characters up to U+00FF are representable
    Latin1,
}

impl Charset {
    pub fn encode(self, text: &str, out: &mut Vec<u8>) -> Result<(), WireError> {
        match self {
            Charset::Utf8 => out.extend_from_slice(text.as_bytes()),
            Charset::Latin1 => {
                for c in text.chars() {
                    let byte = u8::try_from(u32::from(c)).map_err(|_| WireError::Charset(self))?;
                    out.push(byte);
                }
            }
        }
        Ok(())
    }

    pub fn decode(self, bytes: &[u8]) -> Result<String, WireError> {
        match self {
            Charset::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|_| WireError::Charset(self)),
            Charset::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}
