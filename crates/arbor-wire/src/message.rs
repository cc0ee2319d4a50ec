//! Name-value record framing
//!
//! Each record is `[name len u32][name][value len u32][value]`, all lengths
//! big-endian. A record with one value stores it raw. A record with several
//! values stores them as concatenated `[len u32][bytes]` items and is
//! followed by one `A` byte that is not counted in the value length.

use crate::WireError;

const MULTI_VALUE_MARKER: u8 = b'A';
const LEN_WIDTH: usize = 4;

/// One decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: Vec<u8>,
    pub values: Vec<Vec<u8>>,
}

fn put_len(out: &mut Vec<u8>, len: usize) -> Result<(), WireError> {
    let len = u32::try_from(len).map_err(|_| WireError::TooLarge)?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

/// Append one record to `out`
pub fn write_record(out: &mut Vec<u8>, name: &[u8], values: &[Vec<u8>]) -> Result<(), WireError> {
    put_len(out, name.len())?;
    out.extend_from_slice(name);

    if let [single] = values {
        put_len(out, single.len())?;
        out.extend_from_slice(single);
        return Ok(());
    }

    let total: usize = values.iter().map(|v| LEN_WIDTH + v.len()).sum();
    put_len(out, total)?;
    for value in values {
        put_len(out, value.len())?;
        out.extend_from_slice(value);
    }
    out.push(MULTI_VALUE_MARKER);
    Ok(())
}

/// Sequential reader over a record stream
pub struct RecordReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(len).ok_or(WireError::Truncated)?;
        let slice = self.bytes.get(self.pos..end).ok_or(WireError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn take_len(&mut self) -> Result<usize, WireError> {
        let raw = self.take(LEN_WIDTH)?;
        let len = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        Ok(len as usize)
    }

    /// Next record, or `None` at the end of the stream
    pub fn next_record(&mut self) -> Result<Option<Record>, WireError> {
        if self.pos == self.bytes.len() {
            return Ok(None);
        }
        let name_len = self.take_len()?;
        let name = self.take(name_len)?.to_vec();
        let value_len = self.take_len()?;
        let value = self.take(value_len)?;

        // A following record starts with a name length far below 0x41000000.
        if self.bytes.get(self.pos) != Some(&MULTI_VALUE_MARKER) {
            return Ok(Some(Record {
                name,
                values: vec![value.to_vec()],
            }));
        }
        self.pos += 1;

        let mut inner = RecordReader::new(value);
        let mut values = Vec::new();
        while inner.pos < value.len() {
            let len = inner.take_len()?;
            values.push(inner.take(len)?.to_vec());
        }
        Ok(Some(Record { name, values }))
    }
}
