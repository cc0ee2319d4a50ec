//! Optimized integer bytes
//!
//! An `i32` stored as its shortest big-endian two's complement form, one to
//! four bytes long. Redundant leading `0x00`/`0xFF` bytes are dropped as long
//! as the sign bit of the remaining first byte is unchanged.

use crate::WireError;

/// Shortest big-endian two's complement bytes of `value`
pub fn int_to_bytes(value: i32) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 3 {
        let (lead, next) = (bytes[start], bytes[start + 1]);
        let redundant = (lead == 0x00 && next & 0x80 == 0) || (lead == 0xFF && next & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Inverse of [`int_to_bytes`]
pub fn bytes_to_int(bytes: &[u8]) -> Result<i32, WireError> {
    if bytes.is_empty() || bytes.len() > 4 {
        return Err(WireError::InvalidInteger(bytes.len()));
    }
    let mut value: i32 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in bytes {
        value = (value << 8) | i32::from(b);
    }
    Ok(value)
}

/// The value of `text` if it is exactly the decimal rendering of an `i32`
pub fn canonical_int(text: &str) -> Option<i32> {
    let value: i32 = text.parse().ok()?;
    (value.to_string() == text).then_some(value)
}
