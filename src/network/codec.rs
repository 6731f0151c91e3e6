//! Wire Codec
//!
//! Field-level encoding shared by every event kind and control packet.
//!
//! ```text
//! string : [len: u32 BE][len bytes UTF-8]
//! i32    : [4 bytes BE]
//! bool   : [1 byte, 0 or 1]
//! vec2   : [x: i32 BE][y: i32 BE]   (Q16.16)
//! ```
//!
//! There is no schema version or checksum in the format. Two builds that
//! disagree on a field list will misparse each other's events; nothing here
//! tries to detect that.

use thiserror::Error;

use crate::core::vec2::FixedVec2;

/// Longest string accepted on either side of the wire.
pub const MAX_STRING_LEN: usize = 64 * 1024;

/// Errors produced while decoding a packet.
///
/// These never cross the network boundary: the session logs and drops the
/// offending message, then keeps processing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer ended before a field was complete.
    #[error("unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd {
        /// Bytes the field required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// String length prefix larger than `MAX_STRING_LEN`.
    #[error("string length {0} exceeds limit")]
    StringTooLong(usize),

    /// String bytes were not valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// Boolean byte other than 0 or 1.
    #[error("invalid bool byte {0:#04x}")]
    InvalidBool(u8),

    /// Payload had bytes left after the last field.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    /// Empty message.
    #[error("empty packet")]
    EmptyPacket,

    /// Leading packet-kind byte not recognised.
    #[error("unknown packet kind {0:#04x}")]
    UnknownPacketKind(u8),

    /// Event tag with no attached type.
    #[error("unknown event tag {0}")]
    UnknownTag(u8),

    /// Integer field outside its enum's range.
    #[error("invalid {kind} value {value}")]
    InvalidEnumValue {
        /// Name of the enum being decoded.
        kind: &'static str,
        /// Raw value found on the wire.
        value: i32,
    },

    /// Ownership snapshot batch failed to deserialize.
    #[error("snapshot decode error: {0}")]
    Snapshot(String),
}

/// Append-only writer for event payloads.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
    oversized: Option<usize>,
}

impl WireWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a single raw byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write a big-endian i32.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a bool as one byte.
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    /// Write a length-prefixed UTF-8 string.
    ///
    /// Strings longer than [`MAX_STRING_LEN`] are not written; the first
    /// such length is kept and reported by [`WireWriter::oversized`].
    pub fn write_string(&mut self, value: &str) {
        if value.len() > MAX_STRING_LEN {
            self.oversized.get_or_insert(value.len());
            return;
        }
        self.buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Write a fixed-point vector as two i32s.
    #[inline]
    pub fn write_vec2(&mut self, value: FixedVec2) {
        self.write_i32(value.x);
        self.write_i32(value.y);
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Length of the first string rejected by [`WireWriter::write_string`].
    pub fn oversized(&self) -> Option<usize> {
        self.oversized
    }

    /// Consume the writer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a received payload.
#[derive(Debug)]
pub struct WireReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Start reading at the beginning of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(DecodeError::UnexpectedEnd { needed, remaining });
        }
        let slice = &self.bytes[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    /// Read a single raw byte.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Read a big-endian i32.
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let raw = self.take(4)?;
        Ok(i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Read a one-byte bool, rejecting anything but 0 or 1.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidBool(other)),
        }
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let raw = self.take(4)?;
        let len = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
        if len > MAX_STRING_LEN {
            return Err(DecodeError::StringTooLong(len));
        }
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Read a fixed-point vector.
    pub fn read_vec2(&mut self) -> Result<FixedVec2, DecodeError> {
        let x = self.read_i32()?;
        let y = self.read_i32()?;
        Ok(FixedVec2::new(x, y))
    }

    /// Consume the rest of the buffer as raw bytes.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        rest
    }

    /// Ensure every byte was consumed.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_layout() {
        let mut w = WireWriter::new();
        w.write_string("ab");
        assert_eq!(w.into_bytes(), vec![0, 0, 0, 2, b'a', b'b']);
    }

    #[test]
    fn test_i32_big_endian() {
        let mut w = WireWriter::new();
        w.write_i32(-2);
        w.write_i32(0x01020304);
        assert_eq!(w.into_bytes(), vec![0xff, 0xff, 0xff, 0xfe, 1, 2, 3, 4]);
    }

    #[test]
    fn test_read_fields_in_order() {
        let mut w = WireWriter::new();
        w.write_string("carrot");
        w.write_i32(i32::MIN);
        w.write_bool(true);
        w.write_vec2(FixedVec2::from_ints(-3, 7));
        let bytes = w.into_bytes();

        let mut r = WireReader::new(&bytes);
        assert_eq!(r.read_string().unwrap(), "carrot");
        assert_eq!(r.read_i32().unwrap(), i32::MIN);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_vec2().unwrap(), FixedVec2::from_ints(-3, 7));
        assert!(r.finish().is_ok());
    }

    #[test]
    fn test_truncated_string() {
        let bytes = [0, 0, 0, 5, b'a', b'b'];
        let mut r = WireReader::new(&bytes);
        assert_eq!(
            r.read_string(),
            Err(DecodeError::UnexpectedEnd { needed: 5, remaining: 2 })
        );
    }

    #[test]
    fn test_truncated_i32() {
        let bytes = [0, 1];
        let mut r = WireReader::new(&bytes);
        assert!(matches!(r.read_i32(), Err(DecodeError::UnexpectedEnd { .. })));
    }

    #[test]
    fn test_invalid_utf8_and_bool() {
        let bytes = [0, 0, 0, 1, 0xff];
        assert_eq!(WireReader::new(&bytes).read_string(), Err(DecodeError::InvalidUtf8));
        assert_eq!(WireReader::new(&[2]).read_bool(), Err(DecodeError::InvalidBool(2)));
    }

    #[test]
    fn test_oversized_length_prefix() {
        let bytes = [0xff, 0xff, 0xff, 0xff];
        let mut r = WireReader::new(&bytes);
        assert!(matches!(r.read_string(), Err(DecodeError::StringTooLong(_))));
    }

    #[test]
    fn test_writer_refuses_oversized_string() {
        let mut w = WireWriter::new();
        w.write_string(&"x".repeat(MAX_STRING_LEN));
        assert_eq!(w.oversized(), None);
        let limit_len = w.len();

        w.write_string(&"y".repeat(MAX_STRING_LEN + 1));
        w.write_string(&"z".repeat(MAX_STRING_LEN + 7));
        assert_eq!(w.oversized(), Some(MAX_STRING_LEN + 1));
        assert_eq!(w.len(), limit_len);
    }

    #[test]
    fn test_trailing_bytes() {
        let bytes = [0, 0, 0, 1, 9];
        let mut r = WireReader::new(&bytes);
        r.read_i32().unwrap();
        assert_eq!(r.finish(), Err(DecodeError::TrailingBytes(1)));
    }
}
