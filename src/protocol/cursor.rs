//! Byte cursor
//!
//! Sequential, bounds-checked reader over one message's byte range.
//! All multi-byte integers on the wire are little-endian.

use crate::error::{DissectError, Result};

/// Sequential reader over a byte range
///
/// `base` is the position of `data[0]` within the enclosing message, so
/// offsets reported by [`ByteCursor::position`] and in errors are
/// message-absolute even when the cursor only covers the payload.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    base: usize,
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor starting at offset 0 of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Create a cursor whose first byte sits at `base` within the message
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self {
            data,
            base,
            offset: 0,
        }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Message-absolute position of the next byte
    pub fn position(&self) -> usize {
        self.base + self.offset
    }

    /// Bytes left in the range
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `len` bytes, or fail without moving
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(DissectError::TruncatedData {
                offset: self.position(),
                wanted: len,
                available: self.remaining(),
            });
        }

        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Read a little-endian unsigned integer of 1..=8 bytes
    pub fn read_uint_le(&mut self, len: usize) -> Result<u64> {
        if len == 0 || len > 8 {
            return Err(DissectError::IntegerWidth(len));
        }

        let bytes = self.read_bytes(len)?;
        let mut buf = [0u8; 8];
        buf[..len].copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read `len` bytes as UTF-8
    ///
    /// Invalid sequences are replaced with U+FFFD rather than failing;
    /// an inspector has to show whatever the peer sent.
    pub fn read_string_utf8(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
