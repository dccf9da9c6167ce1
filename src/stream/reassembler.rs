//! Stream reassembler
//!
//! Accumulates one direction of a TCP byte stream and splits off complete
//! messages as their boundaries become known.
//!
//! Uses `bytes::BytesMut` so split-off messages share the buffer
//! allocation instead of being copied.

use bytes::{Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::{checked_message_length, Direction, FrameLength};

/// Buffer for one direction of a connection
pub struct StreamReassembler {
    /// Which header layout applies
    direction: Direction,

    /// Bytes received but not yet part of a complete message
    buffer: BytesMut,

    /// Largest accepted length field
    max_message_size: u32,
}

impl StreamReassembler {
    pub fn new(direction: Direction, max_message_size: u32) -> Self {
        Self {
            direction,
            buffer: BytesMut::with_capacity(16 * 1024),
            max_message_size,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Append a chunk and return every message it completes
    ///
    /// Partial trailing data stays buffered for the next push. An `Err`
    /// is a framing failure; the buffer is left as it was so the caller
    /// can inspect it, but no further boundary can be trusted.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();
        loop {
            match checked_message_length(&self.buffer, self.direction, self.max_message_size)? {
                FrameLength::NeedMoreData => break,
                FrameLength::Complete(total) => {
                    if self.buffer.len() < total {
                        break;
                    }
                    messages.push(self.buffer.split_to(total).freeze());
                }
            }
        }

        Ok(messages)
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard buffered bytes
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
