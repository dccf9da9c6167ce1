//! Frame framer
//!
//! Computes the length of the next complete message at the head of a byte
//! stream. The length field sits at a different offset and counts a
//! different span depending on direction:
//!
//! ```text
//! Request:  [len (4)][cmd (4)][payload]     total = 4 + len
//! Response: [status (4)][len (4)][payload]  total = 8 + len
//! ```
//!
//! Getting this asymmetry wrong misaligns every later boundary in the stream.

use crate::error::{DissectError, Result};
use super::header::{Direction, MIN_HEADER_SIZE};

/// Outcome of a framing attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLength {
    /// The next message occupies exactly this many bytes
    Complete(usize),

    /// Not enough prefix bytes to decide; buffer more and retry
    NeedMoreData,
}

/// Read the raw length field for `direction` (needs 8 bytes of prefix)
fn length_field(prefix: &[u8], direction: Direction) -> Option<u32> {
    if prefix.len() < MIN_HEADER_SIZE {
        return None;
    }

    let at = match direction {
        Direction::Request => 0,
        Direction::Response => 4,
    };
    Some(u32::from_le_bytes([
        prefix[at],
        prefix[at + 1],
        prefix[at + 2],
        prefix[at + 3],
    ]))
}

/// Length of the next message, without any size policy
pub fn next_message_length(prefix: &[u8], direction: Direction) -> FrameLength {
    match length_field(prefix, direction) {
        None => FrameLength::NeedMoreData,
        Some(length) => {
            let header = match direction {
                Direction::Request => 4,
                Direction::Response => 8,
            };
            FrameLength::Complete(header + length as usize)
        }
    }
}

/// Length of the next message, rejecting length fields above `max_message_size`
///
/// A rejected length is a framing failure: nothing after it in the stream
/// can be delimited.
pub fn checked_message_length(
    prefix: &[u8],
    direction: Direction,
    max_message_size: u32,
) -> Result<FrameLength> {
    if let Some(length) = length_field(prefix, direction) {
        if length > max_message_size {
            return Err(DissectError::Framing(format!(
                "{} length {} exceeds maximum {}",
                direction, length, max_message_size
            )));
        }
    }

    Ok(next_message_length(prefix, direction))
}
