//! Stream session
//!
//! Drives one connection: both reassemblers, message numbering, and the
//! first decoding pass through the [`Dissector`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::conversation::ConnectionId;
use crate::dissector::Dissector;
use crate::error::Result;
use crate::message::DecodedMessage;
use crate::protocol::Direction;
use super::StreamReassembler;

/// Capture-order message numbering shared by several sessions
#[derive(Debug, Clone)]
pub struct MessageIds {
    next: Arc<AtomicU64>,
}

impl MessageIds {
    /// Numbering that starts at 1
    pub fn new() -> Self {
        Self {
            next: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for MessageIds {
    fn default() -> Self {
        Self::new()
    }
}

/// A delimited message together with its first-pass decode
#[derive(Debug, Clone)]
pub struct FramedMessage {
    pub connection: ConnectionId,
    pub direction: Direction,
    pub message_id: u64,
    pub bytes: Bytes,
    pub decoded: DecodedMessage,
}

/// First-pass decoder for one connection
pub struct StreamSession {
    connection: ConnectionId,
    dissector: Arc<Dissector>,
    ids: MessageIds,
    requests: StreamReassembler,
    responses: StreamReassembler,

    /// Set after a framing failure; nothing more is decoded
    halted: bool,

    /// Keep replay bookkeeping for decoded exchanges (on by default)
    retain_history: bool,
}

impl StreamSession {
    pub fn new(connection: ConnectionId, dissector: Arc<Dissector>, ids: MessageIds) -> Self {
        let max = dissector.config().max_message_size;
        Self {
            connection,
            dissector,
            ids,
            requests: StreamReassembler::new(Direction::Request, max),
            responses: StreamReassembler::new(Direction::Response, max),
            halted: false,
            retain_history: true,
        }
    }

    pub fn connection(&self) -> &ConnectionId {
        &self.connection
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Whether decoded exchanges stay available for replay
    ///
    /// With history off, each response and its request are released from
    /// the conversation as soon as the response is decoded, so a
    /// long-lived connection holds only its outstanding requests. Replaying
    /// those messages afterwards is not supported.
    pub fn set_retain_history(&mut self, retain: bool) {
        self.retain_history = retain;
    }

    /// Feed a chunk seen in `direction` and decode every completed message
    ///
    /// A framing failure halts the session: it is returned once, and later
    /// chunks are ignored.
    pub fn feed(&mut self, direction: Direction, data: &[u8]) -> Result<Vec<FramedMessage>> {
        if self.halted {
            tracing::trace!("{}: halted, ignoring {} bytes", self.connection, data.len());
            return Ok(Vec::new());
        }

        let reassembler = match direction {
            Direction::Request => &mut self.requests,
            Direction::Response => &mut self.responses,
        };

        let chunks = match reassembler.push(data) {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!("{}: {}; decoding stopped", self.connection, e);
                self.halted = true;
                self.requests.clear();
                self.responses.clear();
                return Err(e);
            }
        };

        let mut framed = Vec::with_capacity(chunks.len());
        for bytes in chunks {
            let message_id = self.ids.next_id();
            let decoded = self
                .dissector
                .decode(&self.connection, direction, &bytes, message_id)?;
            tracing::debug!("{} #{}: {}", self.connection, message_id, decoded.summary);

            if !self.retain_history && direction == Direction::Response {
                self.dissector.forget_response(&self.connection, message_id);
            }

            framed.push(FramedMessage {
                connection: self.connection,
                direction,
                message_id,
                bytes,
                decoded,
            });
        }

        Ok(framed)
    }

    /// Bytes buffered in each direction (requests, responses)
    pub fn buffered(&self) -> (usize, usize) {
        (self.requests.len(), self.responses.len())
    }
}
