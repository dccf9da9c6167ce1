//! Conversation state
//!
//! Pending requests and memoized request/response pairings for one
//! connection.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;

/// A request still waiting for its response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    /// `None` for a request too short to carry its command code
    pub command_code: Option<u32>,
    pub message_id: u64,
}

/// A request paired with a response; immutable once stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMatch {
    pub command_code: Option<u32>,
    /// Id of the request message
    pub request_id: u64,
}

#[derive(Debug, Default)]
struct Inner {
    /// Arrival order; the head is the oldest outstanding request
    pending: VecDeque<PendingRequest>,

    /// Response id → pairing
    matches: HashMap<u64, ResolvedMatch>,

    /// Request id → response id
    responses: HashMap<u64, u64>,

    /// Message ids already decoded once on this connection
    visited: HashSet<u64>,
}

/// Per-connection correlation state
///
/// ## Correlation model
/// Responses carry no request token, so pairing is strict FIFO: the
/// oldest pending request goes to the next response. A server that
/// answers out of order on one connection will be mismatched.
///
/// ## First pass vs replay
/// Only the first decode of a message id may touch the pending queue.
/// A revisit of a response returns its stored match (or `None` again if
/// it was unmatched the first time); a revisit of a request never
/// re-enqueues it.
///
/// ## Memory
/// Replay support keeps every visited id and pairing until the connection
/// is torn down. A consumer that never revisits messages (the live tap)
/// releases each exchange with [`ConversationState::forget_response`].
///
/// ## Concurrency
/// The queue, the match maps and the visited set sit behind one mutex so
/// that pop-and-insert is atomic with respect to other resolutions.
#[derive(Debug, Default)]
pub struct ConversationState {
    inner: Mutex<Inner>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request for later matching (no-op if `message_id` was seen)
    ///
    /// Returns true if the request was queued.
    pub fn record_request(&self, command_code: Option<u32>, message_id: u64) -> bool {
        let mut inner = self.inner.lock();
        if !inner.visited.insert(message_id) {
            return false;
        }

        inner.pending.push_back(PendingRequest {
            command_code,
            message_id,
        });
        true
    }

    /// Pair a response with the oldest pending request
    ///
    /// Idempotent per `message_id`: a stored match is returned unchanged,
    /// and a response that found nothing on its first decode keeps
    /// finding nothing.
    pub fn resolve_response(&self, message_id: u64) -> Option<ResolvedMatch> {
        let mut inner = self.inner.lock();
        if let Some(found) = inner.matches.get(&message_id) {
            return Some(*found);
        }

        if !inner.visited.insert(message_id) {
            return None;
        }

        let pending = inner.pending.pop_front()?;
        let resolved = ResolvedMatch {
            command_code: pending.command_code,
            request_id: pending.message_id,
        };
        inner.matches.insert(message_id, resolved);
        inner.responses.insert(pending.message_id, message_id);
        Some(resolved)
    }

    /// Stored pairing for a response, without side effects
    pub fn match_for(&self, response_id: u64) -> Option<ResolvedMatch> {
        self.inner.lock().matches.get(&response_id).copied()
    }

    /// Id of the response that answered `request_id`, once known
    pub fn response_for(&self, request_id: u64) -> Option<u64> {
        self.inner.lock().responses.get(&request_id).copied()
    }

    /// Drop everything remembered about a decoded response and its request
    ///
    /// Only for callers that will never decode either message again: a
    /// later revisit would resolve as a first decode.
    pub fn forget_response(&self, response_id: u64) {
        let mut inner = self.inner.lock();
        inner.visited.remove(&response_id);
        if let Some(resolved) = inner.matches.remove(&response_id) {
            inner.responses.remove(&resolved.request_id);
            inner.visited.remove(&resolved.request_id);
        }
    }

    /// Bookkeeping entries held for replay (visited ids plus stored pairings)
    pub fn history_len(&self) -> usize {
        let inner = self.inner.lock();
        inner.visited.len() + inner.matches.len() + inner.responses.len()
    }

    /// Whether `message_id` has been decoded on this connection before
    pub fn is_visited(&self, message_id: u64) -> bool {
        self.inner.lock().visited.contains(&message_id)
    }

    /// Requests still waiting, oldest first
    pub fn pending(&self) -> Vec<PendingRequest> {
        self.inner.lock().pending.iter().copied().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn match_count(&self) -> usize {
        self.inner.lock().matches.len()
    }
}
