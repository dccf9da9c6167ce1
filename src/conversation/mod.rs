//! Conversation Module
//!
//! Request/response correlation per connection.
//!
//! ## Responsibilities
//! - Queue requests in arrival order
//! - Pair each response with the oldest pending request (FIFO)
//! - Memoize pairings so a replay pass reproduces them exactly
//! - Create state on first use, drop it when the connection ends

mod state;
mod store;

pub use state::{ConversationState, PendingRequest, ResolvedMatch};
pub use store::{ConnectionId, ConversationStore};
