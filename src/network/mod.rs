//! Network Module
//!
//! Live tap: a TCP pass-through proxy that decodes what it relays.
//!
//! ## Architecture
//! - Single acceptor loop (non-blocking, polls the shutdown flag)
//! - One relay thread per direction per connection
//! - One decoder per connection, fed in arrival order over a channel
//! - Decoded messages published as [`TapEvent`]s
//! - SIGINT/SIGTERM stop the acceptor through its shutdown flag

mod connection;
mod server;

pub use connection::TapConnection;
pub use server::{register_shutdown_signals, TapServer};

use crate::conversation::ConnectionId;
use crate::message::DecodedMessage;

/// Something the tap observed
#[derive(Debug, Clone)]
pub enum TapEvent {
    /// A message was decoded
    Message {
        connection: ConnectionId,
        message: DecodedMessage,
    },

    /// Both directions of a connection closed
    Closed { connection: ConnectionId },
}
