//! Protocol Module
//!
//! Wire format of the Iggy binary TCP protocol: framing, headers, the
//! command registry and per-command payload decoders.
//!
//! ## Protocol Format (little-endian throughout)
//!
//! ### Request Format (client → server)
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (4)  │ Cmd (4)  │      Payload (Len - 4)      │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! `Len` counts the command code plus payload, not itself.
//!
//! ### Response Format (server → client)
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(4) │ Len (4)  │         Payload (Len)       │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! `Len` counts the payload only.
//!
//! ### Commands
//! - 1:   ping          - no payload
//! - 38:  user.login    - credentials / user id
//! - 302: topic.create  - topic parameters / created topic details
//!
//! Responses carry no command code; the command is recovered by pairing
//! the response with a pending request (see [`crate::conversation`]).

mod command;
mod cursor;
mod framer;
mod header;
mod payload;

pub use command::{
    CommandDescriptor, CommandRegistry, PayloadDecoder, PING, TOPIC_CREATE, USER_LOGIN,
};
pub use cursor::ByteCursor;
pub use framer::{checked_message_length, next_message_length, FrameLength};
pub use header::{
    status_name, Direction, MessageHeader, Status, LENGTH_FIELD_SIZE, MIN_HEADER_SIZE,
    REQUEST_HEADER_SIZE, RESPONSE_HEADER_SIZE,
};
pub use payload::{PayloadReader, STREAM_ID_NUMERIC, STREAM_ID_STRING};
