//! Stream Module
//!
//! Turns raw byte streams into delimited, decoded messages.
//!
//! ## Responsibilities
//! - Buffer each direction until a complete message is available
//! - Number messages in capture order
//! - Run the first decoding pass per connection
//! - Read text transcripts and replay decoded messages in any order

mod reassembler;
mod session;
mod transcript;

pub use reassembler::StreamReassembler;
pub use session::{FramedMessage, MessageIds, StreamSession};
pub use transcript::{
    decode_hex, dissect_transcript, parse_transcript, read_transcript, replay, TranscriptRecord,
};
