//! # Iggy Dissector
//!
//! Passive inspection of the Iggy binary TCP protocol:
//! - Delimits messages in a continuous byte stream
//! - Classifies each message as request or response by server port
//! - Decodes headers and the payloads of registered commands
//! - Pairs every response with the request it answers, identically on
//!   first pass and on replay
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │          Byte source (transcript file / live tap)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ chunks, per direction
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │             Stream Session (reassembly + framing)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ complete messages
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Dissector                             │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │ Command Registry│                │  Conversation   │
//!   │  + payload      │                │  (FIFO pairing) │
//!   │    decoders     │                └─────────────────┘
//!   └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod message;
pub mod conversation;
pub mod dissector;
pub mod stream;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DissectError, Result};
pub use config::Config;
pub use conversation::ConnectionId;
pub use dissector::Dissector;
pub use message::{DecodedMessage, Diagnostic, DiagnosticKind, Field, FieldValue, Severity};
pub use protocol::{Direction, FrameLength};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the dissector
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
