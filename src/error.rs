//! Error types for the Iggy dissector
//!
//! Provides a unified error type for all operations. Protocol-level
//! oddities that do not stop decoding (unknown commands, unmatched
//! responses, malformed payload lengths) are reported as diagnostics on
//! the decoded message instead; see [`crate::message::Diagnostic`].

use thiserror::Error;

/// Result type alias using DissectError
pub type Result<T> = std::result::Result<T, DissectError>;

/// Unified error type for dissector operations
#[derive(Debug, Error)]
pub enum DissectError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Decoding Errors
    // -------------------------------------------------------------------------
    /// A read asked for more bytes than the message range holds
    #[error("Truncated data at offset {offset}: wanted {wanted} bytes, {available} available")]
    TruncatedData {
        offset: usize,
        wanted: usize,
        available: usize,
    },

    /// A variable-width integer field outside 1..=8 bytes
    #[error("Unsupported integer width: {0} bytes")]
    IntegerWidth(usize),

    /// Message boundary cannot be determined; the stream is unrecoverable
    #[error("Framing error: {0}")]
    Framing(String),

    // -------------------------------------------------------------------------
    // Input / Output Format Errors
    // -------------------------------------------------------------------------
    /// Bytes given on the command line or in a record that are not valid hex
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Transcript error: {0}")]
    Transcript(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
