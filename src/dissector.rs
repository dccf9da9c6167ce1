//! Dissector Module
//!
//! Orchestrates framing, header decoding, command dispatch, payload
//! decoding and correlation for one message at a time.
//!
//! ## Responsibilities
//! - Classify direction from the configured server port
//! - Delimit messages (request and response length rules differ)
//! - Decode headers and, for registered commands, payloads
//! - Record requests and pair responses through per-connection state
//! - Contain payload-level failures to the message being decoded

use std::sync::atomic::{AtomicU16, Ordering};

use crate::config::Config;
use crate::conversation::{ConnectionId, ConversationState, ConversationStore};
use crate::error::{DissectError, Result};
use crate::message::{DecodedMessage, Diagnostic, Field};
use crate::protocol::{
    checked_message_length, status_name, ByteCursor, CommandRegistry, Direction, FrameLength,
    MessageHeader, PayloadDecoder, PayloadReader, Status, LENGTH_FIELD_SIZE, MIN_HEADER_SIZE,
};

/// Command name shown for responses that found no pending request
pub const NO_MATCHING_REQUEST: &str = "No matching request";

/// Command name shown for requests too short to carry a command code, and
/// for the responses paired with them
pub const MALFORMED_REQUEST: &str = "Malformed request";

/// The decoding engine
///
/// ## Passes
/// Messages of one connection must be decoded in stream order the first
/// time (that pass builds the correlation state). Afterwards any message
/// may be decoded again in any order and yields the same result; only a
/// first decode of a message id touches the pending-request queue.
///
/// ## Concurrency
/// All methods take `&self`. Different connections have independent
/// state; messages of the same connection serialize on that
/// connection's state lock.
pub struct Dissector {
    /// Dissector configuration
    config: Config,

    /// Server port, changeable at runtime
    server_port: AtomicU16,

    /// Known commands
    registry: CommandRegistry,

    /// Per-connection correlation state
    conversations: ConversationStore,
}

impl Dissector {
    /// Create a dissector with the built-in command set
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, CommandRegistry::builtin())
    }

    /// Create a dissector with a custom command set
    pub fn with_registry(config: Config, registry: CommandRegistry) -> Self {
        Self {
            server_port: AtomicU16::new(config.server_port),
            config,
            registry,
            conversations: ConversationStore::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn server_port(&self) -> u16 {
        self.server_port.load(Ordering::Relaxed)
    }

    /// Point the dissector at a different server port
    pub fn set_server_port(&self, port: u16) {
        let previous = self.server_port.swap(port, Ordering::Relaxed);
        if previous != port {
            tracing::info!("Server port changed from {} to {}", previous, port);
        }
    }

    /// Direction of a segment from its TCP ports, `None` if it is not ours
    pub fn classify(&self, src_port: u16, dst_port: u16) -> Option<Direction> {
        let server = self.server_port();
        if dst_port == server {
            Some(Direction::Request)
        } else if src_port == server {
            Some(Direction::Response)
        } else {
            None
        }
    }

    /// Length of the next message at the head of `prefix`
    ///
    /// `Err` means the stream cannot be delimited any further.
    pub fn frame_length(&self, prefix: &[u8], direction: Direction) -> Result<FrameLength> {
        checked_message_length(prefix, direction, self.config.max_message_size)
    }

    /// Drop the state of a finished connection
    pub fn close_conversation(&self, connection: &ConnectionId) {
        self.conversations.remove(connection);
    }

    /// Release the replay bookkeeping of a response and its request
    ///
    /// For consumers that never decode a message twice; see
    /// [`ConversationState::forget_response`].
    pub fn forget_response(&self, connection: &ConnectionId, response_id: u64) {
        if let Some(conversation) = self.conversations.get(connection) {
            conversation.forget_response(response_id);
        }
    }

    /// Decode one complete message
    ///
    /// `bytes` should span the message as delimited by
    /// [`Dissector::frame_length`]. Only a range too short for the length
    /// field (4 bytes for a request, the 8-byte header for a response) is
    /// an error; anything wrong past that becomes a diagnostic on the
    /// returned message.
    pub fn decode(
        &self,
        connection: &ConnectionId,
        direction: Direction,
        bytes: &[u8],
        message_id: u64,
    ) -> Result<DecodedMessage> {
        let required = match direction {
            Direction::Request => LENGTH_FIELD_SIZE,
            Direction::Response => MIN_HEADER_SIZE,
        };
        if bytes.len() < required {
            return Err(DissectError::TruncatedData {
                offset: 0,
                wanted: required,
                available: bytes.len(),
            });
        }

        let conversation = self.conversations.get_or_create(connection);
        match direction {
            Direction::Request => self.decode_request(&conversation, bytes, message_id),
            Direction::Response => self.decode_response(&conversation, bytes, message_id),
        }
    }

    // =========================================================================
    // Request branch
    // =========================================================================

    fn decode_request(
        &self,
        conversation: &ConversationState,
        bytes: &[u8],
        message_id: u64,
    ) -> Result<DecodedMessage> {
        let mut cursor = ByteCursor::new(bytes);
        let length = cursor.read_u32_le()?;
        let command_code = cursor.read_u32_le().ok();

        let header = MessageHeader::Request {
            length,
            command_code,
        };

        let mut fields = Vec::new();
        let mut diagnostics = Vec::new();

        if length < 4 {
            diagnostics.push(Diagnostic::malformed_length(format!(
                "Request length {} cannot hold the 4-byte command code",
                length
            )));
        } else if command_code.is_none() {
            diagnostics.push(Diagnostic::malformed_length(format!(
                "Request header truncated: {} of {} bytes",
                bytes.len(),
                MIN_HEADER_SIZE
            )));
        }

        let command_name = match command_code {
            Some(code) => {
                match self.registry.lookup(code) {
                    Some(descriptor) => {
                        let payload_len = header.payload_length() as usize;
                        if payload_len > 0 {
                            self.decode_payload(
                                descriptor.decode_request,
                                bytes,
                                payload_len,
                                &mut fields,
                                &mut diagnostics,
                            );
                        }
                    }
                    None => {
                        tracing::debug!("Message {}: unknown command code {}", message_id, code);
                        diagnostics.push(Diagnostic::unknown_command(code));
                    }
                }
                self.registry.command_name(code)
            }
            None => MALFORMED_REQUEST.to_string(),
        };

        // Queued even without a command code: the server still answers it
        if !conversation.record_request(command_code, message_id) {
            tracing::trace!("Message {}: revisit, request not re-queued", message_id);
        }

        let summary = match command_code {
            Some(code) => format!(
                "Request: {} (code={}, length={})",
                command_name, code, length
            ),
            None => format!("Request: {} (length={})", command_name, length),
        };

        Ok(DecodedMessage {
            message_id,
            header,
            command_code,
            command_name,
            status_name: None,
            fields,
            summary,
            correlated_peer: None,
            diagnostics,
            total_length: header.total_length(),
        })
    }

    // =========================================================================
    // Response branch
    // =========================================================================

    fn decode_response(
        &self,
        conversation: &ConversationState,
        bytes: &[u8],
        message_id: u64,
    ) -> Result<DecodedMessage> {
        let mut cursor = ByteCursor::new(bytes);
        let status_code = cursor.read_u32_le()?;
        let length = cursor.read_u32_le()?;

        let header = MessageHeader::Response {
            status_code,
            length,
        };
        let status = status_name(status_code);

        let mut fields = Vec::new();
        let mut diagnostics = Vec::new();

        let matched = conversation.resolve_response(message_id);
        let (command_code, command_name) = match matched {
            Some(m) => match m.command_code {
                Some(code) => (Some(code), self.registry.command_name(code)),
                None => (None, MALFORMED_REQUEST.to_string()),
            },
            None => {
                tracing::debug!("Message {}: no pending request", message_id);
                diagnostics.push(Diagnostic::unmatched_response());
                (None, NO_MATCHING_REQUEST.to_string())
            }
        };

        // Only a successful reply to a known command has a decodable payload
        let descriptor = command_code.and_then(|code| self.registry.lookup(code));
        if let Some(descriptor) = descriptor {
            if length > 0 && status_code == Status::Ok.code() {
                self.decode_payload(
                    descriptor.decode_response,
                    bytes,
                    length as usize,
                    &mut fields,
                    &mut diagnostics,
                );
            }
        }

        let summary = if status_code == Status::Ok.code() {
            format!("Response: {} OK (length={})", command_name, length)
        } else {
            format!(
                "Response: {} {} (status={}, length={})",
                command_name, status, status_code, length
            )
        };

        Ok(DecodedMessage {
            message_id,
            header,
            command_code,
            command_name,
            status_name: Some(status),
            fields,
            summary,
            correlated_peer: matched.map(|m| m.request_id),
            diagnostics,
            total_length: header.total_length(),
        })
    }

    // =========================================================================
    // Payload
    // =========================================================================

    /// Run `decoder` over the declared payload span
    ///
    /// The cursor never reaches past the declared length, nor past the
    /// bytes actually supplied. A truncation keeps every field read
    /// before it.
    fn decode_payload(
        &self,
        decoder: PayloadDecoder,
        bytes: &[u8],
        payload_len: usize,
        fields: &mut Vec<Field>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let start = MIN_HEADER_SIZE;
        let end = start.saturating_add(payload_len).min(bytes.len());
        let mut reader = PayloadReader::new(ByteCursor::with_base(&bytes[start..end], start));

        let outcome = decoder(&mut reader);
        let consumed = reader.consumed();
        let (decoded, found) = reader.into_parts();
        fields.extend(decoded);
        diagnostics.extend(found);

        match outcome {
            Ok(()) => {
                if self.config.check_payload_length && consumed != payload_len {
                    diagnostics.push(Diagnostic::payload_length_mismatch(consumed, payload_len));
                }
            }
            Err(e) => {
                tracing::debug!("Payload decoding stopped: {}", e);
                diagnostics.push(Diagnostic::malformed_length(e.to_string()));
            }
        }
    }
}

impl Default for Dissector {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
