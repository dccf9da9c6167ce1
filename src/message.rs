//! Decoded message representation
//!
//! What the dissector hands to a display layer: header, generated names,
//! ordered payload fields, diagnostics and the correlated peer message.

use std::fmt;

use serde::Serialize;

use crate::protocol::{Direction, MessageHeader};

/// Typed value of a decoded field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    U8(u8),
    U32(u32),
    U64(u64),
    Str(String),
    Bytes(Vec<u8>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::U8(v) => write!(f, "{}", v),
            FieldValue::U32(v) => write!(f, "{}", v),
            FieldValue::U64(v) => write!(f, "{}", v),
            FieldValue::Str(s) => write!(f, "{:?}", s),
            FieldValue::Bytes(b) => write!(f, "{}", hex::encode(b)),
        }
    }
}

/// One decoded payload field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Display label, e.g. "Username Length"
    pub label: &'static str,

    /// Filter key, e.g. "iggy.login.username_len"
    pub key: &'static str,

    /// Message-absolute byte offset
    pub offset: usize,

    /// Width in bytes
    pub length: usize,

    pub value: FieldValue,

    /// Extra rendering text, e.g. "Numeric" for a stream id kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl Field {
    pub fn new(
        label: &'static str,
        key: &'static str,
        offset: usize,
        length: usize,
        value: FieldValue,
    ) -> Self {
        Self {
            label,
            key,
            offset,
            length,
            value,
            annotation: None,
        }
    }
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// What a diagnostic is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Command code not in the registry
    UnknownCommand,

    /// Response with no pending request to pair with
    UnmatchedResponse,

    /// A declared length does not fit the available bytes
    MalformedLength,

    /// Decoder finished short of, or past, the declared payload length
    PayloadLengthMismatch,
}

/// A severity-tagged finding attached to one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn unknown_command(code: u32) -> Self {
        Self {
            kind: DiagnosticKind::UnknownCommand,
            severity: Severity::Warning,
            message: format!("Unknown command code: {}", code),
        }
    }

    pub fn unmatched_response() -> Self {
        Self {
            kind: DiagnosticKind::UnmatchedResponse,
            severity: Severity::Warning,
            message: "No pending request to match this response".to_string(),
        }
    }

    pub fn malformed_length(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::MalformedLength,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn payload_length_mismatch(consumed: usize, declared: usize) -> Self {
        Self {
            kind: DiagnosticKind::PayloadLengthMismatch,
            severity: Severity::Note,
            message: format!(
                "Payload decoder consumed {} of {} declared bytes",
                consumed, declared
            ),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}

/// Fully decoded protocol message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedMessage {
    /// Capture-order identifier supplied by the caller
    pub message_id: u64,

    pub header: MessageHeader,

    /// Command the message belongs to; for responses this comes from the
    /// correlated request and is `None` when nothing matched
    pub command_code: Option<u32>,

    pub command_name: String,

    /// Response status name ("OK", "Invalid Credentials", "Unknown (99)")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_name: Option<String>,

    /// Payload fields in wire order
    pub fields: Vec<Field>,

    /// One-line summary for list views
    pub summary: String,

    /// For responses, the id of the request this answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlated_peer: Option<u64>,

    pub diagnostics: Vec<Diagnostic>,

    /// Bytes the message spans on the wire
    pub total_length: usize,
}

impl DecodedMessage {
    pub fn direction(&self) -> Direction {
        self.header.direction()
    }

    /// Look up a payload field by filter key
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }

    /// Render as an indented protocol tree
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "#{} Iggy Protocol - {} ({} bytes)\n",
            self.message_id,
            self.direction(),
            self.total_length
        ));
        out.push_str(&format!("    Message Type: {}\n", self.direction()));

        match self.header {
            MessageHeader::Request {
                length,
                command_code,
            } => {
                out.push_str(&format!("    Length: {}\n", length));
                if let Some(code) = command_code {
                    out.push_str(&format!("    Command Code: {}\n", code));
                }
            }
            MessageHeader::Response {
                status_code,
                length,
            } => {
                out.push_str(&format!("    Status Code: {}\n", status_code));
                out.push_str(&format!("    Length: {}\n", length));
                if let Some(name) = &self.status_name {
                    out.push_str(&format!("    Status Name: {}\n", name));
                }
                if let Some(peer) = self.correlated_peer {
                    out.push_str(&format!("    Request Frame: {}\n", peer));
                }
            }
        }
        out.push_str(&format!("    Command Name: {}\n", self.command_name));

        if !self.fields.is_empty() {
            out.push_str("    Payload\n");
            for field in &self.fields {
                match &field.annotation {
                    Some(note) => out.push_str(&format!(
                        "        {}: {} ({})\n",
                        field.label, field.value, note
                    )),
                    None => {
                        out.push_str(&format!("        {}: {}\n", field.label, field.value))
                    }
                }
            }
        }

        for diagnostic in &self.diagnostics {
            out.push_str(&format!("    {}\n", diagnostic));
        }

        out
    }
}

impl fmt::Display for DecodedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)
    }
}
