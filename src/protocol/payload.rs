//! Payload decoders
//!
//! One request and one response decoder per registered command. Decoders
//! pull fields through a [`PayloadReader`], which records every field as it
//! is read so that a truncation midway still leaves the earlier fields.
//!
//! ## Layouts
//!
//! ### UserLogin (38)
//! ```text
//! request:  u8 username_len | username | u8 password_len | password
//!           | u32 version_len | version (if > 0) | u32 context_len | context (if > 0)
//! response: u32 user_id
//! ```
//!
//! ### TopicCreate (302)
//! ```text
//! request:  u8 stream_id_kind | u8 stream_id_len | stream_id | u32 topic_id
//!           | u32 partitions_count | u8 compression_algorithm | u64 message_expiry
//!           | u64 max_topic_size | u8 replication_factor | u8 name_len | name
//! response: u32 topic_id | u64 created_at | u32 partitions_count | u64 message_expiry
//!           | u8 compression_algorithm | u64 max_topic_size | u8 replication_factor
//!           | u64 size | u64 messages_count | u8 name_len | name
//! ```

use crate::error::Result;
use crate::message::{Diagnostic, Field, FieldValue};
use super::cursor::ByteCursor;

/// Stream identifier encoded as a little-endian integer
pub const STREAM_ID_NUMERIC: u8 = 1;

/// Stream identifier encoded as a UTF-8 string
pub const STREAM_ID_STRING: u8 = 2;

/// Cursor plus the fields and diagnostics decoded so far
pub struct PayloadReader<'a> {
    cursor: ByteCursor<'a>,
    fields: Vec<Field>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> PayloadReader<'a> {
    pub fn new(cursor: ByteCursor<'a>) -> Self {
        Self {
            cursor,
            fields: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Bytes consumed from the payload so far
    pub fn consumed(&self) -> usize {
        self.cursor.offset()
    }

    pub fn into_parts(self) -> (Vec<Field>, Vec<Diagnostic>) {
        (self.fields, self.diagnostics)
    }

    fn push(&mut self, label: &'static str, key: &'static str, start: usize, value: FieldValue) {
        let length = self.cursor.position() - start;
        self.fields.push(Field::new(label, key, start, length, value));
    }

    pub fn u8(&mut self, label: &'static str, key: &'static str) -> Result<u8> {
        let start = self.cursor.position();
        let v = self.cursor.read_u8()?;
        self.push(label, key, start, FieldValue::U8(v));
        Ok(v)
    }

    pub fn u32(&mut self, label: &'static str, key: &'static str) -> Result<u32> {
        let start = self.cursor.position();
        let v = self.cursor.read_u32_le()?;
        self.push(label, key, start, FieldValue::U32(v));
        Ok(v)
    }

    pub fn u64(&mut self, label: &'static str, key: &'static str) -> Result<u64> {
        let start = self.cursor.position();
        let v = self.cursor.read_u64_le()?;
        self.push(label, key, start, FieldValue::U64(v));
        Ok(v)
    }

    /// Variable-width little-endian integer (1..=8 bytes)
    pub fn uint(&mut self, label: &'static str, key: &'static str, len: usize) -> Result<u64> {
        let start = self.cursor.position();
        let v = self.cursor.read_uint_le(len)?;
        self.push(label, key, start, FieldValue::U64(v));
        Ok(v)
    }

    pub fn string(&mut self, label: &'static str, key: &'static str, len: usize) -> Result<()> {
        let start = self.cursor.position();
        let s = self.cursor.read_string_utf8(len)?;
        self.push(label, key, start, FieldValue::Str(s));
        Ok(())
    }

    pub fn bytes(&mut self, label: &'static str, key: &'static str, len: usize) -> Result<()> {
        let start = self.cursor.position();
        let b = self.cursor.read_bytes(len)?.to_vec();
        self.push(label, key, start, FieldValue::Bytes(b));
        Ok(())
    }

    /// Attach rendering text to the most recently read field
    pub fn annotate(&mut self, text: impl Into<String>) {
        if let Some(field) = self.fields.last_mut() {
            field.annotation = Some(text.into());
        }
    }

    pub fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

// =============================================================================
// Ping (1)
// =============================================================================

/// Ping carries no payload in either direction
pub fn decode_empty(_reader: &mut PayloadReader<'_>) -> Result<()> {
    Ok(())
}

// =============================================================================
// UserLogin (38)
// =============================================================================

pub fn decode_login_request(r: &mut PayloadReader<'_>) -> Result<()> {
    let username_len = r.u8("Username Length", "iggy.login.username_len")?;
    r.string("Username", "iggy.login.username", username_len as usize)?;

    let password_len = r.u8("Password Length", "iggy.login.password_len")?;
    r.string("Password", "iggy.login.password", password_len as usize)?;

    let version_len = r.u32("Version Length", "iggy.login.version_len")?;
    if version_len > 0 {
        r.string("Version", "iggy.login.version", version_len as usize)?;
    }

    let context_len = r.u32("Context Length", "iggy.login.context_len")?;
    if context_len > 0 {
        r.string("Context", "iggy.login.context", context_len as usize)?;
    }

    Ok(())
}

pub fn decode_login_response(r: &mut PayloadReader<'_>) -> Result<()> {
    r.u32("User ID", "iggy.login.user_id")?;
    Ok(())
}

// =============================================================================
// TopicCreate (302)
// =============================================================================

fn stream_id_kind_name(kind: u8) -> String {
    match kind {
        STREAM_ID_NUMERIC => "Numeric".to_string(),
        STREAM_ID_STRING => "String".to_string(),
        other => format!("Unknown: {}", other),
    }
}

pub fn decode_topic_create_request(r: &mut PayloadReader<'_>) -> Result<()> {
    let kind = r.u8("Stream ID Kind", "iggy.create_topic.stream_id_kind")?;
    r.annotate(stream_id_kind_name(kind));

    let id_len = r.u8("Stream ID Length", "iggy.create_topic.stream_id_length")? as usize;
    if kind == STREAM_ID_NUMERIC {
        if (1..=8).contains(&id_len) {
            r.uint(
                "Stream ID (Numeric)",
                "iggy.create_topic.stream_id_numeric",
                id_len,
            )?;
        } else {
            r.diagnose(Diagnostic::malformed_length(format!(
                "Numeric stream ID length {} is not between 1 and 8",
                id_len
            )));
            r.bytes(
                "Stream ID (Numeric)",
                "iggy.create_topic.stream_id_numeric",
                id_len,
            )?;
        }
    } else {
        r.string(
            "Stream ID (String)",
            "iggy.create_topic.stream_id_string",
            id_len,
        )?;
    }

    r.u32("Topic ID", "iggy.create_topic.topic_id")?;
    r.u32("Partitions Count", "iggy.create_topic.partitions_count")?;
    r.u8(
        "Compression Algorithm",
        "iggy.create_topic.compression_algorithm",
    )?;
    r.u64("Message Expiry (μs)", "iggy.create_topic.message_expiry")?;
    r.u64("Max Topic Size (bytes)", "iggy.create_topic.max_topic_size")?;
    r.u8("Replication Factor", "iggy.create_topic.replication_factor")?;

    let name_len = r.u8("Name Length", "iggy.create_topic.name_len")?;
    r.string("Name", "iggy.create_topic.name", name_len as usize)?;

    Ok(())
}

pub fn decode_topic_create_response(r: &mut PayloadReader<'_>) -> Result<()> {
    r.u32("Topic ID", "iggy.create_topic.resp.topic_id")?;
    r.u64("Created At (μs)", "iggy.create_topic.resp.created_at")?;
    r.u32("Partitions Count", "iggy.create_topic.resp.partitions_count")?;
    r.u64("Message Expiry (μs)", "iggy.create_topic.resp.message_expiry")?;
    r.u8(
        "Compression Algorithm",
        "iggy.create_topic.resp.compression_algorithm",
    )?;
    r.u64("Max Topic Size (bytes)", "iggy.create_topic.resp.max_topic_size")?;
    r.u8("Replication Factor", "iggy.create_topic.resp.replication_factor")?;
    r.u64("Size (bytes)", "iggy.create_topic.resp.size")?;
    r.u64("Messages Count", "iggy.create_topic.resp.messages_count")?;

    let name_len = r.u8("Name Length", "iggy.create_topic.resp.name_len")?;
    r.string("Name", "iggy.create_topic.resp.name", name_len as usize)?;

    Ok(())
}
