//! Text transcripts
//!
//! A line-oriented stand-in for a capture file. Each record is one TCP
//! segment payload:
//!
//! ```text
//! # src              dst              payload (hex)
//! 127.0.0.1:50000    127.0.0.1:8090   0c00000001000000
//! 127.0.0.1:8090     127.0.0.1:50000  0000000000000000
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Direction comes
//! from the dissector's server port, not from the record itself.

use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use crate::conversation::ConnectionId;
use crate::dissector::Dissector;
use crate::error::{DissectError, Result};
use crate::message::DecodedMessage;
use crate::protocol::Direction;
use super::{FramedMessage, MessageIds, StreamSession};

/// One segment of a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRecord {
    /// 1-based line number in the source text
    pub line: usize,
    pub source: SocketAddr,
    pub destination: SocketAddr,
    pub bytes: Vec<u8>,
}

/// Parse transcript text
pub fn parse_transcript(text: &str) -> Result<Vec<TranscriptRecord>> {
    let mut records = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let (Some(src), Some(dst)) = (parts.next(), parts.next()) else {
            return Err(DissectError::Transcript(format!(
                "line {}: expected `<src> <dst> <hex>`",
                line
            )));
        };

        let source = parse_addr(src, line)?;
        let destination = parse_addr(dst, line)?;

        // Hex may be split into groups for readability
        let hex_text: String = parts.collect();
        let bytes = decode_hex(&hex_text)
            .map_err(|e| DissectError::Transcript(format!("line {}: {}", line, e)))?;

        records.push(TranscriptRecord {
            line,
            source,
            destination,
            bytes,
        });
    }

    Ok(records)
}

/// Decode message bytes written as hex
///
/// Whitespace and `:` separators between byte groups are ignored.
pub fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(&digits).map_err(|e| DissectError::Input(format!("bad hex: {}", e)))
}

fn parse_addr(text: &str, line: usize) -> Result<SocketAddr> {
    text.parse().map_err(|e| {
        DissectError::Transcript(format!("line {}: bad address {:?}: {}", line, text, e))
    })
}

/// Read and parse a transcript file
pub fn read_transcript(path: &Path) -> Result<Vec<TranscriptRecord>> {
    let text = fs::read_to_string(path)?;
    parse_transcript(&text)
}

/// First pass: frame and decode every record in file order
///
/// Records are grouped into connections by address pair. Records on
/// neither side of the server port are skipped. A connection whose
/// framing fails stops producing messages; other connections continue.
pub fn dissect_transcript(
    dissector: &Arc<Dissector>,
    records: &[TranscriptRecord],
) -> Vec<FramedMessage> {
    let ids = MessageIds::new();
    let mut sessions: HashMap<ConnectionId, StreamSession> = HashMap::new();
    let mut messages = Vec::new();

    for record in records {
        let Some(direction) = dissector.classify(record.source.port(), record.destination.port())
        else {
            tracing::debug!(
                "line {}: {} -> {} is not server traffic",
                record.line,
                record.source,
                record.destination
            );
            continue;
        };

        let connection = match direction {
            Direction::Request => ConnectionId::new(record.source, record.destination),
            Direction::Response => ConnectionId::new(record.destination, record.source),
        };

        let session = sessions.entry(connection).or_insert_with(|| {
            StreamSession::new(connection, Arc::clone(dissector), ids.clone())
        });

        match session.feed(direction, &record.bytes) {
            Ok(framed) => messages.extend(framed),
            Err(e) => tracing::warn!("line {}: {}", record.line, e),
        }
    }

    for (connection, session) in &sessions {
        let (requests, responses) = session.buffered();
        if requests + responses > 0 {
            tracing::warn!(
                "{}: {} request and {} response bytes left incomplete",
                connection,
                requests,
                responses
            );
        }
    }

    messages
}

/// Replay pass: decode already-framed messages again, in the given order
pub fn replay<'a, I>(dissector: &Dissector, messages: I) -> Result<Vec<DecodedMessage>>
where
    I: IntoIterator<Item = &'a FramedMessage>,
{
    messages
        .into_iter()
        .map(|m| dissector.decode(&m.connection, m.direction, &m.bytes, m.message_id))
        .collect()
}
