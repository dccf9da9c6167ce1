//! Tests for the Dissector
//!
//! These tests verify:
//! - Header decoding and command naming for requests
//! - Response correlation, status naming and summaries
//! - Diagnostics for unknown commands, unmatched responses and bad lengths
//! - Identical results when messages are decoded again

#[path = "../common/mod.rs"]
mod common;

use iggy_dissector::dissector::{MALFORMED_REQUEST, NO_MATCHING_REQUEST};
use iggy_dissector::protocol::{
    CommandDescriptor, CommandRegistry, MessageHeader, PayloadReader, PING, TOPIC_CREATE,
    USER_LOGIN,
};
use iggy_dissector::{
    Config, DiagnosticKind, DissectError, Direction, Dissector, FieldValue, FrameLength, Result,
    Severity,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn dissector() -> Dissector {
    Dissector::new(Config::default())
}

// =============================================================================
// Requests
// =============================================================================

#[test]
fn test_ping_request() {
    let d = dissector();
    let bytes = [0x0C, 0, 0, 0, 0x01, 0, 0, 0];

    let msg = d
        .decode(&common::connection(), Direction::Request, &bytes, 1)
        .unwrap();

    assert_eq!(msg.direction(), Direction::Request);
    assert_eq!(
        msg.header,
        MessageHeader::Request {
            length: 12,
            command_code: Some(1)
        }
    );
    assert_eq!(msg.command_code, Some(PING));
    assert_eq!(msg.command_name, "ping");
    assert!(msg.fields.is_empty());
    assert_eq!(msg.total_length, 16);
    assert!(msg.diagnostics.is_empty());
}

#[test]
fn test_login_request_fields() {
    let d = dissector();
    let bytes = common::request(USER_LOGIN, &common::login_payload("ab", "cd", "", ""));

    let msg = d
        .decode(&common::connection(), Direction::Request, &bytes, 1)
        .unwrap();

    assert_eq!(msg.command_name, "user.login");
    assert_eq!(
        msg.field("iggy.login.username").unwrap().value,
        FieldValue::Str("ab".into())
    );
    assert_eq!(
        msg.field("iggy.login.password").unwrap().value,
        FieldValue::Str("cd".into())
    );
    assert!(msg.field("iggy.login.version").is_none());
    assert!(msg.field("iggy.login.context").is_none());
    assert_eq!(msg.total_length, 8 + 14);
    assert!(msg.diagnostics.is_empty());
}

#[test]
fn test_unknown_command() {
    let d = dissector();
    let bytes = common::request(9999, &[1, 2, 3]);

    let msg = d
        .decode(&common::connection(), Direction::Request, &bytes, 1)
        .unwrap();

    assert_eq!(
        msg.header,
        MessageHeader::Request {
            length: 7,
            command_code: Some(9999)
        }
    );
    assert_eq!(msg.command_name, "Unimplemented (9999)");
    assert!(msg.fields.is_empty());
    assert_eq!(msg.diagnostics.len(), 1);
    assert_eq!(msg.diagnostics[0].kind, DiagnosticKind::UnknownCommand);
    assert_eq!(msg.diagnostics[0].severity, Severity::Warning);
}

#[test]
fn test_unknown_command_without_payload_still_warns() {
    let d = dissector();
    let bytes = common::request(9999, &[]);

    let msg = d
        .decode(&common::connection(), Direction::Request, &bytes, 1)
        .unwrap();

    assert!(msg.has_diagnostic(DiagnosticKind::UnknownCommand));
}

#[test]
fn test_request_summary() {
    let d = dissector();
    let bytes = common::request(TOPIC_CREATE, &common::topic_create_numeric(1, 1, "t"));

    let msg = d
        .decode(&common::connection(), Direction::Request, &bytes, 1)
        .unwrap();

    assert_eq!(
        msg.summary,
        format!("Request: topic.create (code=302, length={})", bytes.len() - 4)
    );
    assert_eq!(msg.to_string(), msg.summary);
}

#[test]
fn test_request_length_below_command_code() {
    let d = dissector();
    let bytes = [0x02, 0, 0, 0, 0x26, 0, 0, 0];

    let msg = d
        .decode(&common::connection(), Direction::Request, &bytes, 1)
        .unwrap();

    assert!(msg.has_diagnostic(DiagnosticKind::MalformedLength));
    assert!(msg.fields.is_empty());
    // Still queued for correlation
    let state = d.conversations().get(&common::connection()).unwrap();
    assert_eq!(state.pending_count(), 1);
}

#[test]
fn test_truncated_payload_keeps_prefix_fields() {
    let d = dissector();
    let mut bytes = common::request(USER_LOGIN, &common::login_payload("alice", "pw", "", ""));
    bytes.truncate(8 + 3);

    let msg = d
        .decode(&common::connection(), Direction::Request, &bytes, 1)
        .unwrap();

    assert_eq!(msg.fields.len(), 1);
    let malformed: Vec<_> = msg
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::MalformedLength)
        .collect();
    assert_eq!(malformed.len(), 1);
    assert_eq!(malformed[0].severity, Severity::Error);
}

#[test]
fn test_decoder_cannot_read_past_declared_length() {
    let d = dissector();
    // Declared payload is 3 bytes, but the buffer carries a full login
    let full = common::login_payload("ab", "cd", "", "");
    let mut bytes = common::request(USER_LOGIN, &full[..3]);
    bytes.extend_from_slice(&full[3..]);

    let msg = d
        .decode(&common::connection(), Direction::Request, &bytes, 1)
        .unwrap();

    assert!(msg.has_diagnostic(DiagnosticKind::MalformedLength));
    assert!(msg.field("iggy.login.password_len").is_none());
}

#[test]
fn test_request_without_command_code_is_decoded() {
    let d = dissector();
    let conn = common::connection();

    // length = 0: only the length field exists
    let msg = d
        .decode(&conn, Direction::Request, &[0, 0, 0, 0], 1)
        .unwrap();
    assert_eq!(
        msg.header,
        MessageHeader::Request {
            length: 0,
            command_code: None
        }
    );
    assert_eq!(msg.command_code, None);
    assert_eq!(msg.command_name, MALFORMED_REQUEST);
    assert_eq!(msg.total_length, 4);
    assert_eq!(msg.summary, "Request: Malformed request (length=0)");
    assert!(msg.has_diagnostic(DiagnosticKind::MalformedLength));
    assert!(!msg.has_diagnostic(DiagnosticKind::UnknownCommand));
    assert!(!msg.render_tree().contains("Command Code"));

    let resp = d
        .decode(&conn, Direction::Response, &common::response(0, &[]), 2)
        .unwrap();
    assert_eq!(resp.correlated_peer, Some(1));
    assert_eq!(resp.command_name, MALFORMED_REQUEST);
    assert!(!resp.has_diagnostic(DiagnosticKind::UnmatchedResponse));
}

#[test]
fn test_request_cut_inside_header_is_malformed() {
    let d = dissector();
    let msg = d
        .decode(
            &common::connection(),
            Direction::Request,
            &[0x08, 0, 0, 0, 0x01, 0],
            1,
        )
        .unwrap();

    assert_eq!(msg.command_code, None);
    let malformed: Vec<_> = msg
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::MalformedLength)
        .collect();
    assert_eq!(malformed.len(), 1);
    assert_eq!(malformed[0].severity, Severity::Error);
    assert!(malformed[0].message.contains("truncated"));
}

#[test]
fn test_header_too_short_is_error() {
    let d = dissector();
    let err = d
        .decode(&common::connection(), Direction::Request, &[1, 0, 0], 1)
        .unwrap_err();
    assert!(matches!(err, DissectError::TruncatedData { available: 3, .. }));
}

// =============================================================================
// Responses
// =============================================================================

#[test]
fn test_response_correlates_with_request() {
    let d = dissector();
    let conn = common::connection();

    d.decode(
        &conn,
        Direction::Request,
        &common::request(USER_LOGIN, &common::login_payload("ab", "cd", "", "")),
        1,
    )
    .unwrap();
    let msg = d
        .decode(
            &conn,
            Direction::Response,
            &common::response(0, &7u32.to_le_bytes()),
            2,
        )
        .unwrap();

    assert_eq!(msg.command_code, Some(USER_LOGIN));
    assert_eq!(msg.command_name, "user.login");
    assert_eq!(msg.correlated_peer, Some(1));
    assert_eq!(msg.status_name.as_deref(), Some("OK"));
    assert_eq!(
        msg.field("iggy.login.user_id").unwrap().value,
        FieldValue::U32(7)
    );
    assert_eq!(msg.summary, "Response: user.login OK (length=4)");
    assert_eq!(msg.total_length, 12);
}

#[test]
fn test_unmatched_response() {
    let d = dissector();
    let msg = d
        .decode(
            &common::connection(),
            Direction::Response,
            &common::response(0, &7u32.to_le_bytes()),
            1,
        )
        .unwrap();

    assert_eq!(msg.command_name, NO_MATCHING_REQUEST);
    assert_eq!(msg.command_code, None);
    assert_eq!(msg.correlated_peer, None);
    assert!(msg.fields.is_empty());
    assert!(msg.has_diagnostic(DiagnosticKind::UnmatchedResponse));
}

#[test]
fn test_status_names() {
    let d = dissector();
    let conn = common::connection();

    d.decode(&conn, Direction::Request, &common::request(USER_LOGIN, &[]), 1)
        .unwrap();
    let denied = d
        .decode(&conn, Direction::Response, &common::response(42, &[]), 2)
        .unwrap();
    assert_eq!(denied.status_name.as_deref(), Some("Invalid Credentials"));
    assert_eq!(
        denied.summary,
        "Response: user.login Invalid Credentials (status=42, length=0)"
    );

    d.decode(&conn, Direction::Request, &common::request(PING, &[]), 3)
        .unwrap();
    let odd = d
        .decode(&conn, Direction::Response, &common::response(99, &[]), 4)
        .unwrap();
    assert_eq!(odd.status_name.as_deref(), Some("Unknown (99)"));
}

#[test]
fn test_error_response_payload_not_decoded() {
    let d = dissector();
    let conn = common::connection();

    d.decode(&conn, Direction::Request, &common::request(USER_LOGIN, &[]), 1)
        .unwrap();
    let msg = d
        .decode(
            &conn,
            Direction::Response,
            &common::response(1, b"boom"),
            2,
        )
        .unwrap();

    assert_eq!(msg.command_name, "user.login");
    assert!(msg.fields.is_empty());
    assert!(!msg.has_diagnostic(DiagnosticKind::PayloadLengthMismatch));
}

#[test]
fn test_topic_create_exchange() {
    let d = dissector();
    let conn = common::connection();

    let req = d
        .decode(
            &conn,
            Direction::Request,
            &common::request(TOPIC_CREATE, &common::topic_create_named("events", 4, "clicks")),
            1,
        )
        .unwrap();
    assert_eq!(
        req.field("iggy.create_topic.stream_id_kind")
            .unwrap()
            .annotation
            .as_deref(),
        Some("String")
    );

    let resp = d
        .decode(
            &conn,
            Direction::Response,
            &common::response(0, &common::topic_create_response_payload(4, "clicks")),
            2,
        )
        .unwrap();
    assert_eq!(resp.command_name, "topic.create");
    assert_eq!(
        resp.field("iggy.create_topic.resp.name").unwrap().value,
        FieldValue::Str("clicks".into())
    );
    assert!(resp.diagnostics.is_empty());
}

// =============================================================================
// Replay
// =============================================================================

#[test]
fn test_decode_twice_is_identical() {
    let d = dissector();
    let conn = common::connection();
    let req = common::request(PING, &[]);
    let resp = common::response(0, &[]);

    let r1 = d.decode(&conn, Direction::Request, &req, 1).unwrap();
    let p1 = d.decode(&conn, Direction::Response, &resp, 2).unwrap();

    let p2 = d.decode(&conn, Direction::Response, &resp, 2).unwrap();
    let r2 = d.decode(&conn, Direction::Request, &req, 1).unwrap();

    assert_eq!(r1, r2);
    assert_eq!(p1, p2);
    assert_eq!(p2.correlated_peer, Some(1));

    let state = d.conversations().get(&conn).unwrap();
    assert_eq!(state.pending_count(), 0);
}

#[test]
fn test_replay_of_unmatched_response_is_identical() {
    let d = dissector();
    let conn = common::connection();
    let resp = common::response(0, &[]);

    let first = d.decode(&conn, Direction::Response, &resp, 1).unwrap();
    d.decode(&conn, Direction::Request, &common::request(PING, &[]), 2)
        .unwrap();
    let again = d.decode(&conn, Direction::Response, &resp, 1).unwrap();

    assert_eq!(first, again);
    assert_eq!(again.command_name, NO_MATCHING_REQUEST);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_classify_by_server_port() {
    let d = dissector();
    assert_eq!(d.classify(50000, 8090), Some(Direction::Request));
    assert_eq!(d.classify(8090, 50000), Some(Direction::Response));
    assert_eq!(d.classify(50000, 443), None);

    d.set_server_port(9000);
    assert_eq!(d.server_port(), 9000);
    assert_eq!(d.classify(50000, 9000), Some(Direction::Request));
    assert_eq!(d.classify(50000, 8090), None);
}

#[test]
fn test_frame_length_applies_max_size() {
    let config = Config::builder().max_message_size(8).build();
    let d = Dissector::new(config);

    assert_eq!(
        d.frame_length(&common::request(PING, &[0u8; 4]), Direction::Request)
            .unwrap(),
        FrameLength::Complete(12)
    );
    assert!(d
        .frame_length(&common::request(PING, &[0u8; 5]), Direction::Request)
        .is_err());
}

#[test]
fn test_payload_length_mismatch_note() {
    let d = dissector();
    let mut payload = common::login_payload("ab", "cd", "", "");
    payload.extend_from_slice(&[0xEE; 2]);

    let msg = d
        .decode(
            &common::connection(),
            Direction::Request,
            &common::request(USER_LOGIN, &payload),
            1,
        )
        .unwrap();

    let note = msg
        .diagnostics
        .iter()
        .find(|d| d.kind == DiagnosticKind::PayloadLengthMismatch)
        .unwrap();
    assert_eq!(note.severity, Severity::Note);
    assert_eq!(note.message, "Payload decoder consumed 14 of 16 declared bytes");
}

#[test]
fn test_payload_length_check_disabled() {
    let d = Dissector::new(Config::builder().check_payload_length(false).build());
    let mut payload = common::login_payload("ab", "cd", "", "");
    payload.extend_from_slice(&[0xEE; 2]);

    let msg = d
        .decode(
            &common::connection(),
            Direction::Request,
            &common::request(USER_LOGIN, &payload),
            1,
        )
        .unwrap();

    assert!(msg.diagnostics.is_empty());
}

fn decode_counter(r: &mut PayloadReader<'_>) -> Result<()> {
    r.u64("Counter", "iggy.test.counter")?;
    Ok(())
}

#[test]
fn test_custom_registry_entry() {
    let mut registry = CommandRegistry::new();
    registry.register(CommandDescriptor {
        code: 77,
        name: "test.counter",
        decode_request: decode_counter,
        decode_response: decode_counter,
    });
    let d = Dissector::with_registry(Config::default(), registry);

    let msg = d
        .decode(
            &common::connection(),
            Direction::Request,
            &common::request(77, &5u64.to_le_bytes()),
            1,
        )
        .unwrap();
    assert_eq!(msg.command_name, "test.counter");
    assert_eq!(
        msg.field("iggy.test.counter").unwrap().value,
        FieldValue::U64(5)
    );

    // Ping is not part of this registry
    let ping = d
        .decode(
            &common::connection(),
            Direction::Request,
            &common::request(PING, &[]),
            2,
        )
        .unwrap();
    assert!(ping.has_diagnostic(DiagnosticKind::UnknownCommand));
}

#[test]
fn test_close_conversation_drops_state() {
    let d = dissector();
    let conn = common::connection();
    d.decode(&conn, Direction::Request, &common::request(PING, &[]), 1)
        .unwrap();
    assert_eq!(d.conversations().len(), 1);

    d.close_conversation(&conn);
    assert!(d.conversations().is_empty());
}

// =============================================================================
// Rendering
// =============================================================================

#[test]
fn test_render_tree_and_json() {
    let d = dissector();
    let conn = common::connection();
    d.decode(&conn, Direction::Request, &common::request(USER_LOGIN, &[]), 1)
        .unwrap();
    let msg = d
        .decode(
            &conn,
            Direction::Response,
            &common::response(0, &9u32.to_le_bytes()),
            2,
        )
        .unwrap();

    let tree = msg.render_tree();
    assert!(tree.contains("Status Name: OK"));
    assert!(tree.contains("Request Frame: 1"));
    assert!(tree.contains("Command Name: user.login"));
    assert!(tree.contains("User ID: 9"));

    let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["header"]["direction"], "response");
    assert_eq!(json["header"]["status_code"], 0);
    assert_eq!(json["correlated_peer"], 1);
    assert_eq!(json["fields"][0]["key"], "iggy.login.user_id");
    assert_eq!(json["fields"][0]["value"], 9);
}
