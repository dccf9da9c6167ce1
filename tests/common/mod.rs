//! Packet builders shared by the integration suites

#![allow(dead_code)]

use std::net::SocketAddr;

use bytes::{BufMut, BytesMut};
use iggy_dissector::ConnectionId;

/// Request: LENGTH(4) + COMMAND_CODE(4) + PAYLOAD, LENGTH = 4 + payload
pub fn request(command_code: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(8 + payload.len());
    buf.put_u32_le(4 + payload.len() as u32);
    buf.put_u32_le(command_code);
    buf.put_slice(payload);
    buf.to_vec()
}

/// Response: STATUS(4) + LENGTH(4) + PAYLOAD, LENGTH = payload
pub fn response(status: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(8 + payload.len());
    buf.put_u32_le(status);
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
    buf.to_vec()
}

pub fn login_payload(username: &str, password: &str, version: &str, context: &str) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(username.len() as u8);
    buf.put_slice(username.as_bytes());
    buf.put_u8(password.len() as u8);
    buf.put_slice(password.as_bytes());
    buf.put_u32_le(version.len() as u32);
    buf.put_slice(version.as_bytes());
    buf.put_u32_le(context.len() as u32);
    buf.put_slice(context.as_bytes());
    buf.to_vec()
}

/// TopicCreate request addressed to a numeric stream id (4 bytes)
pub fn topic_create_numeric(stream_id: u32, topic_id: u32, name: &str) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(1);
    buf.put_u8(4);
    buf.put_u32_le(stream_id);
    put_topic_params(&mut buf, topic_id, name);
    buf.to_vec()
}

/// TopicCreate request addressed to a named stream
pub fn topic_create_named(stream_name: &str, topic_id: u32, name: &str) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u8(2);
    buf.put_u8(stream_name.len() as u8);
    buf.put_slice(stream_name.as_bytes());
    put_topic_params(&mut buf, topic_id, name);
    buf.to_vec()
}

fn put_topic_params(buf: &mut BytesMut, topic_id: u32, name: &str) {
    buf.put_u32_le(topic_id);
    buf.put_u32_le(3); // partitions
    buf.put_u8(2); // compression
    buf.put_u64_le(60_000_000); // message expiry
    buf.put_u64_le(1 << 30); // max topic size
    buf.put_u8(1); // replication factor
    buf.put_u8(name.len() as u8);
    buf.put_slice(name.as_bytes());
}

pub fn topic_create_response_payload(topic_id: u32, name: &str) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u32_le(topic_id);
    buf.put_u64_le(1_700_000_000_000_000); // created at
    buf.put_u32_le(3); // partitions
    buf.put_u64_le(60_000_000); // message expiry
    buf.put_u8(2); // compression
    buf.put_u64_le(1 << 30); // max topic size
    buf.put_u8(1); // replication factor
    buf.put_u64_le(4096); // size
    buf.put_u64_le(12); // messages count
    buf.put_u8(name.len() as u8);
    buf.put_slice(name.as_bytes());
    buf.to_vec()
}

pub fn addr(text: &str) -> SocketAddr {
    text.parse().unwrap()
}

pub fn connection() -> ConnectionId {
    ConnectionId::new(addr("127.0.0.1:50000"), addr("127.0.0.1:8090"))
}

pub fn other_connection() -> ConnectionId {
    ConnectionId::new(addr("127.0.0.1:50001"), addr("127.0.0.1:8090"))
}
