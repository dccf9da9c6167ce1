//! Message header definitions
//!
//! Direction, direction-tagged headers and the response status table.

use serde::Serialize;

/// Request header size: length (4) + command code (4)
pub const REQUEST_HEADER_SIZE: usize = 8;

/// Response header size: status (4) + length (4)
pub const RESPONSE_HEADER_SIZE: usize = 8;

/// Bytes needed before either header can be interpreted
pub const MIN_HEADER_SIZE: usize = 8;

/// Width of the request length field, the shortest request that can be reported
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Which side of the connection sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Client to server
    Request,

    /// Server to client
    Response,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Request => "Request",
            Direction::Response => "Response",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded message header
///
/// The length field means different things per direction: for requests it
/// covers the command code plus payload, for responses only the payload.
/// A request whose length field is below 4 is framed shorter than the
/// 8-byte header, so its command code may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum MessageHeader {
    Request {
        length: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        command_code: Option<u32>,
    },
    Response { status_code: u32, length: u32 },
}

impl MessageHeader {
    pub fn direction(&self) -> Direction {
        match self {
            MessageHeader::Request { .. } => Direction::Request,
            MessageHeader::Response { .. } => Direction::Response,
        }
    }

    /// Raw value of the length field
    pub fn length(&self) -> u32 {
        match self {
            MessageHeader::Request { length, .. } | MessageHeader::Response { length, .. } => {
                *length
            }
        }
    }

    /// Payload bytes following the header
    pub fn payload_length(&self) -> u32 {
        match self {
            MessageHeader::Request { length, .. } => length.saturating_sub(4),
            MessageHeader::Response { length, .. } => *length,
        }
    }

    /// Total bytes the message occupies on the wire
    pub fn total_length(&self) -> usize {
        match self {
            MessageHeader::Request { length, .. } => 4 + *length as usize,
            MessageHeader::Response { length, .. } => 8 + *length as usize,
        }
    }
}

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Status {
    Ok = 0,
    Error = 1,
    InvalidConfiguration = 2,
    InvalidCommand = 3,
    InvalidFormat = 4,
    FeatureUnavailable = 5,
    InvalidIdentifier = 6,
    Disconnected = 8,
    Unauthenticated = 40,
    Unauthorized = 41,
    InvalidCredentials = 42,
}

impl Status {
    pub fn from_code(code: u32) -> Option<Self> {
        let status = match code {
            0 => Status::Ok,
            1 => Status::Error,
            2 => Status::InvalidConfiguration,
            3 => Status::InvalidCommand,
            4 => Status::InvalidFormat,
            5 => Status::FeatureUnavailable,
            6 => Status::InvalidIdentifier,
            8 => Status::Disconnected,
            40 => Status::Unauthenticated,
            41 => Status::Unauthorized,
            42 => Status::InvalidCredentials,
            _ => return None,
        };
        Some(status)
    }

    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Error => "Error",
            Status::InvalidConfiguration => "Invalid Configuration",
            Status::InvalidCommand => "Invalid Command",
            Status::InvalidFormat => "Invalid Format",
            Status::FeatureUnavailable => "Feature Unavailable",
            Status::InvalidIdentifier => "Invalid Identifier",
            Status::Disconnected => "Disconnected",
            Status::Unauthenticated => "Unauthenticated",
            Status::Unauthorized => "Unauthorized",
            Status::InvalidCredentials => "Invalid Credentials",
        }
    }
}

/// Display name for any status code, including unregistered ones
pub fn status_name(code: u32) -> String {
    match Status::from_code(code) {
        Some(status) => status.name().to_string(),
        None => format!("Unknown ({})", code),
    }
}
