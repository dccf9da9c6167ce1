//! Command registry
//!
//! Maps a 32-bit command code to its descriptor. Adding a command means
//! adding a table entry; dispatch never changes.

use std::collections::HashMap;

use crate::error::Result;
use super::payload::{self, PayloadReader};

/// Command codes
pub const PING: u32 = 1;
pub const USER_LOGIN: u32 = 38;
pub const TOPIC_CREATE: u32 = 302;

/// Decodes one payload direction of a command
pub type PayloadDecoder = fn(&mut PayloadReader<'_>) -> Result<()>;

/// Static description of a command
#[derive(Debug, Clone, Copy)]
pub struct CommandDescriptor {
    pub code: u32,
    pub name: &'static str,
    pub decode_request: PayloadDecoder,
    pub decode_response: PayloadDecoder,
}

const BUILTIN: [CommandDescriptor; 3] = [
    CommandDescriptor {
        code: PING,
        name: "ping",
        decode_request: payload::decode_empty,
        decode_response: payload::decode_empty,
    },
    CommandDescriptor {
        code: USER_LOGIN,
        name: "user.login",
        decode_request: payload::decode_login_request,
        decode_response: payload::decode_login_response,
    },
    CommandDescriptor {
        code: TOPIC_CREATE,
        name: "topic.create",
        decode_request: payload::decode_topic_create_request,
        decode_response: payload::decode_topic_create_response,
    },
];

/// Lookup table of known commands
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<u32, CommandDescriptor>,
}

impl CommandRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding ping, user.login and topic.create
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for descriptor in BUILTIN {
            registry.register(descriptor);
        }
        registry
    }

    /// Add a command, replacing any previous entry for its code
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Option<CommandDescriptor> {
        self.commands.insert(descriptor.code, descriptor)
    }

    pub fn lookup(&self, code: u32) -> Option<&CommandDescriptor> {
        self.commands.get(&code)
    }

    /// Registered name, or "Unimplemented (code)"
    pub fn command_name(&self, code: u32) -> String {
        match self.lookup(code) {
            Some(descriptor) => descriptor.name.to_string(),
            None => format!("Unimplemented ({})", code),
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
