//! Conversation store
//!
//! Connection-keyed registry of conversation state.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;

use super::ConversationState;

/// Identity of one client ↔ server TCP connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    pub client: SocketAddr,
    pub server: SocketAddr,
}

impl ConnectionId {
    pub fn new(client: SocketAddr, server: SocketAddr) -> Self {
        Self { client, server }
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.client, self.server)
    }
}

/// Owns one [`ConversationState`] per live connection
///
/// State is created on first use and dropped by [`ConversationStore::remove`]
/// when the connection ends. Different connections never share state, so
/// the map lock is held only for lookup and insert.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<ConnectionId, Arc<ConversationState>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the state for `id`, creating it if this is its first message
    pub fn get_or_create(&self, id: &ConnectionId) -> Arc<ConversationState> {
        if let Some(state) = self.conversations.read().get(id) {
            return Arc::clone(state);
        }

        let mut conversations = self.conversations.write();
        let state = conversations.entry(*id).or_insert_with(|| {
            tracing::debug!("New conversation {}", id);
            Arc::new(ConversationState::new())
        });
        Arc::clone(state)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Arc<ConversationState>> {
        self.conversations.read().get(id).cloned()
    }

    /// Tear down the state of a finished connection
    pub fn remove(&self, id: &ConnectionId) -> Option<Arc<ConversationState>> {
        let removed = self.conversations.write().remove(id);
        if removed.is_some() {
            tracing::debug!("Conversation {} closed", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }
}
