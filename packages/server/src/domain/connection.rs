//! Connection registry: the set of live sockets attached to a room.
//!
//! Sockets are represented by the sending half of an unbounded channel. The UI
//! layer owns the receiving half and forwards frames to the real WebSocket,
//! so the registry never touches transport types directly.

use std::collections::HashMap;

use tokio::sync::mpsc;

use super::{
    error::MessagePushError,
    value_object::{ClientId, ConnectionId, DisplayName, Timestamp},
};

/// Frame queued for delivery to one socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// JSON text frame
    Text(String),
    /// Close the socket (stale eviction)
    Close,
}

/// Channel used to push frames to one socket
pub type PusherChannel = mpsc::UnboundedSender<Outbound>;

/// One live socket
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    /// Bound by the `hello` handshake
    pub client_id: Option<ClientId>,
    /// Bound by the `hello` handshake
    pub user: Option<DisplayName>,
    pub last_seen: Timestamp,
    channel: PusherChannel,
}

impl Connection {
    pub fn new(id: ConnectionId, channel: PusherChannel, now: Timestamp) -> Self {
        Self {
            id,
            client_id: None,
            user: None,
            last_seen: now,
            channel,
        }
    }

    /// Whether the transport behind this connection is still open
    pub fn is_open(&self) -> bool {
        !self.channel.is_closed()
    }
}

/// Registry of the sockets attached to a room
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Returns `false` if the id is already registered,
    /// in which case the registry is left unchanged.
    pub fn insert(&mut self, connection: Connection) -> bool {
        if self.connections.contains_key(&connection.id) {
            return false;
        }
        self.connections.insert(connection.id, connection);
        true
    }

    /// Deregister a connection (idempotent)
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Connection> {
        self.connections.remove(id)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn get_mut(&mut self, id: &ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    /// Refresh the last-seen timestamp of a connection
    pub fn touch(&mut self, id: &ConnectionId, now: Timestamp) {
        if let Some(connection) = self.connections.get_mut(id) {
            connection.last_seen = now;
        }
    }

    /// Number of registered connections whose transport is still open
    pub fn open_count(&self) -> usize {
        self.connections.values().filter(|c| c.is_open()).count()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Every registered connection, open or not
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }

    /// Open connections whose last-seen age exceeds `threshold_millis`
    pub fn stale_ids(&self, now: Timestamp, threshold_millis: i64) -> Vec<ConnectionId> {
        self.connections
            .values()
            .filter(|c| c.is_open() && c.last_seen.millis_until(now) > threshold_millis)
            .map(|c| c.id)
            .collect()
    }

    /// Registered connections whose transport has already closed
    pub fn closed_ids(&self) -> Vec<ConnectionId> {
        self.connections
            .values()
            .filter(|c| !c.is_open())
            .map(|c| c.id)
            .collect()
    }

    /// Queue a frame for one connection
    pub fn push_to(&self, id: &ConnectionId, frame: Outbound) -> Result<(), MessagePushError> {
        let connection = self
            .connections
            .get(id)
            .ok_or_else(|| MessagePushError::ConnectionNotFound(id.to_string()))?;
        connection
            .channel
            .send(frame)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))
    }

    /// Queue a text frame for every open connection
    ///
    /// Delivery is best-effort: a connection whose channel closed in the
    /// meantime is skipped and cleaned up by its close event.
    pub fn broadcast(&self, text: &str) {
        for connection in self.connections.values() {
            if !connection.is_open() {
                continue;
            }
            if let Err(e) = connection.channel.send(Outbound::Text(text.to_string())) {
                tracing::warn!("Failed to push message to connection '{}': {}", connection.id, e);
            }
        }
    }
}
