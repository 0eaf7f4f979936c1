//! Connection lifecycle, presence and outbound helpers.

use std::sync::atomic::Ordering;

use crate::{
    domain::{
        ClientId, Connection, ConnectionId, DisplayName, Outbound, PusherChannel, keys,
    },
    infrastructure::dto::websocket::{ChatEntryDto, ServerMessage},
};

use super::RoomCoordinator;

impl RoomCoordinator {
    pub(super) fn on_open(&mut self, connection_id: ConnectionId, channel: PusherChannel) {
        let connection = Connection::new(connection_id, channel, self.now());
        if !self.connections.insert(connection) {
            tracing::warn!(
                "Connection '{}' is already registered in room '{}'",
                connection_id,
                self.room
            );
            return;
        }
        tracing::info!("Connection '{}' joined room '{}'", connection_id, self.room);

        self.ensure_heartbeat();
        self.broadcast_presence();
        self.send_snapshot(&connection_id);
    }

    /// Deregister a connection. Unknown ids are ignored.
    pub(super) fn on_close(&mut self, connection_id: ConnectionId) {
        if self.connections.remove(&connection_id).is_none() {
            return;
        }
        tracing::info!("Connection '{}' left room '{}'", connection_id, self.room);
        self.broadcast_presence();
        if self.connections.is_empty() {
            self.disarm_heartbeat();
        }
    }

    /// Bind identity to a connection and settle room ownership
    pub(super) async fn on_hello(
        &mut self,
        connection_id: ConnectionId,
        client_id: ClientId,
        user: DisplayName,
    ) {
        let Some(connection) = self.connections.get_mut(&connection_id) else {
            return;
        };
        connection.client_id = Some(client_id.clone());
        connection.user = Some(user);

        if self.owner_id.is_none() {
            self.owner_id = Some(client_id.clone());
            match self
                .persister
                .persist_and_confirm(keys::OWNER_ID, &client_id)
                .await
            {
                Ok(()) => tracing::info!(
                    "Client '{}' is now the owner of room '{}'",
                    client_id,
                    self.room
                ),
                Err(e) => tracing::error!(
                    "Failed to persist owner '{}' of room '{}': {}",
                    client_id,
                    self.room,
                    e
                ),
            }
        }

        let info = ServerMessage::RoomInfo {
            owner_id: self.owner_id.as_ref().map(|id| id.as_str().to_string()),
            client_id: client_id.into_string(),
        };
        self.send_to(&connection_id, &info);
    }

    pub(super) fn broadcast_presence(&self) {
        let count = self.connections.open_count();
        self.presence.store(count, Ordering::Relaxed);
        self.broadcast(&ServerMessage::Presence { count });
    }

    /// Replay current state to a newly opened socket
    fn send_snapshot(&self, connection_id: &ConnectionId) {
        for entry in self.history.iter() {
            self.send_to(connection_id, &ServerMessage::from(entry));
        }
        self.send_to(connection_id, &self.memory_update_message());
        self.send_to(connection_id, &self.artifact_list_message());
    }

    /// True when the connection's bound client id is the room owner
    pub(super) fn is_owner(&self, connection_id: &ConnectionId) -> bool {
        match (&self.owner_id, self.connections.get(connection_id)) {
            (Some(owner), Some(connection)) => connection.client_id.as_ref() == Some(owner),
            _ => false,
        }
    }

    pub(super) fn send_to(&self, connection_id: &ConnectionId, message: &ServerMessage) {
        if let Err(e) = self
            .connections
            .push_to(connection_id, Outbound::Text(message.to_json()))
        {
            tracing::debug!("Failed to push to '{}': {}", connection_id, e);
        }
    }

    pub(super) fn broadcast(&self, message: &ServerMessage) {
        self.connections.broadcast(&message.to_json());
    }

    /// System notice to one connection; never stored in history
    pub(super) fn notify(&self, connection_id: &ConnectionId, text: &str) {
        let notice = self.system_notice(text);
        self.send_to(connection_id, &notice);
    }

    /// System notice to every open connection; never stored in history
    pub(super) fn broadcast_notice(&self, text: &str) {
        self.broadcast(&self.system_notice(text));
    }

    fn system_notice(&self, text: &str) -> ServerMessage {
        ServerMessage::Chat {
            user: DisplayName::system().into_string(),
            text: text.to_string(),
            ts: self.now().value(),
        }
    }

    /// History in wire form, oldest first
    pub(super) fn history_dtos(&self) -> Vec<ChatEntryDto> {
        self.history.iter().map(ChatEntryDto::from).collect()
    }
}
