//! Chat history: append, broadcast and batched persistence.

use crate::{
    domain::{ChatEntry, ChatText, ConnectionId, DisplayName, LegacyCommand, keys},
    infrastructure::dto::websocket::{ArtifactDto, ExportDto, ServerMessage},
};

use super::RoomCoordinator;

impl RoomCoordinator {
    /// Accept a chat line, then run it as a slash command if it is one
    pub(super) async fn on_chat(
        &mut self,
        connection_id: ConnectionId,
        user: DisplayName,
        text: ChatText,
    ) {
        let command = LegacyCommand::parse(text.as_str());
        let entry = ChatEntry::new(user, text, self.now());
        self.append_and_broadcast(entry);

        if let Some(command) = command {
            self.run_legacy(connection_id, command).await;
        }
    }

    /// Broadcast an entry with its single server timestamp and append it
    pub(super) fn append_and_broadcast(&mut self, entry: ChatEntry) {
        self.broadcast(&ServerMessage::from(&entry));
        self.history.push(entry);

        self.unflushed_entries += 1;
        if self.unflushed_entries >= self.services.config.history_flush_every {
            self.flush_history();
        }
    }

    pub(super) fn flush_history(&mut self) {
        self.unflushed_entries = 0;
        self.persister.persist(keys::HISTORY, &self.history.to_vec());
    }

    pub(super) fn flush_history_if_dirty(&mut self) {
        if self.unflushed_entries > 0 {
            self.flush_history();
        }
    }

    /// Snapshot of the in-memory room state
    pub(super) fn export_snapshot(&self) -> ExportDto {
        ExportDto {
            room_id: self.room.as_str().to_string(),
            owner_id: self.owner_id.as_ref().map(|id| id.as_str().to_string()),
            pinned: (&self.pinned).into(),
            history: self.history_dtos(),
            artifacts: self.artifacts.as_slice().iter().map(ArtifactDto::from).collect(),
        }
    }
}
