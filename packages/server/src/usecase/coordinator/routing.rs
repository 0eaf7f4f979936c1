//! Command routing: inbound frames, legacy slash commands and reset.

use crate::{
    domain::{ArtifactType, Command, ConnectionId, LegacyCommand, MemoryKind, keys},
    infrastructure::dto::{conversion::parse_command, websocket::ServerMessage},
};

use super::{CompletionPurpose, RoomCoordinator};

pub(super) const RESET_FORBIDDEN_NOTICE: &str = "Only the room owner can reset the room.";

impl RoomCoordinator {
    /// Refresh liveness, then parse and route one text frame.
    /// Frames that fail to parse or validate are dropped without a reply.
    pub(super) async fn on_message(&mut self, connection_id: ConnectionId, text: String) {
        self.connections.touch(&connection_id, self.now());
        if self.connections.get(&connection_id).is_none() {
            tracing::debug!("Frame from unknown connection '{}' ignored", connection_id);
            return;
        }

        let command = match parse_command(&text) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!("Dropping frame from '{}': {}", connection_id, e);
                return;
            }
        };
        self.route(connection_id, command).await;
    }

    async fn route(&mut self, connection_id: ConnectionId, command: Command) {
        match command {
            Command::Ping => self.send_to(&connection_id, &ServerMessage::Pong),
            Command::Hello { client_id, user } => {
                self.on_hello(connection_id, client_id, user).await
            }
            Command::Chat { user, text } => self.on_chat(connection_id, user, text).await,
            Command::MemoryAdd { kind, text } => self.on_memory_add(kind, text),
            Command::MemoryRemove { kind, index } => self.on_memory_remove(kind, index),
            Command::MemoryToggle { index } => self.on_memory_toggle(index),
            Command::ArtifactCreate(request) => self.on_artifact_create(connection_id, request),
            Command::ArtifactDelete { id } => self.on_artifact_delete(connection_id, id),
            Command::ArtifactGet { id } => self.on_artifact_get(connection_id, &id),
            Command::ArtifactList => self.on_artifact_list(connection_id),
        }
    }

    pub(super) async fn run_legacy(&mut self, connection_id: ConnectionId, command: LegacyCommand) {
        match command {
            LegacyCommand::Remember(text) => self.on_memory_add(MemoryKind::Memories, text),
            LegacyCommand::Todo(text) => self.on_memory_add(MemoryKind::Todos, text),
            LegacyCommand::ShowMemory => self.notify(&connection_id, &self.pinned.format()),
            LegacyCommand::Export => {
                let export = ServerMessage::Export {
                    data: self.export_snapshot(),
                };
                self.send_to(&connection_id, &export);
            }
            LegacyCommand::Reset => self.reset(connection_id),
            LegacyCommand::Summarize => {
                let summary = ArtifactType::Summary;
                self.dispatch_completion(
                    connection_id,
                    summary.instruction(summary.default_title()),
                    CompletionPurpose::ChatReply,
                );
            }
            LegacyCommand::AskAi(prompt) => {
                self.dispatch_completion(connection_id, prompt, CompletionPurpose::ChatReply)
            }
        }
    }

    /// Owner-only: clear history, pinned memory and artifacts
    fn reset(&mut self, connection_id: ConnectionId) {
        if !self.is_owner(&connection_id) {
            self.notify(&connection_id, RESET_FORBIDDEN_NOTICE);
            return;
        }

        self.history.clear();
        self.unflushed_entries = 0;
        self.pinned.clear();
        self.artifacts.clear();
        self.cancel_memory_flush();

        self.persister.persist(keys::HISTORY, &self.history.to_vec());
        self.persister.persist(keys::PINNED, &self.pinned);
        self.persister.persist(keys::ARTIFACTS, self.artifacts.as_slice());

        self.broadcast(&ServerMessage::ClearChat);
        self.broadcast(&self.memory_update_message());
        self.broadcast(&self.artifact_list_message());
        tracing::info!("Room '{}' was reset by '{}'", self.room, connection_id);
    }
}
