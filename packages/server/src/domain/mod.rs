//! Domain layer for the collaboration room.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod artifact;
pub mod command;
pub mod completion;
pub mod connection;
pub mod entity;
pub mod error;
pub mod repository;
pub mod value_object;

pub use artifact::{Artifact, ArtifactMeta, ArtifactStore, ArtifactType};
pub use command::{ArtifactRequest, ArtifactSource, Command, LegacyCommand};
pub use completion::CompletionClient;
pub use connection::{Connection, ConnectionRegistry, Outbound, PusherChannel};
pub use entity::{ChatEntry, ChatHistory, MemoryKind, PinnedMemory, TodoItem};
pub use error::{CompletionError, MessagePushError, RoomError, StoreError, ValueObjectError};
pub use repository::{RoomStore, keys};
pub use value_object::{
    ChatText, ClientId, ConnectionId, DisplayName, MemoryText, RoomKey, Timestamp,
};

#[cfg(test)]
pub use completion::MockCompletionClient;
#[cfg(test)]
pub use repository::MockRoomStore;
