//! Events processed by a room's host loop.

use tokio::sync::mpsc;

use crate::domain::{ArtifactType, CompletionError, ConnectionId, PusherChannel};

/// Sender half of a room's mailbox
pub type RoomMailbox = mpsc::UnboundedSender<RoomEvent>;

/// What a finished completion is used for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionPurpose {
    /// Reply appended to the chat as the AI
    ChatReply,
    /// Content of a new artifact
    Artifact {
        artifact_type: ArtifactType,
        title: String,
        created_by: String,
    },
}

/// One unit of work for a room coordinator.
///
/// Events are handled one at a time, in mailbox order.
#[derive(Debug)]
pub enum RoomEvent {
    /// A socket was accepted
    Open {
        connection_id: ConnectionId,
        channel: PusherChannel,
    },
    /// A text frame arrived
    Message {
        connection_id: ConnectionId,
        text: String,
    },
    /// A non-text frame arrived (binary, ping, pong)
    Activity { connection_id: ConnectionId },
    /// The socket closed
    Close { connection_id: ConnectionId },
    /// The transport failed
    Error {
        connection_id: ConnectionId,
        reason: String,
    },
    /// Heartbeat wake-up
    HeartbeatAlarm { generation: u64 },
    /// Debounced pinned-memory flush
    MemoryFlush { generation: u64 },
    /// An AI completion returned
    CompletionFinished {
        purpose: CompletionPurpose,
        result: Result<String, CompletionError>,
    },
    /// Flush and stop
    Shutdown,
}
