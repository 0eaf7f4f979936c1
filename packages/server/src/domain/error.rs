//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// Required field was empty
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Field exceeded its maximum length
    #[error("{field} cannot exceed {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

/// Errors related to Room domain logic
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// Index does not address an existing pinned memory entry
    #[error("{kind} index {index} is out of range (len: {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    /// Artifact id is already used in this room
    #[error("Artifact '{0}' already exists")]
    DuplicateArtifact(String),

    /// Artifact id does not exist in this room
    #[error("Artifact '{0}' not found")]
    ArtifactNotFound(String),
}

/// Errors returned by the persistent store adapter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying I/O failed
    #[error("Store I/O error: {0}")]
    Io(String),

    /// Stored value could not be (de)serialized
    #[error("Store serialization error: {0}")]
    Serialization(String),

    /// The room's write queue is gone (room shut down)
    #[error("Store writer is closed")]
    WriterClosed,
}

/// Errors returned by the AI completion collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// No completion endpoint was configured
    #[error("AI is not configured on this server")]
    NotConfigured,

    /// The request could not be sent or the response not read
    #[error("AI request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status
    #[error("AI endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The endpoint answered but without any text
    #[error("AI returned an empty response")]
    EmptyResponse,

    /// The completion client panicked
    #[error("AI request crashed")]
    Crashed,
}

/// Errors related to pushing frames to a connection
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessagePushError {
    /// The connection is not registered
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    /// The connection's outbound channel is closed
    #[error("Failed to push message: {0}")]
    PushFailed(String),
}
