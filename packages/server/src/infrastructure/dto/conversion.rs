//! Conversion logic between DTOs and domain entities.

use thiserror::Error;

use crate::domain::{
    Artifact, ArtifactMeta, ArtifactRequest, ArtifactSource, ArtifactType, ChatEntry, ChatText,
    ClientId, Command, DisplayName, MemoryKind, MemoryText, PinnedMemory, ValueObjectError,
    artifact::{ARTIFACT_CONTENT_MAX_LEN, ARTIFACT_ID_MAX_LEN, ARTIFACT_TITLE_MAX_LEN},
};
use crate::infrastructure::dto::websocket as dto;

/// Reasons an inbound frame is rejected
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Not JSON, or not a known message shape
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// A field is out of bounds
    #[error("Invalid field: {0}")]
    Invalid(#[from] ValueObjectError),

    /// A string field holds an unsupported value
    #[error("Unsupported {field}: '{value}'")]
    Unsupported { field: &'static str, value: String },
}

// ========================================
// DTO → Domain
// ========================================

/// Parse and validate one text frame
pub fn parse_command(text: &str) -> Result<Command, FrameError> {
    let message: dto::ClientMessage =
        serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))?;
    Command::try_from(message)
}

fn memory_kind(value: String) -> Result<MemoryKind, FrameError> {
    match value.as_str() {
        "memories" => Ok(MemoryKind::Memories),
        "todos" => Ok(MemoryKind::Todos),
        _ => Err(FrameError::Unsupported {
            field: "kind",
            value,
        }),
    }
}

fn artifact_type(value: String) -> Result<ArtifactType, FrameError> {
    match value.as_str() {
        "summary" => Ok(ArtifactType::Summary),
        "plan" => Ok(ArtifactType::Plan),
        "notes" => Ok(ArtifactType::Notes),
        "custom" => Ok(ArtifactType::Custom),
        _ => Err(FrameError::Unsupported {
            field: "artifactType",
            value,
        }),
    }
}

fn bounded(value: String, max: usize, field: &'static str) -> Result<String, FrameError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ValueObjectError::Empty { field }.into());
    }
    if len > max {
        return Err(ValueObjectError::TooLong {
            field,
            max,
            actual: len,
        }
        .into());
    }
    Ok(value)
}

/// Blank titles fall back to the type's default title.
fn optional_title(value: Option<String>) -> Result<Option<String>, FrameError> {
    match value.map(|t| t.trim().to_string()) {
        Some(title) if !title.is_empty() => {
            bounded(title, ARTIFACT_TITLE_MAX_LEN, "title").map(Some)
        }
        _ => Ok(None),
    }
}

fn artifact_request(
    mode: String,
    artifact_type_value: String,
    title: Option<String>,
    content: Option<String>,
    user: Option<String>,
) -> Result<ArtifactRequest, FrameError> {
    let source = match mode.as_str() {
        "manual" => ArtifactSource::Manual {
            content: bounded(
                content.unwrap_or_default(),
                ARTIFACT_CONTENT_MAX_LEN,
                "content",
            )?,
        },
        "ai" => ArtifactSource::Ai,
        _ => {
            return Err(FrameError::Unsupported {
                field: "mode",
                value: mode,
            });
        }
    };
    Ok(ArtifactRequest {
        artifact_type: artifact_type(artifact_type_value)?,
        title: optional_title(title)?,
        source,
        // The author hint is optional; an invalid one is ignored rather than
        // rejecting the whole request.
        user: user.and_then(|u| DisplayName::new(u).ok()),
    })
}

impl TryFrom<dto::ClientMessage> for Command {
    type Error = FrameError;

    fn try_from(message: dto::ClientMessage) -> Result<Self, Self::Error> {
        Ok(match message {
            dto::ClientMessage::Ping => Command::Ping,
            dto::ClientMessage::Hello { client_id, user } => Command::Hello {
                client_id: ClientId::new(client_id)?,
                user: DisplayName::new(user)?,
            },
            dto::ClientMessage::Chat { user, text } => Command::Chat {
                user: DisplayName::new(user)?,
                text: ChatText::new(text)?,
            },
            dto::ClientMessage::MemoryAdd { kind, text } => Command::MemoryAdd {
                kind: memory_kind(kind)?,
                text: MemoryText::new(text)?,
            },
            dto::ClientMessage::MemoryRemove { kind, index } => Command::MemoryRemove {
                kind: memory_kind(kind)?,
                index,
            },
            dto::ClientMessage::MemoryToggle { index } => Command::MemoryToggle { index },
            dto::ClientMessage::ArtifactCreate {
                mode,
                artifact_type,
                title,
                content,
                user,
            } => Command::ArtifactCreate(artifact_request(
                mode,
                artifact_type,
                title,
                content,
                user,
            )?),
            dto::ClientMessage::ArtifactDelete { id } => Command::ArtifactDelete {
                id: bounded(id, ARTIFACT_ID_MAX_LEN, "id")?,
            },
            dto::ClientMessage::ArtifactGet { id } => Command::ArtifactGet {
                id: bounded(id, ARTIFACT_ID_MAX_LEN, "id")?,
            },
            dto::ClientMessage::ArtifactList => Command::ArtifactList,
        })
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&PinnedMemory> for dto::PinnedMemoryDto {
    fn from(model: &PinnedMemory) -> Self {
        Self {
            memories: model.memories.clone(),
            todos: model
                .todos
                .iter()
                .map(|t| dto::TodoDto {
                    text: t.text.clone(),
                    done: t.done,
                })
                .collect(),
        }
    }
}

impl From<&ChatEntry> for dto::ChatEntryDto {
    fn from(model: &ChatEntry) -> Self {
        Self {
            user: model.user.clone(),
            text: model.text.clone(),
            ts: model.ts.value(),
        }
    }
}

impl From<&ChatEntry> for dto::ServerMessage {
    fn from(model: &ChatEntry) -> Self {
        Self::Chat {
            user: model.user.clone(),
            text: model.text.clone(),
            ts: model.ts.value(),
        }
    }
}

impl From<&Artifact> for dto::ArtifactDto {
    fn from(model: &Artifact) -> Self {
        Self {
            id: model.id.clone(),
            artifact_type: model.artifact_type.as_str().to_string(),
            title: model.title.clone(),
            content: model.content.clone(),
            created_at: model.created_at.value(),
            created_by: model.created_by.clone(),
        }
    }
}

impl From<ArtifactMeta> for dto::ArtifactMetaDto {
    fn from(model: ArtifactMeta) -> Self {
        Self {
            id: model.id,
            artifact_type: model.artifact_type.as_str().to_string(),
            title: model.title,
            created_at: model.created_at.value(),
            created_by: model.created_by,
        }
    }
}
