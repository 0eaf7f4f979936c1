//! WebSocket message DTOs for the room protocol.
//!
//! Every frame is a JSON object with a `type` discriminator.

use serde::{Deserialize, Serialize};

/// Frame sent by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "hello")]
    Hello {
        #[serde(rename = "clientId")]
        client_id: String,
        user: String,
    },
    #[serde(rename = "chat")]
    Chat { user: String, text: String },
    #[serde(rename = "memory.add")]
    MemoryAdd { kind: String, text: String },
    #[serde(rename = "memory.remove")]
    MemoryRemove { kind: String, index: usize },
    #[serde(rename = "memory.toggle")]
    MemoryToggle { index: usize },
    #[serde(rename = "artifact.create")]
    ArtifactCreate {
        mode: String,
        #[serde(rename = "artifactType")]
        artifact_type: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        user: Option<String>,
    },
    #[serde(rename = "artifact.delete")]
    ArtifactDelete { id: String },
    #[serde(rename = "artifact.get")]
    ArtifactGet { id: String },
    #[serde(rename = "artifact.list")]
    ArtifactList,
}

/// Todo item as sent to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoDto {
    pub text: String,
    pub done: bool,
}

/// Full pinned memory snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedMemoryDto {
    pub memories: Vec<String>,
    pub todos: Vec<TodoDto>,
}

/// Chat history entry as exported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntryDto {
    pub user: String,
    pub text: String,
    pub ts: i64,
}

/// Artifact metadata (no content)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetaDto {
    pub id: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub title: String,
    pub created_at: i64,
    pub created_by: String,
}

/// Artifact including content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDto {
    pub id: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub created_by: String,
}

/// Snapshot of a room's in-memory state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDto {
    pub room_id: String,
    pub owner_id: Option<String>,
    pub pinned: PinnedMemoryDto,
    pub history: Vec<ChatEntryDto>,
    pub artifacts: Vec<ArtifactDto>,
}

/// Frame sent by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Pong,
    Chat {
        user: String,
        text: String,
        ts: i64,
    },
    Presence {
        count: usize,
    },
    MemoryUpdate {
        pinned: PinnedMemoryDto,
    },
    ArtifactList {
        items: Vec<ArtifactMetaDto>,
    },
    ArtifactCreated {
        artifact: ArtifactDto,
    },
    ArtifactDetail {
        artifact: ArtifactDto,
    },
    ArtifactDeleted {
        id: String,
    },
    Export {
        data: ExportDto,
    },
    RoomInfo {
        #[serde(rename = "ownerId")]
        owner_id: Option<String>,
        #[serde(rename = "clientId")]
        client_id: String,
    },
    ClearChat,
}

impl ServerMessage {
    /// Serialize to the JSON text sent over the socket
    pub fn to_json(&self) -> String {
        // Serializing plain structs, strings and integers into JSON cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hello() {
        // テスト項目: hello フレームが camelCase のフィールドで解釈される
        // given (前提条件):
        let json = r#"{"type":"hello","clientId":"u1","user":"Alice"}"#;

        // when (操作):
        let msg: ClientMessage = serde_json::from_str(json).unwrap();

        // then (期待する結果):
        assert!(matches!(
            msg,
            ClientMessage::Hello { ref client_id, ref user } if client_id == "u1" && user == "Alice"
        ));
    }

    #[test]
    fn test_parse_dotted_kinds() {
        // テスト項目: ドット区切りの type が対応するバリアントに解釈される
        // given (前提条件):
        let add = r#"{"type":"memory.add","kind":"todos","text":"ship"}"#;
        let list = r#"{"type":"artifact.list"}"#;

        // when (操作):
        let add: ClientMessage = serde_json::from_str(add).unwrap();
        let list: ClientMessage = serde_json::from_str(list).unwrap();

        // then (期待する結果):
        assert!(matches!(add, ClientMessage::MemoryAdd { .. }));
        assert!(matches!(list, ClientMessage::ArtifactList));
    }

    #[test]
    fn test_parse_unknown_type_fails() {
        // テスト項目: 未知の type はパースエラーになる
        // given (前提条件):
        let json = r#"{"type":"teleport"}"#;

        // when (操作):
        let result = serde_json::from_str::<ClientMessage>(json);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_negative_index_fails() {
        // テスト項目: 負のインデックスはパースエラーになる
        // given (前提条件):
        let json = r#"{"type":"memory.toggle","index":-1}"#;

        // when (操作):
        let result = serde_json::from_str::<ClientMessage>(json);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_server_message_wire_format() {
        // テスト項目: サーバーメッセージが期待する JSON 形式にシリアライズされる
        // given (前提条件):
        let info = ServerMessage::RoomInfo {
            owner_id: Some("u1".to_string()),
            client_id: "u2".to_string(),
        };
        let update = ServerMessage::MemoryUpdate {
            pinned: PinnedMemoryDto {
                memories: vec![],
                todos: vec![],
            },
        };

        // when (操作):
        let info: serde_json::Value = serde_json::from_str(&info.to_json()).unwrap();
        let update: serde_json::Value = serde_json::from_str(&update.to_json()).unwrap();
        let pong: serde_json::Value = serde_json::from_str(&ServerMessage::Pong.to_json()).unwrap();

        // then (期待する結果):
        assert_eq!(
            info,
            serde_json::json!({"type":"room_info","ownerId":"u1","clientId":"u2"})
        );
        assert_eq!(update["type"], "memory_update");
        assert_eq!(pong, serde_json::json!({"type":"pong"}));
    }
}
