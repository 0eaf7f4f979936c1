//! Artifact creation, deletion and lookup.

use crate::{
    domain::{Artifact, ArtifactRequest, ArtifactSource, ConnectionId, DisplayName, keys},
    infrastructure::dto::websocket::{ArtifactDto, ArtifactMetaDto, ServerMessage},
};

use super::{CompletionPurpose, RoomCoordinator};

/// Author recorded when neither the connection nor the request names one
const ANONYMOUS: &str = "anonymous";

pub(super) const DELETE_FORBIDDEN_NOTICE: &str = "Only the room owner can delete artifacts.";
pub(super) const ARTIFACT_NOT_FOUND_NOTICE: &str = "Artifact not found.";

impl RoomCoordinator {
    pub(super) fn on_artifact_create(
        &mut self,
        connection_id: ConnectionId,
        request: ArtifactRequest,
    ) {
        let created_by = self.author_name(&connection_id, request.user.as_ref());
        let title = request.title_or_default();

        match request.source {
            ArtifactSource::Manual { content } => {
                let artifact = Artifact::new(
                    request.artifact_type,
                    title,
                    content,
                    self.now(),
                    created_by,
                );
                self.store_artifact(artifact);
            }
            ArtifactSource::Ai => {
                let prompt = request.artifact_type.instruction(&title);
                self.dispatch_completion(
                    connection_id,
                    prompt,
                    CompletionPurpose::Artifact {
                        artifact_type: request.artifact_type,
                        title,
                        created_by,
                    },
                );
            }
        }
    }

    /// Append, persist the full list and broadcast the new artifact
    pub(super) fn store_artifact(&mut self, artifact: Artifact) {
        let created = ServerMessage::ArtifactCreated {
            artifact: ArtifactDto::from(&artifact),
        };
        if let Err(e) = self.artifacts.insert(artifact) {
            tracing::warn!("Rejected artifact in room '{}': {}", self.room, e);
            return;
        }
        self.persister.persist(keys::ARTIFACTS, self.artifacts.as_slice());
        self.broadcast(&created);
    }

    pub(super) fn on_artifact_delete(&mut self, connection_id: ConnectionId, id: String) {
        if !self.is_owner(&connection_id) {
            self.notify(&connection_id, DELETE_FORBIDDEN_NOTICE);
            return;
        }
        match self.artifacts.remove(&id) {
            Ok(_) => {
                self.persister.persist(keys::ARTIFACTS, self.artifacts.as_slice());
                self.broadcast(&ServerMessage::ArtifactDeleted { id });
            }
            Err(e) => {
                tracing::debug!("Delete failed in room '{}': {}", self.room, e);
                self.notify(&connection_id, ARTIFACT_NOT_FOUND_NOTICE);
            }
        }
    }

    pub(super) fn on_artifact_get(&self, connection_id: ConnectionId, id: &str) {
        match self.artifacts.get(id) {
            Some(artifact) => self.send_to(
                &connection_id,
                &ServerMessage::ArtifactDetail {
                    artifact: artifact.into(),
                },
            ),
            None => self.notify(&connection_id, ARTIFACT_NOT_FOUND_NOTICE),
        }
    }

    pub(super) fn on_artifact_list(&self, connection_id: ConnectionId) {
        self.send_to(&connection_id, &self.artifact_list_message());
    }

    /// Metadata of every artifact, without content
    pub(super) fn artifact_list_message(&self) -> ServerMessage {
        ServerMessage::ArtifactList {
            items: self
                .artifacts
                .metas()
                .into_iter()
                .map(ArtifactMetaDto::from)
                .collect(),
        }
    }

    /// Bound display name, then the request's hint, then "anonymous"
    fn author_name(&self, connection_id: &ConnectionId, hint: Option<&DisplayName>) -> String {
        self.connections
            .get(connection_id)
            .and_then(|c| c.user.as_ref())
            .or(hint)
            .map(|name| name.as_str().to_string())
            .unwrap_or_else(|| ANONYMOUS.to_string())
    }
}
