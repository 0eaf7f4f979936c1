//! Artifacts: typed content units created manually or by the AI.

use serde::{Deserialize, Serialize};

use super::{error::RoomError, value_object::Timestamp};

/// Maximum length of an artifact title (characters)
pub const ARTIFACT_TITLE_MAX_LEN: usize = 200;
/// Maximum length of manually supplied artifact content (characters)
pub const ARTIFACT_CONTENT_MAX_LEN: usize = 100_000;
/// Maximum length of an artifact id (characters)
pub const ARTIFACT_ID_MAX_LEN: usize = 64;

/// Kind of artifact; selects the AI instruction template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    Summary,
    Plan,
    Notes,
    Custom,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Summary => "summary",
            ArtifactType::Plan => "plan",
            ArtifactType::Notes => "notes",
            ArtifactType::Custom => "custom",
        }
    }

    /// Title used when the creator does not supply one
    pub fn default_title(&self) -> &'static str {
        match self {
            ArtifactType::Summary => "Summary",
            ArtifactType::Plan => "Plan",
            ArtifactType::Notes => "Notes",
            ArtifactType::Custom => "Custom artifact",
        }
    }

    /// Instruction sent to the AI when generating an artifact of this type
    pub fn instruction(&self, title: &str) -> String {
        match self {
            ArtifactType::Summary => "Write a concise summary of the conversation so far. \
                 Cover the main topics, the conclusions reached and any open questions. \
                 Use Markdown."
                .to_string(),
            ArtifactType::Plan => "Turn the conversation and pinned memory into an actionable plan. \
                 List concrete steps in order, with owners where they were mentioned. \
                 Use Markdown."
                .to_string(),
            ArtifactType::Notes => "Write structured meeting notes for the conversation so far: \
                 key points, decisions and action items. Use Markdown."
                .to_string(),
            ArtifactType::Custom => format!(
                "Write a document titled \"{title}\" based on the conversation and pinned memory. \
                 Use Markdown."
            ),
        }
    }
}

/// A stored artifact including its content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub title: String,
    pub content: String,
    pub created_at: Timestamp,
    pub created_by: String,
}

impl Artifact {
    /// Create an artifact with a freshly generated id
    pub fn new(
        artifact_type: ArtifactType,
        title: String,
        content: String,
        created_at: Timestamp,
        created_by: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            artifact_type,
            title,
            content,
            created_at,
            created_by,
        }
    }

    /// Metadata view without content
    pub fn meta(&self) -> ArtifactMeta {
        ArtifactMeta {
            id: self.id.clone(),
            artifact_type: self.artifact_type,
            title: self.title.clone(),
            created_at: self.created_at,
            created_by: self.created_by.clone(),
        }
    }
}

/// Artifact metadata, used in list payloads to bound their size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMeta {
    pub id: String,
    pub artifact_type: ArtifactType,
    pub title: String,
    pub created_at: Timestamp,
    pub created_by: String,
}

/// Id-addressed collection of artifacts, in creation order
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    items: Vec<Artifact>,
}

impl ArtifactStore {
    /// Rebuild from persisted artifacts, dropping any duplicate ids
    pub fn from_artifacts(artifacts: Vec<Artifact>) -> Self {
        let mut store = Self::default();
        for artifact in artifacts {
            if let Err(e) = store.insert(artifact) {
                tracing::warn!("Skipping persisted artifact: {}", e);
            }
        }
        store
    }

    /// Append an artifact
    ///
    /// # Errors
    ///
    /// Returns `RoomError::DuplicateArtifact` if the id is already present
    pub fn insert(&mut self, artifact: Artifact) -> Result<(), RoomError> {
        if self.get(&artifact.id).is_some() {
            return Err(RoomError::DuplicateArtifact(artifact.id));
        }
        self.items.push(artifact);
        Ok(())
    }

    /// Remove and return the artifact with `id`
    ///
    /// # Errors
    ///
    /// Returns `RoomError::ArtifactNotFound` if no artifact has that id
    pub fn remove(&mut self, id: &str) -> Result<Artifact, RoomError> {
        let position = self
            .items
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| RoomError::ArtifactNotFound(id.to_string()))?;
        Ok(self.items.remove(position))
    }

    pub fn get(&self, id: &str) -> Option<&Artifact> {
        self.items.iter().find(|a| a.id == id)
    }

    pub fn metas(&self) -> Vec<ArtifactMeta> {
        self.items.iter().map(Artifact::meta).collect()
    }

    pub fn as_slice(&self) -> &[Artifact] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
