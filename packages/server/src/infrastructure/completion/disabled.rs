//! Completion client used when the server runs without an AI endpoint.

use async_trait::async_trait;

use crate::domain::{CompletionClient, CompletionError};

/// Completion client that rejects every request
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCompletionClient;

#[async_trait]
impl CompletionClient for DisabledCompletionClient {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, CompletionError> {
        Err(CompletionError::NotConfigured)
    }
}
