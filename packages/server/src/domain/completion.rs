//! AI completion collaborator trait.

use async_trait::async_trait;

use super::CompletionError;

/// External text completion engine
///
/// Given a system prompt and a user prompt, returns a text completion or fails.
/// Implementations must not retry; the caller converts failures into notices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError>;
}
