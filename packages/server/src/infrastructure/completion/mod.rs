//! AI completion collaborator implementations
//!
//! - `openai`: OpenAI-compatible `/chat/completions` HTTP client
//! - `disabled`: always fails; used when no endpoint is configured

pub mod disabled;
pub mod openai;

pub use disabled::DisabledCompletionClient;
pub use openai::{OpenAiCompletionClient, OpenAiConfig};
