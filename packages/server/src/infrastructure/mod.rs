//! Infrastructure layer: wire DTOs, persistent stores and the AI client.

pub mod completion;
pub mod dto;
pub mod repository;
