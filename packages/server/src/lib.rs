//! EdgeRooms server library.
//!
//! Per-room collaboration coordinators (presence, chat history, pinned
//! memory, artifacts and a shared AI participant) hosted behind an axum
//! WebSocket endpoint.

// layers
pub mod domain;
pub mod infrastructure;
pub mod runtime;
pub mod ui;
pub mod usecase;

pub mod config;
