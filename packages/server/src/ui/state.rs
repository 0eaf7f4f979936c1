//! Shared application state.

use std::sync::Arc;

use crate::runtime::RoomRegistry;

/// State handed to every request handler
pub struct AppState {
    /// Room router (one coordinator task per active room)
    pub registry: Arc<RoomRegistry>,
}
