//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Active room summary for `GET /api/rooms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub id: String,
    /// Number of open connections
    pub presence: usize,
    /// RFC 3339 timestamp of the room's activation
    pub activated_at: String,
}
