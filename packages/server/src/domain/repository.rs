//! Persistent store trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use serde_json::Value;

use super::{RoomKey, StoreError, Timestamp};

/// Keys under which a room's state is persisted
pub mod keys {
    pub const PINNED: &str = "pinned";
    pub const HISTORY: &str = "history";
    pub const OWNER_ID: &str = "ownerId";
    pub const ARTIFACTS: &str = "artifacts";
}

/// Room store trait
///
/// Key/value storage partitioned by room key, plus one scheduled wake-up
/// timestamp per room. Each key is independently readable and writable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, room: &RoomKey, key: &str) -> Result<Option<Value>, StoreError>;

    /// Overwrite the value stored under `key`
    async fn put(&self, room: &RoomKey, key: &str, value: Value) -> Result<(), StoreError>;

    /// Remove `key` (no-op if absent)
    async fn delete(&self, room: &RoomKey, key: &str) -> Result<(), StoreError>;

    /// Read the scheduled wake-up, if any
    async fn get_alarm(&self, room: &RoomKey) -> Result<Option<Timestamp>, StoreError>;

    /// Schedule (or reschedule) the wake-up
    async fn set_alarm(&self, room: &RoomKey, at: Timestamp) -> Result<(), StoreError>;

    /// Clear the wake-up (no-op if none)
    async fn delete_alarm(&self, room: &RoomKey) -> Result<(), StoreError>;
}
