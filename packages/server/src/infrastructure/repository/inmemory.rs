//! InMemory Room Store 実装
//!
//! ドメイン層が定義する RoomStore trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。プロセス終了時にデータは失われます。

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::domain::{RoomKey, RoomStore, StoreError, Timestamp};

#[derive(Debug, Default)]
struct RoomRecord {
    values: HashMap<String, Value>,
    alarm: Option<Timestamp>,
    /// Number of `put` calls per key
    writes: HashMap<String, usize>,
}

/// インメモリ Room Store 実装
#[derive(Debug, Default)]
pub struct InMemoryRoomStore {
    rooms: Mutex<HashMap<RoomKey, RoomRecord>>,
}

impl InMemoryRoomStore {
    /// 新しい InMemoryRoomStore を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes to `key` in `room` since creation
    pub async fn write_count(&self, room: &RoomKey, key: &str) -> usize {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room)
            .and_then(|r| r.writes.get(key).copied())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn get(&self, room: &RoomKey, key: &str) -> Result<Option<Value>, StoreError> {
        let rooms = self.rooms.lock().await;
        Ok(rooms.get(room).and_then(|r| r.values.get(key).cloned()))
    }

    async fn put(&self, room: &RoomKey, key: &str, value: Value) -> Result<(), StoreError> {
        let mut rooms = self.rooms.lock().await;
        let record = rooms.entry(room.clone()).or_default();
        record.values.insert(key.to_string(), value);
        *record.writes.entry(key.to_string()).or_default() += 1;
        Ok(())
    }

    async fn delete(&self, room: &RoomKey, key: &str) -> Result<(), StoreError> {
        let mut rooms = self.rooms.lock().await;
        if let Some(record) = rooms.get_mut(room) {
            record.values.remove(key);
        }
        Ok(())
    }

    async fn get_alarm(&self, room: &RoomKey) -> Result<Option<Timestamp>, StoreError> {
        let rooms = self.rooms.lock().await;
        Ok(rooms.get(room).and_then(|r| r.alarm))
    }

    async fn set_alarm(&self, room: &RoomKey, at: Timestamp) -> Result<(), StoreError> {
        let mut rooms = self.rooms.lock().await;
        rooms.entry(room.clone()).or_default().alarm = Some(at);
        Ok(())
    }

    async fn delete_alarm(&self, room: &RoomKey) -> Result<(), StoreError> {
        let mut rooms = self.rooms.lock().await;
        if let Some(record) = rooms.get_mut(room) {
            record.alarm = None;
        }
        Ok(())
    }
}
