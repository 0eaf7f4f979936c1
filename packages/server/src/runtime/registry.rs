//! Room router.
//!
//! Maps each room key to its running task. The table is the only structure
//! shared between rooms; it is locked only to look up, activate, retire or
//! shut down a room, never while a room handles an event.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

use thiserror::Error;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};

use crate::{
    domain::{ConnectionId, PusherChannel, RoomKey, Timestamp},
    usecase::{RoomCoordinator, RoomEvent, RoomMailbox, RoomServices},
};

use super::host::run_room;

/// Errors returned by the room router
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The server is stopping and no longer activates rooms
    #[error("Server is shutting down")]
    ShuttingDown,
}

/// Cheap, cloneable address of a running room
#[derive(Debug, Clone)]
pub struct RoomHandle {
    key: RoomKey,
    instance: u64,
    mailbox: RoomMailbox,
    presence: Arc<AtomicUsize>,
    activated_at: Timestamp,
}

impl RoomHandle {
    pub fn key(&self) -> &RoomKey {
        &self.key
    }

    pub(super) fn instance(&self) -> u64 {
        self.instance
    }

    /// Post an event; false once the room has stopped
    pub fn send(&self, event: RoomEvent) -> bool {
        self.mailbox.send(event).is_ok()
    }

    pub fn presence(&self) -> usize {
        self.presence.load(Ordering::Relaxed)
    }
}

/// Snapshot of an active room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub key: RoomKey,
    pub presence: usize,
    pub activated_at: Timestamp,
}

pub(super) struct RoomEntry {
    pub(super) handle: RoomHandle,
    task: JoinHandle<()>,
}

pub(super) type RoomTable = Arc<Mutex<HashMap<RoomKey, RoomEntry>>>;

/// Room router
pub struct RoomRegistry {
    rooms: RoomTable,
    services: RoomServices,
    next_instance: AtomicU64,
    closed: AtomicBool,
}

impl RoomRegistry {
    pub fn new(services: RoomServices) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            services,
            next_instance: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Attach a socket to `room`, activating the room if needed.
    ///
    /// Returns the handle the socket must use for its later events.
    pub async fn open(
        &self,
        room: &RoomKey,
        connection_id: ConnectionId,
        channel: PusherChannel,
    ) -> Result<RoomHandle, RegistryError> {
        let mut event = RoomEvent::Open {
            connection_id,
            channel,
        };
        loop {
            let handle = self.get_or_activate(room).await?;
            match handle.mailbox.send(event) {
                Ok(()) => return Ok(handle),
                // The room retired between lookup and send
                Err(mpsc::error::SendError(returned)) => {
                    event = returned;
                    self.forget(&handle).await;
                }
            }
        }
    }

    async fn get_or_activate(&self, room: &RoomKey) -> Result<RoomHandle, RegistryError> {
        let mut rooms = self.rooms.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(RegistryError::ShuttingDown);
        }
        if let Some(entry) = rooms.get(room) {
            return Ok(entry.handle.clone());
        }

        let (mailbox, rx) = mpsc::unbounded_channel();
        let coordinator = RoomCoordinator::new(room.clone(), self.services.clone(), mailbox.clone());
        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
        let handle = RoomHandle {
            key: room.clone(),
            instance,
            mailbox,
            presence: coordinator.presence_gauge(),
            activated_at: Timestamp::new(self.services.clock.now_millis()),
        };
        let task = tokio::spawn(run_room(
            coordinator,
            rx,
            Arc::clone(&self.rooms),
            instance,
        ));
        rooms.insert(
            room.clone(),
            RoomEntry {
                handle: handle.clone(),
                task,
            },
        );
        tracing::info!("Room '{}' activated (active rooms: {})", room, rooms.len());
        Ok(handle)
    }

    /// Drop a stale entry if it still points at `handle`'s instance
    async fn forget(&self, handle: &RoomHandle) {
        let mut rooms = self.rooms.lock().await;
        if rooms
            .get(handle.key())
            .is_some_and(|entry| entry.handle.instance == handle.instance)
        {
            rooms.remove(handle.key());
        }
    }

    /// Active rooms ordered by key
    pub async fn summaries(&self) -> Vec<RoomSummary> {
        let rooms = self.rooms.lock().await;
        let mut summaries: Vec<RoomSummary> = rooms
            .values()
            .map(|entry| RoomSummary {
                key: entry.handle.key.clone(),
                presence: entry.handle.presence(),
                activated_at: entry.handle.activated_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.key.as_str().cmp(b.key.as_str()));
        summaries
    }

    /// Stop every room: flush pending state and close all sockets
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let entries: Vec<RoomEntry> = {
            let mut rooms = self.rooms.lock().await;
            rooms.drain().map(|(_, entry)| entry).collect()
        };
        tracing::info!("Shutting down {} room(s)", entries.len());

        for entry in &entries {
            entry.handle.send(RoomEvent::Shutdown);
        }
        for entry in entries {
            if let Err(e) = entry.task.await {
                tracing::error!("Room task '{}' failed: {}", entry.handle.key, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use edgerooms_shared::time::FixedClock;
    use serde_json::Value;

    use crate::{
        config::RoomConfig,
        domain::{Outbound, RoomStore, keys},
        infrastructure::{completion::DisabledCompletionClient, repository::InMemoryRoomStore},
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 同じルームキーの接続が同じルームタスクに集約されること
    // - 接続がなくなったルームが自動的に退役し、未保存の状態を書き出すこと
    // - shutdown で全ルームのソケットが閉じられ、以降は新規接続を受け付けないこと
    //
    // 【どのような状況を想定しているか】
    // - 実際の tokio タスクで動かし、ソケットの代わりにチャネルを使う
    // ========================================

    const ACTIVATED_AT: i64 = 1_700_000_000_000;

    fn registry() -> (RoomRegistry, Arc<InMemoryRoomStore>) {
        let store = Arc::new(InMemoryRoomStore::new());
        let services = RoomServices {
            store: store.clone(),
            completion: Arc::new(DisabledCompletionClient),
            clock: Arc::new(FixedClock::new(ACTIVATED_AT)),
            config: RoomConfig::default(),
        };
        (RoomRegistry::new(services), store)
    }

    fn room(key: &str) -> RoomKey {
        RoomKey::new(key.to_string()).unwrap()
    }

    async fn next_text(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Value {
        loop {
            match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
                Ok(Some(Outbound::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Ok(Some(Outbound::Close)) => continue,
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    }

    async fn wait_until_empty(registry: &RoomRegistry) {
        for _ in 0..200 {
            if registry.summaries().await.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("room did not retire");
    }

    #[tokio::test]
    async fn test_connections_to_same_key_share_one_room() {
        // テスト項目: 同じルームキーへの接続は 1 つのルームに集約される
        // given (前提条件):
        let (registry, _store) = registry();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        // when (操作):
        let a = registry.open(&room("r1"), ConnectionId::generate(), tx_a).await.unwrap();
        next_text(&mut rx_a).await;
        let b = registry.open(&room("r1"), ConnectionId::generate(), tx_b).await.unwrap();
        let presence = next_text(&mut rx_b).await;

        // then (期待する結果):
        assert_eq!(a.instance(), b.instance());
        assert_eq!(a.key(), &room("r1"));
        assert_eq!(presence["count"], 2);
        let summaries = registry.summaries().await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].presence, 2);
        assert_eq!(summaries[0].activated_at, Timestamp::new(ACTIVATED_AT));
    }

    #[tokio::test]
    async fn test_rooms_are_independent() {
        // テスト項目: 異なるルームキーは別々のルームになる
        // given (前提条件):
        let (registry, _store) = registry();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        // when (操作):
        registry.open(&room("alpha"), ConnectionId::generate(), tx_a).await.unwrap();
        registry.open(&room("Alpha"), ConnectionId::generate(), tx_b).await.unwrap();

        // then (期待する結果):
        assert_eq!(next_text(&mut rx_a).await["count"], 1);
        assert_eq!(next_text(&mut rx_b).await["count"], 1);
        let keys: Vec<String> = registry
            .summaries()
            .await
            .into_iter()
            .map(|s| s.key.into_string())
            .collect();
        assert_eq!(keys, vec!["Alpha".to_string(), "alpha".to_string()]);
    }

    #[tokio::test]
    async fn test_room_retires_and_flushes_when_last_connection_closes() {
        // テスト項目: 最後の接続が閉じるとルームが退役し、未保存の履歴が書き出される
        // given (前提条件):
        let (registry, store) = registry();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = ConnectionId::generate();
        let handle = registry.open(&room("r1"), id, tx).await.unwrap();
        next_text(&mut rx).await;
        handle.send(RoomEvent::Message {
            connection_id: id,
            text: r#"{"type":"chat","user":"A","text":"bye"}"#.to_string(),
        });

        // when (操作):
        handle.send(RoomEvent::Close { connection_id: id });
        wait_until_empty(&registry).await;

        // then (期待する結果):
        let mut stored = None;
        for _ in 0..200 {
            stored = store.get(&room("r1"), keys::HISTORY).await.unwrap();
            if stored.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(stored.unwrap()[0]["text"], "bye");
        assert!(!handle.send(RoomEvent::Close { connection_id: id }));
    }

    #[tokio::test]
    async fn test_reopen_after_retirement_activates_fresh_room() {
        // テスト項目: 退役後の再接続では新しいルームが起動し、保存済みの状態が読み込まれる
        // given (前提条件):
        let (registry, _store) = registry();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = ConnectionId::generate();
        let first = registry.open(&room("r1"), id, tx).await.unwrap();
        next_text(&mut rx).await;
        first.send(RoomEvent::Message {
            connection_id: id,
            text: r#"{"type":"hello","clientId":"u1","user":"A"}"#.to_string(),
        });
        next_text(&mut rx).await;
        first.send(RoomEvent::Close { connection_id: id });
        wait_until_empty(&registry).await;

        // when (操作):
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let id2 = ConnectionId::generate();
        let second = registry.open(&room("r1"), id2, tx2).await.unwrap();
        second.send(RoomEvent::Message {
            connection_id: id2,
            text: r#"{"type":"hello","clientId":"u2","user":"B"}"#.to_string(),
        });

        // then (期待する結果):
        assert_ne!(first.instance(), second.instance());
        let mut info = next_text(&mut rx2).await;
        while info["type"] != "room_info" {
            info = next_text(&mut rx2).await;
        }
        assert_eq!(info["ownerId"], "u1");
    }

    #[tokio::test]
    async fn test_shutdown_closes_sockets_and_refuses_new_rooms() {
        // テスト項目: shutdown で全ソケットが閉じられ、以降の接続は拒否される
        // given (前提条件):
        let (registry, _store) = registry();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.open(&room("r1"), ConnectionId::generate(), tx).await.unwrap();

        // when (操作):
        registry.shutdown().await;

        // then (期待する結果):
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        assert_eq!(frames.last(), Some(&Outbound::Close));
        assert!(registry.summaries().await.is_empty());
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let result = registry.open(&room("r1"), ConnectionId::generate(), tx2).await;
        assert_eq!(result.err(), Some(RegistryError::ShuttingDown));
    }
}
