//! Test harness driving a coordinator by hand.

use std::sync::Arc;

use edgerooms_shared::time::{Clock, ManualClock};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::{
    config::RoomConfig,
    domain::{CompletionClient, ConnectionId, Outbound, RoomKey, RoomStore, Timestamp},
    infrastructure::{completion::DisabledCompletionClient, repository::InMemoryRoomStore},
    usecase::RoomEvent,
};

use super::{RoomCoordinator, RoomServices};

pub const START_MILLIS: i64 = 1_700_000_000_000;

/// A fake socket: the receiving end of a connection's outbound channel
pub struct TestClient {
    pub id: ConnectionId,
    rx: mpsc::UnboundedReceiver<Outbound>,
}

impl TestClient {
    /// Everything pushed so far, raw
    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Text frames pushed so far, parsed as JSON
    pub fn drain(&mut self) -> Vec<Value> {
        self.drain_outbound()
            .into_iter()
            .filter_map(|frame| match frame {
                Outbound::Text(text) => Some(serde_json::from_str(&text).unwrap()),
                Outbound::Close => None,
            })
            .collect()
    }
}

pub fn frame_types(frames: &[Value]) -> Vec<&str> {
    frames
        .iter()
        .map(|f| f["type"].as_str().unwrap_or_default())
        .collect()
}

pub struct Harness {
    pub coordinator: RoomCoordinator,
    pub clock: ManualClock,
    pub store: Arc<InMemoryRoomStore>,
    room: RoomKey,
    mailbox_rx: mpsc::UnboundedReceiver<RoomEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_completion(DisabledCompletionClient)
    }

    pub fn with_completion(completion: impl CompletionClient + 'static) -> Self {
        let clock = ManualClock::new(START_MILLIS);
        let store = Arc::new(InMemoryRoomStore::new());
        let room = RoomKey::new("room-1".to_string()).unwrap();
        let (mailbox, mailbox_rx) = mpsc::unbounded_channel();
        let services = RoomServices {
            store: store.clone(),
            completion: Arc::new(completion),
            clock: Arc::new(clock.clone()),
            config: RoomConfig::default(),
        };
        Self {
            coordinator: RoomCoordinator::new(room.clone(), services, mailbox),
            clock,
            store,
            room,
            mailbox_rx,
        }
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Write a value before the room is activated
    pub async fn seed(&self, key: &str, value: Value) {
        self.store.put(&self.room, key, value).await.unwrap();
    }

    pub async fn seed_alarm(&self, at: Timestamp) {
        self.store.set_alarm(&self.room, at).await.unwrap();
    }

    /// Stored value after all queued writes have landed
    pub async fn store_value(&self, key: &str) -> Option<Value> {
        self.coordinator.sync_persistence().await;
        self.store.get(&self.room, key).await.unwrap()
    }

    pub async fn stored_alarm(&self) -> Option<Timestamp> {
        self.store.get_alarm(&self.room).await.unwrap()
    }

    pub async fn write_count(&self, key: &str) -> usize {
        self.coordinator.sync_persistence().await;
        self.store.write_count(&self.room, key).await
    }

    pub async fn connect(&mut self) -> TestClient {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ConnectionId::generate();
        self.coordinator
            .handle(RoomEvent::Open {
                connection_id: id,
                channel: tx,
            })
            .await;
        TestClient { id, rx }
    }

    pub async fn close(&mut self, client: &TestClient) {
        self.coordinator
            .handle(RoomEvent::Close {
                connection_id: client.id,
            })
            .await;
    }

    pub async fn send_raw(&mut self, client: &TestClient, text: &str) {
        self.coordinator
            .handle(RoomEvent::Message {
                connection_id: client.id,
                text: text.to_string(),
            })
            .await;
    }

    pub async fn send(&mut self, client: &TestClient, frame: Value) {
        self.send_raw(client, &frame.to_string()).await;
    }

    pub async fn hello(&mut self, client: &TestClient, client_id: &str, user: &str) {
        let frame = json!({"type": "hello", "clientId": client_id, "user": user});
        self.send(client, frame).await;
    }

    pub async fn chat(&mut self, client: &TestClient, user: &str, text: &str) {
        let frame = json!({"type": "chat", "user": user, "text": text});
        self.send(client, frame).await;
    }

    /// Next event posted by a timer or an AI task. Paused tokio time
    /// advances on its own while this waits.
    pub async fn next_event(&mut self) -> RoomEvent {
        self.mailbox_rx.recv().await.unwrap()
    }

    pub fn try_next_event(&mut self) -> Option<RoomEvent> {
        self.mailbox_rx.try_recv().ok()
    }

    /// Handle the next posted event
    pub async fn pump(&mut self) {
        let event = self.next_event().await;
        self.coordinator.handle(event).await;
    }
}
