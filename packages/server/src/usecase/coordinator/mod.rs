//! UseCase: Room Coordinator
//!
//! One `RoomCoordinator` owns all state of one room: open connections, chat
//! history, pinned memory, artifacts, the heartbeat and the AI busy flag.
//! It is driven by exactly one host task that hands it one `RoomEvent` at a
//! time, so nothing in here takes a lock.
//!
//! Timers and AI completions run on spawned tasks and report back through
//! the room's own mailbox.

mod ai;
mod artifact;
mod chat;
mod heartbeat;
mod memory;
mod presence;
mod routing;
#[cfg(test)]
mod test_support;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use edgerooms_shared::time::Clock;
use serde::de::DeserializeOwned;

use crate::{
    config::RoomConfig,
    domain::{
        Artifact, ArtifactStore, ChatEntry, ChatHistory, ClientId, CompletionClient,
        ConnectionRegistry, Outbound, PinnedMemory, RoomKey, RoomStore, Timestamp, keys,
    },
};

use super::{
    event::{CompletionPurpose, RoomEvent, RoomMailbox},
    persistence::Persister,
    timer::ScheduledTimer,
};

use heartbeat::Heartbeat;

/// Collaborators shared by every room
#[derive(Clone)]
pub struct RoomServices {
    /// Persistent store (room-partitioned key/value + wake-up)
    pub store: Arc<dyn RoomStore>,
    /// AI completion collaborator
    pub completion: Arc<dyn CompletionClient>,
    /// Source of server timestamps
    pub clock: Arc<dyn Clock>,
    pub config: RoomConfig,
}

/// Authoritative state of one room
pub struct RoomCoordinator {
    room: RoomKey,
    services: RoomServices,
    /// Sender half of this room's own mailbox (timers, AI replies)
    mailbox: RoomMailbox,
    persister: Persister,
    loaded: bool,
    stopped: bool,
    owner_id: Option<ClientId>,
    connections: ConnectionRegistry,
    /// Live presence count, readable outside the room task
    presence: Arc<AtomicUsize>,
    history: ChatHistory,
    /// Entries appended since the last history flush
    unflushed_entries: usize,
    pinned: PinnedMemory,
    memory_flush: Option<ScheduledTimer>,
    artifacts: ArtifactStore,
    heartbeat: Heartbeat,
    ai_busy: bool,
    next_generation: u64,
}

impl RoomCoordinator {
    /// Create the coordinator for `room`. Stored state is loaded lazily,
    /// before the first event is handled.
    pub fn new(room: RoomKey, services: RoomServices, mailbox: RoomMailbox) -> Self {
        let persister = Persister::spawn(room.clone(), Arc::clone(&services.store));
        let history = ChatHistory::new(services.config.history_capacity);
        Self {
            room,
            services,
            mailbox,
            persister,
            loaded: false,
            stopped: false,
            owner_id: None,
            connections: ConnectionRegistry::new(),
            presence: Arc::new(AtomicUsize::new(0)),
            history,
            unflushed_entries: 0,
            pinned: PinnedMemory::default(),
            memory_flush: None,
            artifacts: ArtifactStore::default(),
            heartbeat: Heartbeat::Idle,
            ai_busy: false,
            next_generation: 0,
        }
    }

    pub fn room(&self) -> &RoomKey {
        &self.room
    }

    /// Shared presence counter, updated on every presence broadcast
    pub fn presence_gauge(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.presence)
    }

    /// No connections and no AI request in flight
    pub fn is_idle(&self) -> bool {
        self.connections.is_empty() && !self.ai_busy
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn owner_id(&self) -> Option<&ClientId> {
        self.owner_id.as_ref()
    }

    /// Wait until every queued store write has been applied
    pub async fn sync_persistence(&self) {
        self.persister.sync().await;
    }

    /// Handle one event to completion
    pub async fn handle(&mut self, event: RoomEvent) {
        if self.stopped {
            tracing::debug!("Room '{}' is stopped; ignoring {:?}", self.room, event);
            return;
        }
        self.ensure_loaded().await;

        match event {
            RoomEvent::Open {
                connection_id,
                channel,
            } => self.on_open(connection_id, channel),
            RoomEvent::Message {
                connection_id,
                text,
            } => self.on_message(connection_id, text).await,
            RoomEvent::Activity { connection_id } => {
                self.connections.touch(&connection_id, self.now());
            }
            RoomEvent::Close { connection_id } => self.on_close(connection_id),
            RoomEvent::Error {
                connection_id,
                reason,
            } => {
                tracing::warn!("Connection '{}' failed: {}", connection_id, reason);
                self.on_close(connection_id);
            }
            RoomEvent::HeartbeatAlarm { generation } => self.on_heartbeat(generation),
            RoomEvent::MemoryFlush { generation } => self.on_memory_flush(generation),
            RoomEvent::CompletionFinished { purpose, result } => {
                self.on_completion_finished(purpose, result)
            }
            RoomEvent::Shutdown => self.shutdown().await,
        }
    }

    /// Persist pending memory and history now and wait until the store has
    /// them. Called before an idle room retires so a reactivation of the
    /// same key reads the latest state.
    pub async fn checkpoint(&mut self) {
        self.flush_pending_memory();
        self.flush_history_if_dirty();
        self.persister.sync().await;
    }

    /// Flush pending state, close every socket and stop the writer.
    /// Later events are ignored.
    pub async fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        self.flush_pending_memory();
        self.flush_history_if_dirty();
        self.disarm_heartbeat();

        for id in self.connections.ids() {
            let _ = self.connections.push_to(&id, Outbound::Close);
            self.connections.remove(&id);
        }
        self.presence.store(0, Ordering::Relaxed);

        self.persister.close().await;
        tracing::info!("Room '{}' stopped", self.room);
    }

    async fn ensure_loaded(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        if let Some(pinned) = self.load::<PinnedMemory>(keys::PINNED).await {
            self.pinned = pinned;
        }
        if let Some(entries) = self.load::<Vec<ChatEntry>>(keys::HISTORY).await {
            self.history =
                ChatHistory::from_entries(entries, self.services.config.history_capacity);
        }
        self.owner_id = self.load::<ClientId>(keys::OWNER_ID).await;
        if let Some(artifacts) = self.load::<Vec<Artifact>>(keys::ARTIFACTS).await {
            self.artifacts = ArtifactStore::from_artifacts(artifacts);
        }

        // No connection survives a reactivation, so a leftover wake-up is stale.
        match self.services.store.get_alarm(&self.room).await {
            Ok(Some(at)) => {
                tracing::info!(
                    "Clearing wake-up at {} left from a previous activation of room '{}'",
                    at.value(),
                    self.room
                );
                self.persister.delete_alarm();
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read alarm for room '{}': {}", self.room, e),
        }

        tracing::info!(
            "Room '{}' activated (history: {}, artifacts: {}, owner: {})",
            self.room,
            self.history.len(),
            self.artifacts.len(),
            self.owner_id.as_ref().map(ClientId::as_str).unwrap_or("-")
        );
    }

    /// Read one stored key; missing or unreadable values yield `None`
    async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.services.store.get(&self.room, key).await {
            Ok(value) => value?,
            Err(e) => {
                tracing::error!("Failed to load '{}' for room '{}': {}", key, self.room, e);
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::error!("Stored '{}' for room '{}' is unreadable: {}", key, self.room, e);
                None
            }
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.services.clock.now_millis())
    }

    fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }
}
