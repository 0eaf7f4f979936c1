//! Ordered, per-room write queue in front of the Room Store.
//!
//! The coordinator never awaits ordinary writes: `persist` serializes the value
//! and enqueues it, and a writer task applies the queue in order. Writes the
//! room must rely on (the owner id) use `persist_and_confirm`, which waits for
//! the store's answer. Failures are logged and never retried.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::domain::{RoomKey, RoomStore, StoreError, Timestamp};

type Ack = oneshot::Sender<Result<(), StoreError>>;

#[derive(Debug)]
enum WriteOp {
    Put {
        key: &'static str,
        value: Value,
        ack: Option<Ack>,
    },
    SetAlarm(Timestamp),
    DeleteAlarm,
    /// Answered once every earlier operation has been applied
    Barrier(oneshot::Sender<()>),
}

/// Handle to a room's writer task
#[derive(Debug)]
pub struct Persister {
    room: RoomKey,
    tx: Option<mpsc::UnboundedSender<WriteOp>>,
    task: Option<JoinHandle<()>>,
}

impl Persister {
    /// Spawn the writer task for `room`
    pub fn spawn(room: RoomKey, store: Arc<dyn RoomStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(write_loop(room.clone(), store, rx));
        Self {
            room,
            tx: Some(tx),
            task: Some(task),
        }
    }

    fn enqueue(&self, op: WriteOp) -> Result<(), StoreError> {
        let tx = self.tx.as_ref().ok_or(StoreError::WriterClosed)?;
        tx.send(op).map_err(|_| StoreError::WriterClosed)
    }

    /// Queue a write of `value` under `key` without waiting for it
    pub fn persist<T: Serialize + ?Sized>(&self, key: &'static str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize '{}' for room '{}': {}", key, self.room, e);
                return;
            }
        };
        if let Err(e) = self.enqueue(WriteOp::Put {
            key,
            value,
            ack: None,
        }) {
            tracing::warn!("Dropped write of '{}' for room '{}': {}", key, self.room, e);
        }
    }

    /// Write `value` under `key` and wait until the store has accepted it
    pub async fn persist_and_confirm<T: Serialize + ?Sized>(
        &self,
        key: &'static str,
        value: &T,
    ) -> Result<(), StoreError> {
        let value =
            serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let (ack, confirmed) = oneshot::channel();
        self.enqueue(WriteOp::Put {
            key,
            value,
            ack: Some(ack),
        })?;
        confirmed.await.map_err(|_| StoreError::WriterClosed)?
    }

    /// Queue a heartbeat wake-up at `at`
    pub fn set_alarm(&self, at: Timestamp) {
        if let Err(e) = self.enqueue(WriteOp::SetAlarm(at)) {
            tracing::warn!("Dropped alarm update for room '{}': {}", self.room, e);
        }
    }

    /// Queue removal of the heartbeat wake-up
    pub fn delete_alarm(&self) {
        if let Err(e) = self.enqueue(WriteOp::DeleteAlarm) {
            tracing::warn!("Dropped alarm removal for room '{}': {}", self.room, e);
        }
    }

    /// Wait until every write queued so far has been applied
    pub async fn sync(&self) {
        let (done, applied) = oneshot::channel();
        if self.enqueue(WriteOp::Barrier(done)).is_ok() {
            let _ = applied.await;
        }
    }

    /// Stop accepting writes and wait for the queue to drain
    pub async fn close(&mut self) {
        self.tx.take();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::error!("Writer task for room '{}' failed: {}", self.room, e);
        }
    }
}

async fn write_loop(
    room: RoomKey,
    store: Arc<dyn RoomStore>,
    mut rx: mpsc::UnboundedReceiver<WriteOp>,
) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Put { key, value, ack } => {
                let result = store.put(&room, key, value).await;
                if let Err(e) = &result {
                    tracing::error!("Failed to persist '{}' for room '{}': {}", key, room, e);
                }
                if let Some(ack) = ack {
                    let _ = ack.send(result);
                }
            }
            WriteOp::SetAlarm(at) => {
                if let Err(e) = store.set_alarm(&room, at).await {
                    tracing::error!("Failed to set alarm for room '{}': {}", room, e);
                }
            }
            WriteOp::DeleteAlarm => {
                if let Err(e) = store.delete_alarm(&room).await {
                    tracing::error!("Failed to delete alarm for room '{}': {}", room, e);
                }
            }
            WriteOp::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Writer for room '{}' drained", room);
}
