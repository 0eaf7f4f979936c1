//! Pinned memory mutations with debounced persistence.
//!
//! The first change arms a flush timer; changes made before it fires ride
//! along without rescheduling it.

use crate::{
    domain::{MemoryKind, MemoryText, keys},
    infrastructure::dto::websocket::ServerMessage,
};

use super::{RoomCoordinator, RoomEvent, ScheduledTimer};

impl RoomCoordinator {
    pub(super) fn on_memory_add(&mut self, kind: MemoryKind, text: MemoryText) {
        self.pinned.add(kind, text);
        self.after_memory_change();
    }

    pub(super) fn on_memory_remove(&mut self, kind: MemoryKind, index: usize) {
        match self.pinned.remove(kind, index) {
            Ok(()) => self.after_memory_change(),
            Err(e) => tracing::debug!("Dropping memory.remove in room '{}': {}", self.room, e),
        }
    }

    pub(super) fn on_memory_toggle(&mut self, index: usize) {
        match self.pinned.toggle(index) {
            Ok(_) => self.after_memory_change(),
            Err(e) => tracing::debug!("Dropping memory.toggle in room '{}': {}", self.room, e),
        }
    }

    fn after_memory_change(&mut self) {
        self.broadcast(&self.memory_update_message());
        self.schedule_memory_flush();
    }

    fn schedule_memory_flush(&mut self) {
        if self.memory_flush.is_some() {
            return;
        }
        let generation = self.next_generation();
        self.memory_flush = Some(ScheduledTimer::spawn(
            self.services.config.memory_debounce,
            self.mailbox.clone(),
            RoomEvent::MemoryFlush { generation },
            generation,
        ));
    }

    pub(super) fn on_memory_flush(&mut self, generation: u64) {
        match &self.memory_flush {
            Some(timer) if timer.generation() == generation => {}
            _ => {
                tracing::debug!("Ignoring superseded memory flush {}", generation);
                return;
            }
        }
        self.memory_flush = None;
        self.persister.persist(keys::PINNED, &self.pinned);
    }

    /// Persist now if a flush is pending
    pub(super) fn flush_pending_memory(&mut self) {
        if self.memory_flush.take().is_some() {
            self.persister.persist(keys::PINNED, &self.pinned);
        }
    }

    pub(super) fn cancel_memory_flush(&mut self) {
        self.memory_flush = None;
    }

    pub(super) fn memory_update_message(&self) -> ServerMessage {
        ServerMessage::MemoryUpdate {
            pinned: (&self.pinned).into(),
        }
    }
}
