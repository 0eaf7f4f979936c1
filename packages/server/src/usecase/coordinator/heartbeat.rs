//! Heartbeat scheduler and stale-connection eviction.
//!
//! While at least one connection is open, a wake-up is armed every
//! `heartbeat_interval`. Each firing evicts sockets silent for longer than
//! `stale_after` and drops entries whose transport already closed. The
//! wake-up time is mirrored to the store.

use crate::domain::{Outbound, Timestamp};

use super::{RoomCoordinator, RoomEvent, ScheduledTimer};

pub(super) enum Heartbeat {
    Idle,
    Armed { at: Timestamp, timer: ScheduledTimer },
}

impl RoomCoordinator {
    /// Arm the heartbeat if it is idle and a connection is open
    pub(super) fn ensure_heartbeat(&mut self) {
        if matches!(self.heartbeat, Heartbeat::Idle) && self.connections.open_count() > 0 {
            self.arm_heartbeat();
        }
    }

    fn arm_heartbeat(&mut self) {
        let interval = self.services.config.heartbeat_interval;
        let at = self.now().plus_millis(interval.as_millis() as i64);
        let generation = self.next_generation();
        let timer = ScheduledTimer::spawn(
            interval,
            self.mailbox.clone(),
            RoomEvent::HeartbeatAlarm { generation },
            generation,
        );
        self.persister.set_alarm(at);
        self.heartbeat = Heartbeat::Armed { at, timer };
    }

    /// Cancel the heartbeat and remove the stored wake-up
    pub(super) fn disarm_heartbeat(&mut self) {
        if let Heartbeat::Armed { .. } = std::mem::replace(&mut self.heartbeat, Heartbeat::Idle) {
            self.persister.delete_alarm();
        }
    }

    pub(super) fn on_heartbeat(&mut self, generation: u64) {
        match &self.heartbeat {
            Heartbeat::Armed { timer, .. } if timer.generation() == generation => {}
            _ => {
                tracing::debug!(
                    "Ignoring superseded heartbeat {} in room '{}'",
                    generation,
                    self.room
                );
                return;
            }
        }
        self.heartbeat = Heartbeat::Idle;

        let now = self.now();
        let stale_millis = self.services.config.stale_after.as_millis() as i64;
        let stale = self.connections.stale_ids(now, stale_millis);
        let closed = self.connections.closed_ids();

        for id in &stale {
            tracing::info!("Evicting stale connection '{}' from room '{}'", id, self.room);
            let _ = self.connections.push_to(id, Outbound::Close);
            self.connections.remove(id);
        }
        for id in &closed {
            tracing::debug!("Dropping closed connection '{}' from room '{}'", id, self.room);
            self.connections.remove(id);
        }
        if !stale.is_empty() || !closed.is_empty() {
            self.broadcast_presence();
        }

        if self.connections.open_count() > 0 {
            self.arm_heartbeat();
        } else {
            self.persister.delete_alarm();
        }
    }

    /// Time of the next heartbeat, if armed
    pub fn heartbeat_deadline(&self) -> Option<Timestamp> {
        match &self.heartbeat {
            Heartbeat::Idle => None,
            Heartbeat::Armed { at, .. } => Some(*at),
        }
    }
}
