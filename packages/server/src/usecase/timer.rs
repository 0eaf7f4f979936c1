//! One-shot timers that post an event to a room mailbox.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::event::{RoomEvent, RoomMailbox};

/// A pending timer. Dropping it cancels the timer.
#[derive(Debug)]
pub struct ScheduledTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl ScheduledTimer {
    /// Post `event` to `mailbox` after `delay`
    pub fn spawn(delay: Duration, mailbox: RoomMailbox, event: RoomEvent, generation: u64) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The room may already be gone
            let _ = mailbox.send(event);
        });
        Self { generation, handle }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for ScheduledTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
