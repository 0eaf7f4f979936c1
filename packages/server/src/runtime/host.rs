//! Host loop of one room task.

use tokio::sync::mpsc;

use crate::{
    domain::{Outbound, RoomKey},
    usecase::{RoomCoordinator, RoomEvent},
};

use super::registry::RoomTable;

/// Feed mailbox events to the coordinator until it stops or goes idle.
///
/// An idle room (no connections, no AI request in flight) retires itself:
/// it writes its state out, leaves the table, closes its mailbox, refuses
/// whatever was still queued, then stops. The write completes before the
/// entry is removed, so a fresh instance for the same key loads it.
pub(super) async fn run_room(
    mut coordinator: RoomCoordinator,
    mut rx: mpsc::UnboundedReceiver<RoomEvent>,
    rooms: RoomTable,
    instance: u64,
) {
    let room = coordinator.room().clone();

    while let Some(event) = rx.recv().await {
        coordinator.handle(event).await;
        if coordinator.is_stopped() {
            break;
        }
        if !coordinator.is_idle() {
            continue;
        }
        coordinator.checkpoint().await;
        if retire(&rooms, &room, instance, &mut rx).await {
            while let Ok(event) = rx.try_recv() {
                refuse(&room, event);
            }
            tracing::info!("Room '{}' retired (no connections)", room);
            break;
        }
    }

    coordinator.shutdown().await;
}

/// Remove this instance from the table and close the mailbox, unless more
/// events are already waiting.
async fn retire(
    rooms: &RoomTable,
    room: &RoomKey,
    instance: u64,
    rx: &mut mpsc::UnboundedReceiver<RoomEvent>,
) -> bool {
    let mut rooms = rooms.lock().await;
    if !rx.is_empty() {
        return false;
    }
    if rooms
        .get(room)
        .is_some_and(|entry| entry.handle.instance() == instance)
    {
        rooms.remove(room);
    }
    rx.close();
    true
}

/// Handle an event that raced with retirement. Sockets that were about to
/// join are closed so their clients reconnect to a fresh room.
fn refuse(room: &RoomKey, event: RoomEvent) {
    match event {
        RoomEvent::Open {
            connection_id,
            channel,
        } => {
            tracing::debug!(
                "Closing connection '{}' that raced with retirement of room '{}'",
                connection_id,
                room
            );
            let _ = channel.send(Outbound::Close);
        }
        other => tracing::debug!("Dropping {:?} for retired room '{}'", other, room),
    }
}
