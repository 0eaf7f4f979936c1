//! UseCase layer: the per-room coordinator and its supporting machinery.

pub mod coordinator;
pub mod event;
pub mod persistence;
pub mod timer;

pub use coordinator::{RoomCoordinator, RoomServices};
pub use event::{CompletionPurpose, RoomEvent, RoomMailbox};
pub use persistence::Persister;
