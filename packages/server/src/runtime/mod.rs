//! Room runtime: one host task per active room and the router in front of them.

mod host;
pub mod registry;

pub use registry::{RegistryError, RoomHandle, RoomRegistry, RoomSummary};
