//! Persistent store implementations
//!
//! - `inmemory`: HashMap-backed store (tests, ephemeral deployments)
//! - `file`: JSON files under a data directory, one directory per room

pub mod file;
pub mod inmemory;

pub use file::FileRoomStore;
pub use inmemory::InMemoryRoomStore;
