//! Snapshot store adapters.
//!
//! - [`memory`]: process-local store with simulated change notification
//! - [`json_file`]: JSON document on disk

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileSnapshotStore;
pub use memory::InMemorySnapshotStore;
