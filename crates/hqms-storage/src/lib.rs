//! # HQMS Storage
//!
//! 排队条目的JSON快照持久化。

pub mod snapshot;

pub use snapshot::SnapshotStore;
