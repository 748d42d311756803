//! Snapshot Persistence
//!
//! Best-effort whole-keyspace snapshotting: `SAVE` serializes a
//! point-in-time view of every namespace to a JSON file (rotating the
//! previous file to a backup first), `BGSAVE` does the same on a detached
//! task, and startup loads the snapshot back if one exists.
//!
//! This is not a write-ahead log: writes between snapshots are lost on a
//! crash. I/O failures are reported to the operator through the logs and
//! never surfaced to client connections.

pub mod snapshot;

// Re-export commonly used types
pub use snapshot::{Persistence, PersistenceError};
