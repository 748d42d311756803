//! Keyspace Storage
//!
//! This module provides the shared store for flintkv: five typed
//! namespaces (strings, lists, hashes, sets, sorted sets) plus an expiry
//! map, behind a single reader/writer lock.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Keyspace                              │
//! │                     RwLock<Snapshot>                         │
//! │  ┌─────────┐ ┌───────┐ ┌────────┐ ┌──────┐ ┌─────────────┐  │
//! │  │ strings │ │ lists │ │ hashes │ │ sets │ │ sorted_sets │  │
//! │  └─────────┘ └───────┘ └────────┘ └──────┘ └─────────────┘  │
//! │                     ┌─────────────┐                          │
//! │                     │ expirations │                          │
//! │                     └─────────────┘                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Single exclusivity domain**: one lock guards every namespace, so a
//!   multi-key batch is one atomic critical section
//! - **RwLock**: multiple concurrent readers, exclusive writers
//! - **Lazy expiry**: a key's expiry is resolved on every access; a passed
//!   expiry purges the key from all namespaces before the operation runs
//! - **Snapshot access**: the persistence layer serializes a consistent
//!   view taken under the exclusive lock
//!
//! ## Example
//!
//! ```
//! use flintkv::storage::{Keyspace, Ttl};
//!
//! let keyspace = Keyspace::new();
//!
//! keyspace.set("name", "flint");
//! assert_eq!(keyspace.get("name"), Some("flint".to_string()));
//!
//! keyspace.rpush("queue", &["job-1".to_string()]);
//! assert_eq!(keyspace.llen("queue"), 1);
//!
//! assert!(keyspace.expire("name", 60));
//! assert!(matches!(keyspace.ttl("name"), Ttl::Remaining(_)));
//! ```

pub mod keyspace;

// Re-export commonly used types
pub use keyspace::{ArithmeticError, Keyspace, NamespaceCounts, Snapshot, Ttl};
