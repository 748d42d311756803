//! # flintkv - An In-Memory, Redis-Protocol Data Store
//!
//! flintkv is an in-memory, network-accessible data store speaking a
//! Redis-compatible wire protocol. It serves typed keyspace operations
//! (strings, lists, hashes, sets, sorted sets), per-key expiration,
//! snapshot persistence and publish/subscribe messaging to many
//! concurrent clients.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                             flintkv                                │
//! │                                                                    │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────┐            │
//! │  │ TCP Server  │───►│ Connection  │───►│ CommandTable │            │
//! │  │ (Listener)  │    │  Handler    │    │  + Executor  │            │
//! │  └─────────────┘    └─────────────┘    └──────┬───────┘            │
//! │                            ▲                  │                    │
//! │  ┌─────────────┐           │           ┌──────▼───────┐            │
//! │  │ Wire Codec  │───────────┘           │   Keyspace   │            │
//! │  │ (frames)    │                       │ RwLock over  │            │
//! │  └─────────────┘                       │ 5 namespaces │            │
//! │                                        │ + expiry map │            │
//! │  ┌─────────────┐    ┌─────────────┐    └──────────────┘            │
//! │  │   PubSub    │    │ Persistence │                                │
//! │  │  (broker)   │    │ (snapshots) │                                │
//! │  └─────────────┘    └─────────────┘                                │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Highlights
//!
//! ### One Exclusivity Domain
//!
//! The keyspace guards all five namespaces and the expiry map with a
//! single reader/writer lock. Reads run concurrently; every mutation is
//! one exclusive critical section, so multi-key batches are never
//! partially visible and a key's expiry purge is atomic across all
//! namespaces.
//!
//! ### Lazy Expiry
//!
//! There is no background sweep. Every accessor resolves expiry for the
//! key it touches: a passed expiry deletes the key from every namespace
//! before the operation proceeds, as if the key never existed.
//!
//! ### One Task Per Connection
//!
//! Each accepted socket gets its own Tokio task owning its buffers and
//! parser exclusively. Connections interact only through the
//! synchronized keyspace, broker and persistence handles; no lock is
//! held across network I/O.
//!
//! ## Supported Commands
//!
//! - Strings: `GET SET DEL EXISTS INCR DECR INCRBY DECRBY MSET MGET`
//! - Lists: `LPUSH RPUSH LPOP RPOP LLEN`
//! - Hashes: `HSET HGET HDEL HLEN HMGET HGETALL`
//! - Sets: `SADD SREM SMEMBERS SISMEMBER`
//! - Sorted sets: `ZADD ZRANGE ZREM`
//! - Administration: `EXPIRE TTL INFO FLUSHALL PING`
//! - Persistence: `SAVE BGSAVE`
//! - Pub/sub: `PUBLISH SUBSCRIBE UNSUBSCRIBE`
//!
//! ## Quick Start
//!
//! ```ignore
//! use flintkv::commands::{CommandTable, Executor};
//! use flintkv::connection::{handle_connection, ConnectionStats};
//! use flintkv::persistence::Persistence;
//! use flintkv::pubsub::PubSub;
//! use flintkv::storage::Keyspace;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let keyspace = Arc::new(Keyspace::new());
//!     let pubsub = Arc::new(PubSub::new());
//!     let persistence = Arc::new(Persistence::new("flintkv.json"));
//!     let executor = Arc::new(Executor::new(keyspace, pubsub, persistence));
//!     let table = Arc::new(CommandTable::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:8000").await.unwrap();
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         tokio::spawn(handle_connection(
//!             stream,
//!             addr,
//!             Arc::clone(&table),
//!             Arc::clone(&executor),
//!             Arc::clone(&stats),
//!         ));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: wire codec (frame types, incremental parser)
//! - [`storage`]: the multi-type keyspace with lazy expiry
//! - [`commands`]: static command table and handlers
//! - [`connection`]: per-connection dispatcher loop
//! - [`pubsub`]: channel registry and publish fan-out
//! - [`persistence`]: whole-keyspace snapshot save/load

pub mod commands;
pub mod connection;
pub mod persistence;
pub mod protocol;
pub mod pubsub;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{CommandTable, Executor};
pub use connection::{handle_connection, ConnectionStats};
pub use persistence::Persistence;
pub use protocol::{Frame, FrameError, FrameParser};
pub use pubsub::PubSub;
pub use storage::Keyspace;

/// The default port flintkv listens on
pub const DEFAULT_PORT: u16 = 8000;

/// The default host flintkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// The default snapshot file path
pub const DEFAULT_SNAPSHOT_PATH: &str = "flintkv.json";

/// Version of flintkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
