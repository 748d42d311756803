//! Command Dispatch
//!
//! This module implements the command layer: a static table mapping
//! command names to tagged operation variants, and the handlers that
//! execute them against the shared state.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │   Wire Codec    │  (protocol module)
//! └────────┬────────┘
//!          │ Vec<String>
//!          ▼
//! ┌─────────────────┐
//! │  CommandTable   │  name lookup + arity contract
//! └────────┬────────┘
//!          │ tagged dispatch variant
//!          ▼
//! ┌─────────────────┐
//! │    Executor     │  validate values, run, build reply
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Keyspace     │  (storage module)
//! └─────────────────┘
//! ```
//!
//! `SUBSCRIBE`/`UNSUBSCRIBE` are tagged for the connection handler, which
//! owns the delivery mailbox they need; everything else executes here.
//!
//! ## Command Surface
//!
//! - Strings: `GET SET DEL EXISTS INCR DECR INCRBY DECRBY MSET MGET`
//! - Lists: `LPUSH RPUSH LPOP RPOP LLEN`
//! - Hashes: `HSET HGET HDEL HLEN HMGET HGETALL`
//! - Sets: `SADD SREM SMEMBERS SISMEMBER`
//! - Sorted sets: `ZADD ZRANGE ZREM`
//! - Administration: `EXPIRE TTL INFO FLUSHALL PING`
//! - Persistence: `SAVE BGSAVE`
//! - Pub/sub: `PUBLISH SUBSCRIBE UNSUBSCRIBE`

pub mod executor;
pub mod table;

// Re-export the main command types
pub use executor::Executor;
pub use table::{Arity, CommandSpec, CommandTable, Dispatch};
