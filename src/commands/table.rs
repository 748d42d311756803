//! Static Command Table
//!
//! Maps command names (case-insensitive, normalized to uppercase) to
//! tagged operation variants. Every entry carries its arity contract,
//! which is checked before any handler touches the keyspace, so a
//! malformed request can never cause a partial mutation.
//!
//! The table itself is a fixed constant; the name index over it is built
//! once at startup. Unknown command names and arity violations produce
//! error replies and are never fatal to the connection.

use crate::commands::executor::Executor;
use crate::protocol::Frame;
use std::collections::HashMap;

/// A handler executed against the shared state.
pub type HandlerFn = fn(&Executor, &[String]) -> Frame;

/// Argument-count contract for one command (excluding the command name).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments
    Exact(usize),
    /// At least this many arguments
    AtLeast(usize),
    /// A key followed by one or more pairs: odd count, at least 3
    KeyWithPairs,
    /// One or more pairs: even count, at least 2
    Pairs,
}

impl Arity {
    /// Returns true if `n` arguments satisfy the contract.
    pub fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::Exact(count) => n == *count,
            Arity::AtLeast(count) => n >= *count,
            Arity::KeyWithPairs => n >= 3 && n % 2 == 1,
            Arity::Pairs => n >= 2 && n % 2 == 0,
        }
    }
}

/// How a command is routed once validated.
#[derive(Debug, Clone, Copy)]
pub enum Dispatch {
    /// Run against the shared state; the reply goes back to the caller
    Store(HandlerFn),
    /// Register the connection's mailbox with channels; handled by the
    /// connection itself
    Subscribe,
    /// Deregister the connection from channels; handled by the connection
    Unsubscribe,
}

/// One command entry: name, arity contract, dispatch variant.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub arity: Arity,
    pub dispatch: Dispatch,
}

/// The fixed command set. Order is insignificant; names are uppercase.
const SPECS: &[CommandSpec] = &[
    // Strings
    CommandSpec { name: "GET", arity: Arity::Exact(1), dispatch: Dispatch::Store(Executor::cmd_get) },
    CommandSpec { name: "SET", arity: Arity::Exact(2), dispatch: Dispatch::Store(Executor::cmd_set) },
    CommandSpec { name: "DEL", arity: Arity::AtLeast(1), dispatch: Dispatch::Store(Executor::cmd_del) },
    CommandSpec { name: "EXISTS", arity: Arity::Exact(1), dispatch: Dispatch::Store(Executor::cmd_exists) },
    CommandSpec { name: "INCR", arity: Arity::Exact(1), dispatch: Dispatch::Store(Executor::cmd_incr) },
    CommandSpec { name: "DECR", arity: Arity::Exact(1), dispatch: Dispatch::Store(Executor::cmd_decr) },
    CommandSpec { name: "INCRBY", arity: Arity::Exact(2), dispatch: Dispatch::Store(Executor::cmd_incrby) },
    CommandSpec { name: "DECRBY", arity: Arity::Exact(2), dispatch: Dispatch::Store(Executor::cmd_decrby) },
    CommandSpec { name: "MSET", arity: Arity::Pairs, dispatch: Dispatch::Store(Executor::cmd_mset) },
    CommandSpec { name: "MGET", arity: Arity::AtLeast(1), dispatch: Dispatch::Store(Executor::cmd_mget) },
    // Lists
    CommandSpec { name: "LPUSH", arity: Arity::AtLeast(2), dispatch: Dispatch::Store(Executor::cmd_lpush) },
    CommandSpec { name: "RPUSH", arity: Arity::AtLeast(2), dispatch: Dispatch::Store(Executor::cmd_rpush) },
    CommandSpec { name: "LPOP", arity: Arity::Exact(1), dispatch: Dispatch::Store(Executor::cmd_lpop) },
    CommandSpec { name: "RPOP", arity: Arity::Exact(1), dispatch: Dispatch::Store(Executor::cmd_rpop) },
    CommandSpec { name: "LLEN", arity: Arity::Exact(1), dispatch: Dispatch::Store(Executor::cmd_llen) },
    // Hashes
    CommandSpec { name: "HSET", arity: Arity::KeyWithPairs, dispatch: Dispatch::Store(Executor::cmd_hset) },
    CommandSpec { name: "HGET", arity: Arity::Exact(2), dispatch: Dispatch::Store(Executor::cmd_hget) },
    CommandSpec { name: "HDEL", arity: Arity::AtLeast(2), dispatch: Dispatch::Store(Executor::cmd_hdel) },
    CommandSpec { name: "HLEN", arity: Arity::Exact(1), dispatch: Dispatch::Store(Executor::cmd_hlen) },
    CommandSpec { name: "HMGET", arity: Arity::AtLeast(2), dispatch: Dispatch::Store(Executor::cmd_hmget) },
    CommandSpec { name: "HGETALL", arity: Arity::Exact(1), dispatch: Dispatch::Store(Executor::cmd_hgetall) },
    // Sets
    CommandSpec { name: "SADD", arity: Arity::AtLeast(2), dispatch: Dispatch::Store(Executor::cmd_sadd) },
    CommandSpec { name: "SREM", arity: Arity::AtLeast(2), dispatch: Dispatch::Store(Executor::cmd_srem) },
    CommandSpec { name: "SMEMBERS", arity: Arity::Exact(1), dispatch: Dispatch::Store(Executor::cmd_smembers) },
    CommandSpec { name: "SISMEMBER", arity: Arity::Exact(2), dispatch: Dispatch::Store(Executor::cmd_sismember) },
    // Sorted sets
    CommandSpec { name: "ZADD", arity: Arity::KeyWithPairs, dispatch: Dispatch::Store(Executor::cmd_zadd) },
    CommandSpec { name: "ZRANGE", arity: Arity::Exact(3), dispatch: Dispatch::Store(Executor::cmd_zrange) },
    CommandSpec { name: "ZREM", arity: Arity::AtLeast(2), dispatch: Dispatch::Store(Executor::cmd_zrem) },
    // Administration
    CommandSpec { name: "EXPIRE", arity: Arity::Exact(2), dispatch: Dispatch::Store(Executor::cmd_expire) },
    CommandSpec { name: "TTL", arity: Arity::Exact(1), dispatch: Dispatch::Store(Executor::cmd_ttl) },
    CommandSpec { name: "INFO", arity: Arity::Exact(0), dispatch: Dispatch::Store(Executor::cmd_info) },
    CommandSpec { name: "FLUSHALL", arity: Arity::Exact(0), dispatch: Dispatch::Store(Executor::cmd_flushall) },
    CommandSpec { name: "PING", arity: Arity::Exact(0), dispatch: Dispatch::Store(Executor::cmd_ping) },
    // Persistence
    CommandSpec { name: "SAVE", arity: Arity::Exact(0), dispatch: Dispatch::Store(Executor::cmd_save) },
    CommandSpec { name: "BGSAVE", arity: Arity::Exact(0), dispatch: Dispatch::Store(Executor::cmd_bgsave) },
    // Pub/sub
    CommandSpec { name: "PUBLISH", arity: Arity::Exact(2), dispatch: Dispatch::Store(Executor::cmd_publish) },
    CommandSpec { name: "SUBSCRIBE", arity: Arity::AtLeast(1), dispatch: Dispatch::Subscribe },
    CommandSpec { name: "UNSUBSCRIBE", arity: Arity::AtLeast(1), dispatch: Dispatch::Unsubscribe },
];

/// The startup-resolved command index.
pub struct CommandTable {
    entries: HashMap<&'static str, &'static CommandSpec>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTable {
    /// Builds the name index over the fixed command set.
    pub fn new() -> Self {
        let mut entries = HashMap::with_capacity(SPECS.len());
        for spec in SPECS {
            entries.insert(spec.name, spec);
        }
        Self { entries }
    }

    /// Looks up an already-normalized (uppercase) command name.
    pub fn lookup(&self, name: &str) -> Option<&'static CommandSpec> {
        self.entries.get(name).copied()
    }

    /// Validates one decoded request and resolves its command entry.
    ///
    /// `parts` is the full argument list, command name first. Returns the
    /// error reply to send when the request names no command, names an
    /// unknown command (echoed verbatim), or violates the arity contract.
    pub fn prepare(&self, parts: &[String]) -> Result<&'static CommandSpec, Frame> {
        let Some(raw_name) = parts.first() else {
            return Err(Frame::error("ERR empty command"));
        };
        let name = raw_name.to_uppercase();
        let Some(spec) = self.lookup(&name) else {
            return Err(Frame::error(format!("ERR unknown command '{}'", raw_name)));
        };
        if !spec.arity.accepts(parts.len() - 1) {
            return Err(Frame::error(format!(
                "ERR wrong number of arguments for '{}' command",
                spec.name
            )));
        }
        Ok(spec)
    }

    /// Validates and executes one request end-to-end.
    ///
    /// Connection-scoped commands (`SUBSCRIBE`/`UNSUBSCRIBE`) need the
    /// caller's delivery mailbox and are routed by the connection handler
    /// instead; reaching them here draws an error reply.
    pub fn execute(&self, executor: &Executor, parts: &[String]) -> Frame {
        match self.prepare(parts) {
            Err(reply) => reply,
            Ok(spec) => match spec.dispatch {
                Dispatch::Store(run) => run(executor, &parts[1..]),
                Dispatch::Subscribe | Dispatch::Unsubscribe => Frame::error(format!(
                    "ERR '{}' requires a client connection",
                    spec.name
                )),
            },
        }
    }
}
