//! Command Handlers
//!
//! Implements every store-dispatched command over the shared state. Each
//! handler receives its argument list with the command name already
//! stripped and the arity contract already checked; it validates value
//! types, performs the operation through the keyspace accessors, and
//! builds the typed reply.
//!
//! Validation always happens before any mutation (validate-then-apply):
//! a type error reply guarantees the keyspace was not touched.

use crate::persistence::Persistence;
use crate::protocol::Frame;
use crate::pubsub::PubSub;
use crate::storage::{Keyspace, Ttl};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Shared state handed to every command handler.
pub struct Executor {
    keyspace: Arc<Keyspace>,
    pubsub: Arc<PubSub>,
    persistence: Arc<Persistence>,
    start_time: Instant,
}

impl Executor {
    /// Creates an executor over the shared server state.
    pub fn new(keyspace: Arc<Keyspace>, pubsub: Arc<PubSub>, persistence: Arc<Persistence>) -> Self {
        Self {
            keyspace,
            pubsub,
            persistence,
            start_time: Instant::now(),
        }
    }

    /// The shared keyspace.
    pub fn keyspace(&self) -> &Arc<Keyspace> {
        &self.keyspace
    }

    /// The shared pub/sub broker.
    pub fn pubsub(&self) -> &Arc<PubSub> {
        &self.pubsub
    }

    // ========================================================================
    // String commands
    // ========================================================================

    /// GET key
    pub(crate) fn cmd_get(&self, args: &[String]) -> Frame {
        match self.keyspace.get(&args[0]) {
            Some(value) => Frame::bulk(Bytes::from(value)),
            None => Frame::null(),
        }
    }

    /// SET key value
    pub(crate) fn cmd_set(&self, args: &[String]) -> Frame {
        self.keyspace.set(&args[0], &args[1]);
        Frame::ok()
    }

    /// DEL key [key ...]
    pub(crate) fn cmd_del(&self, args: &[String]) -> Frame {
        Frame::integer(self.keyspace.del(args) as i64)
    }

    /// EXISTS key
    pub(crate) fn cmd_exists(&self, args: &[String]) -> Frame {
        Frame::integer(self.keyspace.exists(&args[0]) as i64)
    }

    /// INCR key
    pub(crate) fn cmd_incr(&self, args: &[String]) -> Frame {
        self.apply_delta(&args[0], 1)
    }

    /// DECR key
    pub(crate) fn cmd_decr(&self, args: &[String]) -> Frame {
        self.apply_delta(&args[0], -1)
    }

    /// INCRBY key increment
    pub(crate) fn cmd_incrby(&self, args: &[String]) -> Frame {
        match args[1].parse::<i64>() {
            Ok(delta) => self.apply_delta(&args[0], delta),
            Err(_) => Frame::error("ERR value is not an integer or out of range"),
        }
    }

    /// DECRBY key decrement
    pub(crate) fn cmd_decrby(&self, args: &[String]) -> Frame {
        let Ok(delta) = args[1].parse::<i64>() else {
            return Frame::error("ERR value is not an integer or out of range");
        };
        match delta.checked_neg() {
            Some(delta) => self.apply_delta(&args[0], delta),
            None => Frame::error("ERR increment or decrement would overflow"),
        }
    }

    fn apply_delta(&self, key: &str, delta: i64) -> Frame {
        match self.keyspace.incr_by(key, delta) {
            Ok(value) => Frame::integer(value),
            Err(e) => Frame::error(format!("ERR {}", e)),
        }
    }

    /// MSET key value [key value ...]
    pub(crate) fn cmd_mset(&self, args: &[String]) -> Frame {
        let pairs: Vec<(String, String)> = args
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        self.keyspace.mset(&pairs);
        Frame::ok()
    }

    /// MGET key [key ...]
    pub(crate) fn cmd_mget(&self, args: &[String]) -> Frame {
        let values = self.keyspace.mget(args);
        Frame::array(values.into_iter().map(optional_bulk).collect())
    }

    // ========================================================================
    // List commands
    // ========================================================================

    /// LPUSH key value [value ...]
    pub(crate) fn cmd_lpush(&self, args: &[String]) -> Frame {
        Frame::integer(self.keyspace.lpush(&args[0], &args[1..]) as i64)
    }

    /// RPUSH key value [value ...]
    pub(crate) fn cmd_rpush(&self, args: &[String]) -> Frame {
        Frame::integer(self.keyspace.rpush(&args[0], &args[1..]) as i64)
    }

    /// LPOP key
    pub(crate) fn cmd_lpop(&self, args: &[String]) -> Frame {
        optional_bulk(self.keyspace.lpop(&args[0]))
    }

    /// RPOP key
    pub(crate) fn cmd_rpop(&self, args: &[String]) -> Frame {
        optional_bulk(self.keyspace.rpop(&args[0]))
    }

    /// LLEN key
    pub(crate) fn cmd_llen(&self, args: &[String]) -> Frame {
        Frame::integer(self.keyspace.llen(&args[0]) as i64)
    }

    // ========================================================================
    // Hash commands
    // ========================================================================

    /// HSET key field value [field value ...]
    pub(crate) fn cmd_hset(&self, args: &[String]) -> Frame {
        let pairs: Vec<(String, String)> = args[1..]
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        Frame::integer(self.keyspace.hset(&args[0], &pairs) as i64)
    }

    /// HGET key field
    pub(crate) fn cmd_hget(&self, args: &[String]) -> Frame {
        optional_bulk(self.keyspace.hget(&args[0], &args[1]))
    }

    /// HDEL key field [field ...]
    pub(crate) fn cmd_hdel(&self, args: &[String]) -> Frame {
        Frame::integer(self.keyspace.hdel(&args[0], &args[1..]) as i64)
    }

    /// HLEN key
    pub(crate) fn cmd_hlen(&self, args: &[String]) -> Frame {
        Frame::integer(self.keyspace.hlen(&args[0]) as i64)
    }

    /// HMGET key field [field ...]
    pub(crate) fn cmd_hmget(&self, args: &[String]) -> Frame {
        let values = self.keyspace.hmget(&args[0], &args[1..]);
        Frame::array(values.into_iter().map(optional_bulk).collect())
    }

    /// HGETALL key
    pub(crate) fn cmd_hgetall(&self, args: &[String]) -> Frame {
        match self.keyspace.hgetall(&args[0]) {
            None => Frame::array(vec![]),
            Some(pairs) => {
                let mut flattened = Vec::with_capacity(pairs.len() * 2);
                for (field, value) in pairs {
                    flattened.push(Frame::bulk(Bytes::from(field)));
                    flattened.push(Frame::bulk(Bytes::from(value)));
                }
                Frame::array(flattened)
            }
        }
    }

    // ========================================================================
    // Set commands
    // ========================================================================

    /// SADD key member [member ...]
    pub(crate) fn cmd_sadd(&self, args: &[String]) -> Frame {
        Frame::integer(self.keyspace.sadd(&args[0], &args[1..]) as i64)
    }

    /// SREM key member [member ...]
    pub(crate) fn cmd_srem(&self, args: &[String]) -> Frame {
        Frame::integer(self.keyspace.srem(&args[0], &args[1..]) as i64)
    }

    /// SMEMBERS key
    pub(crate) fn cmd_smembers(&self, args: &[String]) -> Frame {
        let members = self.keyspace.smembers(&args[0]);
        Frame::array(
            members
                .into_iter()
                .map(|member| Frame::bulk(Bytes::from(member)))
                .collect(),
        )
    }

    /// SISMEMBER key member
    pub(crate) fn cmd_sismember(&self, args: &[String]) -> Frame {
        Frame::integer(self.keyspace.sismember(&args[0], &args[1]) as i64)
    }

    // ========================================================================
    // Sorted-set commands
    // ========================================================================

    /// ZADD key score member [score member ...]
    pub(crate) fn cmd_zadd(&self, args: &[String]) -> Frame {
        // Parse every score before touching the keyspace
        let mut entries = Vec::with_capacity(args[1..].len() / 2);
        for pair in args[1..].chunks_exact(2) {
            let score = match pair[0].parse::<f64>() {
                Ok(score) if !score.is_nan() => score,
                _ => return Frame::error("ERR score is not a valid number"),
            };
            entries.push((score, pair[1].clone()));
        }
        Frame::integer(self.keyspace.zadd(&args[0], &entries) as i64)
    }

    /// ZRANGE key start end
    pub(crate) fn cmd_zrange(&self, args: &[String]) -> Frame {
        let (Ok(start), Ok(end)) = (args[1].parse::<i64>(), args[2].parse::<i64>()) else {
            return Frame::error("ERR start or end is not a valid integer");
        };
        let members = self.keyspace.zrange(&args[0], start, end);
        Frame::array(
            members
                .into_iter()
                .map(|member| Frame::bulk(Bytes::from(member)))
                .collect(),
        )
    }

    /// ZREM key member [member ...]
    pub(crate) fn cmd_zrem(&self, args: &[String]) -> Frame {
        Frame::integer(self.keyspace.zrem(&args[0], &args[1..]) as i64)
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// EXPIRE key seconds
    pub(crate) fn cmd_expire(&self, args: &[String]) -> Frame {
        let Ok(seconds) = args[1].parse::<i64>() else {
            return Frame::error("ERR seconds must be a valid integer");
        };
        if self.keyspace.expire(&args[0], seconds) {
            Frame::ok()
        } else {
            Frame::null()
        }
    }

    /// TTL key
    pub(crate) fn cmd_ttl(&self, args: &[String]) -> Frame {
        match self.keyspace.ttl(&args[0]) {
            Ttl::NoExpiry => Frame::integer(-1),
            Ttl::Expired => Frame::integer(-2),
            Ttl::Remaining(seconds) => Frame::integer(seconds),
        }
    }

    /// INFO
    pub(crate) fn cmd_info(&self, _args: &[String]) -> Frame {
        let counts = self.keyspace.counts();
        let uptime = self.start_time.elapsed().as_secs();

        let info = format!(
            "# Server\r\n\
             flintkv_version:{}\r\n\
             uptime_in_seconds:{}\r\n\
             \r\n\
             # Keyspace\r\n\
             strings:{}\r\n\
             lists:{}\r\n\
             hashes:{}\r\n\
             sets:{}\r\n\
             sorted_sets:{}\r\n\
             \r\n\
             # PubSub\r\n\
             channels:{}\r\n",
            env!("CARGO_PKG_VERSION"),
            uptime,
            counts.strings,
            counts.lists,
            counts.hashes,
            counts.sets,
            counts.sorted_sets,
            self.pubsub.channel_count(),
        );

        Frame::bulk(Bytes::from(info))
    }

    /// FLUSHALL
    pub(crate) fn cmd_flushall(&self, _args: &[String]) -> Frame {
        self.keyspace.flush_all();
        Frame::ok()
    }

    /// PING
    pub(crate) fn cmd_ping(&self, _args: &[String]) -> Frame {
        Frame::pong()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// SAVE
    ///
    /// Snapshot failures are an operator concern: they are logged and the
    /// client still sees `+OK`.
    pub(crate) fn cmd_save(&self, _args: &[String]) -> Frame {
        if let Err(e) = self.persistence.save(&self.keyspace) {
            error!(error = %e, "snapshot save failed");
        }
        Frame::ok()
    }

    /// BGSAVE
    pub(crate) fn cmd_bgsave(&self, _args: &[String]) -> Frame {
        Persistence::background_save(&self.persistence, &self.keyspace);
        Frame::simple("Background saving started")
    }

    // ========================================================================
    // Pub/sub
    // ========================================================================

    /// PUBLISH channel message
    pub(crate) fn cmd_publish(&self, args: &[String]) -> Frame {
        Frame::integer(self.pubsub.publish(&args[0], &args[1]) as i64)
    }
}

/// Maps an optional stored value to a bulk or null reply.
fn optional_bulk(value: Option<String>) -> Frame {
    match value {
        Some(value) => Frame::bulk(Bytes::from(value)),
        None => Frame::null(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandTable;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn temp_snapshot_path() -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("flintkv_exec_{}_{}.json", std::process::id(), n))
    }

    fn executor() -> Executor {
        Executor::new(
            Arc::new(Keyspace::new()),
            Arc::new(PubSub::new()),
            Arc::new(Persistence::new(temp_snapshot_path())),
        )
    }

    fn run(table: &CommandTable, executor: &Executor, words: &[&str]) -> Frame {
        let parts: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        table.execute(executor, &parts)
    }

    #[test]
    fn ping_pongs() {
        let (table, exec) = (CommandTable::new(), executor());
        assert_eq!(run(&table, &exec, &["PING"]), Frame::pong());
    }

    #[test]
    fn set_then_get() {
        let (table, exec) = (CommandTable::new(), executor());

        assert_eq!(run(&table, &exec, &["SET", "key", "value"]), Frame::ok());
        assert_eq!(
            run(&table, &exec, &["GET", "key"]),
            Frame::bulk(Bytes::from("value"))
        );
        assert_eq!(run(&table, &exec, &["GET", "missing"]), Frame::null());
    }

    #[test]
    fn del_reports_removed_count() {
        let (table, exec) = (CommandTable::new(), executor());

        run(&table, &exec, &["SET", "k1", "v1"]);
        run(&table, &exec, &["SET", "k2", "v2"]);
        assert_eq!(
            run(&table, &exec, &["DEL", "k1", "k2", "k3"]),
            Frame::integer(2)
        );
        assert_eq!(run(&table, &exec, &["EXISTS", "k1"]), Frame::integer(0));
    }

    #[test]
    fn arithmetic_round_trip() {
        let (table, exec) = (CommandTable::new(), executor());

        run(&table, &exec, &["SET", "k", "40"]);
        assert_eq!(run(&table, &exec, &["INCRBY", "k", "2"]), Frame::integer(42));
        assert_eq!(
            run(&table, &exec, &["GET", "k"]),
            Frame::bulk(Bytes::from("42"))
        );
        assert_eq!(run(&table, &exec, &["DECR", "k"]), Frame::integer(41));
        assert_eq!(run(&table, &exec, &["DECRBY", "k", "41"]), Frame::integer(0));
        assert_eq!(run(&table, &exec, &["INCR", "fresh"]), Frame::integer(1));
    }

    #[test]
    fn arithmetic_type_errors() {
        let (table, exec) = (CommandTable::new(), executor());

        run(&table, &exec, &["SET", "text", "hello"]);
        assert_eq!(
            run(&table, &exec, &["INCR", "text"]),
            Frame::error("ERR value is not an integer or out of range")
        );
        assert_eq!(
            run(&table, &exec, &["INCRBY", "k", "notanumber"]),
            Frame::error("ERR value is not an integer or out of range")
        );
        // The failed INCR left the stored text untouched
        assert_eq!(
            run(&table, &exec, &["GET", "text"]),
            Frame::bulk(Bytes::from("hello"))
        );
    }

    #[test]
    fn mset_mget_preserve_key_order() {
        let (table, exec) = (CommandTable::new(), executor());

        assert_eq!(
            run(&table, &exec, &["MSET", "k1", "v1", "k2", "v2"]),
            Frame::ok()
        );
        assert_eq!(
            run(&table, &exec, &["MGET", "k2", "nope", "k1"]),
            Frame::array(vec![
                Frame::bulk(Bytes::from("v2")),
                Frame::null(),
                Frame::bulk(Bytes::from("v1")),
            ])
        );
    }

    #[test]
    fn list_commands() {
        let (table, exec) = (CommandTable::new(), executor());

        assert_eq!(
            run(&table, &exec, &["RPUSH", "l", "a", "b", "c"]),
            Frame::integer(3)
        );
        assert_eq!(
            run(&table, &exec, &["LPOP", "l"]),
            Frame::bulk(Bytes::from("a"))
        );
        assert_eq!(
            run(&table, &exec, &["RPOP", "l"]),
            Frame::bulk(Bytes::from("c"))
        );
        assert_eq!(run(&table, &exec, &["LLEN", "l"]), Frame::integer(1));
        assert_eq!(run(&table, &exec, &["LPOP", "missing"]), Frame::null());
    }

    #[test]
    fn hash_commands() {
        let (table, exec) = (CommandTable::new(), executor());

        assert_eq!(
            run(&table, &exec, &["HSET", "h", "f1", "v1", "f2", "v2"]),
            Frame::integer(2)
        );
        assert_eq!(
            run(&table, &exec, &["HGET", "h", "f1"]),
            Frame::bulk(Bytes::from("v1"))
        );
        assert_eq!(run(&table, &exec, &["HGET", "h", "nope"]), Frame::null());
        assert_eq!(run(&table, &exec, &["HLEN", "h"]), Frame::integer(2));
        assert_eq!(
            run(&table, &exec, &["HMGET", "h", "f2", "nope"]),
            Frame::array(vec![Frame::bulk(Bytes::from("v2")), Frame::null()])
        );
        assert_eq!(
            run(&table, &exec, &["HDEL", "h", "f1", "nope"]),
            Frame::integer(1)
        );
        // Absent hash yields the empty marker
        assert_eq!(
            run(&table, &exec, &["HGETALL", "missing"]),
            Frame::array(vec![])
        );
    }

    #[test]
    fn hgetall_flattens_pairs() {
        let (table, exec) = (CommandTable::new(), executor());

        run(&table, &exec, &["HSET", "h", "f", "v"]);
        assert_eq!(
            run(&table, &exec, &["HGETALL", "h"]),
            Frame::array(vec![
                Frame::bulk(Bytes::from("f")),
                Frame::bulk(Bytes::from("v")),
            ])
        );
    }

    #[test]
    fn set_commands() {
        let (table, exec) = (CommandTable::new(), executor());

        assert_eq!(
            run(&table, &exec, &["SADD", "s", "b", "a", "b"]),
            Frame::integer(2)
        );
        assert_eq!(
            run(&table, &exec, &["SMEMBERS", "s"]),
            Frame::array(vec![
                Frame::bulk(Bytes::from("a")),
                Frame::bulk(Bytes::from("b")),
            ])
        );
        assert_eq!(
            run(&table, &exec, &["SISMEMBER", "s", "a"]),
            Frame::integer(1)
        );
        assert_eq!(run(&table, &exec, &["SREM", "s", "a"]), Frame::integer(1));
        assert_eq!(
            run(&table, &exec, &["SISMEMBER", "s", "a"]),
            Frame::integer(0)
        );
        assert_eq!(
            run(&table, &exec, &["SMEMBERS", "missing"]),
            Frame::array(vec![])
        );
    }

    #[test]
    fn zadd_rejects_bad_scores_without_mutating() {
        let (table, exec) = (CommandTable::new(), executor());

        assert_eq!(
            run(&table, &exec, &["ZADD", "z", "high", "m"]),
            Frame::error("ERR score is not a valid number")
        );
        assert_eq!(
            run(&table, &exec, &["ZADD", "z", "nan", "m"]),
            Frame::error("ERR score is not a valid number")
        );
        // The second pair was valid, but the first failed: nothing applied
        assert_eq!(
            run(&table, &exec, &["ZADD", "z", "oops", "a", "2", "b"]),
            Frame::error("ERR score is not a valid number")
        );
        assert_eq!(run(&table, &exec, &["ZRANGE", "z", "0", "-1"]), Frame::array(vec![]));
    }

    #[test]
    fn zrange_orders_and_clamps() {
        let (table, exec) = (CommandTable::new(), executor());

        run(
            &table,
            &exec,
            &["ZADD", "z", "1", "m1", "2", "m2", "3", "m3"],
        );
        assert_eq!(
            run(&table, &exec, &["ZRANGE", "z", "0", "-1"]),
            Frame::array(vec![
                Frame::bulk(Bytes::from("m1")),
                Frame::bulk(Bytes::from("m2")),
                Frame::bulk(Bytes::from("m3")),
            ])
        );
        assert_eq!(
            run(&table, &exec, &["ZRANGE", "z", "-2", "-1"]),
            Frame::array(vec![
                Frame::bulk(Bytes::from("m2")),
                Frame::bulk(Bytes::from("m3")),
            ])
        );
        assert_eq!(
            run(&table, &exec, &["ZRANGE", "z", "5", "10"]),
            Frame::array(vec![])
        );
        assert_eq!(
            run(&table, &exec, &["ZRANGE", "z", "0", "end"]),
            Frame::error("ERR start or end is not a valid integer")
        );
    }

    #[test]
    fn zrem_counts_removed_members() {
        let (table, exec) = (CommandTable::new(), executor());

        run(&table, &exec, &["ZADD", "z", "1", "a", "2", "b"]);
        assert_eq!(
            run(&table, &exec, &["ZREM", "z", "a", "missing"]),
            Frame::integer(1)
        );
    }

    #[test]
    fn expire_and_ttl_sentinels() {
        let (table, exec) = (CommandTable::new(), executor());

        // EXPIRE on a non-string key is a miss
        assert_eq!(run(&table, &exec, &["EXPIRE", "nope", "10"]), Frame::null());

        run(&table, &exec, &["SET", "k", "v"]);
        assert_eq!(run(&table, &exec, &["TTL", "k"]), Frame::integer(-1));
        assert_eq!(run(&table, &exec, &["EXPIRE", "k", "100"]), Frame::ok());
        match run(&table, &exec, &["TTL", "k"]) {
            Frame::Integer(secs) => assert!(secs > 0 && secs <= 100),
            other => panic!("expected integer ttl, got {:?}", other),
        }
        assert_eq!(
            run(&table, &exec, &["EXPIRE", "k", "bad"]),
            Frame::error("ERR seconds must be a valid integer")
        );

        // A passed expiry: TTL observes it, purges, and reports -2
        run(&table, &exec, &["SET", "gone", "v"]);
        run(&table, &exec, &["EXPIRE", "gone", "-1"]);
        assert_eq!(run(&table, &exec, &["TTL", "gone"]), Frame::integer(-2));
        assert_eq!(run(&table, &exec, &["EXISTS", "gone"]), Frame::integer(0));
    }

    #[test]
    fn info_reports_namespace_counts() {
        let (table, exec) = (CommandTable::new(), executor());

        run(&table, &exec, &["SET", "k", "v"]);
        run(&table, &exec, &["RPUSH", "l", "a"]);

        let reply = run(&table, &exec, &["INFO"]);
        let text = reply.as_str().expect("INFO must be a bulk string");
        assert!(text.contains("strings:1"));
        assert!(text.contains("lists:1"));
        assert!(text.contains("hashes:0"));
    }

    #[test]
    fn flushall_clears_every_namespace() {
        let (table, exec) = (CommandTable::new(), executor());

        run(&table, &exec, &["SET", "k", "v"]);
        run(&table, &exec, &["RPUSH", "l", "a"]);
        run(&table, &exec, &["SADD", "s", "m"]);

        assert_eq!(run(&table, &exec, &["FLUSHALL"]), Frame::ok());
        assert_eq!(run(&table, &exec, &["EXISTS", "k"]), Frame::integer(0));
        assert_eq!(run(&table, &exec, &["LLEN", "l"]), Frame::integer(0));
        assert_eq!(run(&table, &exec, &["SMEMBERS", "s"]), Frame::array(vec![]));
    }

    #[test]
    fn unknown_command_leaves_state_unchanged() {
        let (table, exec) = (CommandTable::new(), executor());

        run(&table, &exec, &["SET", "k", "v"]);
        let reply = run(&table, &exec, &["BOGUS", "k", "x"]);
        assert_eq!(reply, Frame::error("ERR unknown command 'BOGUS'"));
        assert_eq!(
            run(&table, &exec, &["GET", "k"]),
            Frame::bulk(Bytes::from("v"))
        );
    }

    #[test]
    fn publish_with_no_subscribers_reaches_nobody() {
        let (table, exec) = (CommandTable::new(), executor());
        assert_eq!(
            run(&table, &exec, &["PUBLISH", "ch", "hello"]),
            Frame::integer(0)
        );
    }

    #[test]
    fn save_replies_ok_and_writes_the_snapshot() {
        let (table, exec) = (CommandTable::new(), executor());

        run(&table, &exec, &["SET", "k", "v"]);
        assert_eq!(run(&table, &exec, &["SAVE"]), Frame::ok());

        let restored = Keyspace::new();
        Persistence::new(exec.persistence.path())
            .load(&restored)
            .expect("snapshot must load back");
        assert_eq!(restored.get("k"), Some("v".to_string()));

        let _ = std::fs::remove_file(exec.persistence.path());
        let _ = std::fs::remove_file(exec.persistence.backup_path());
    }

    #[tokio::test]
    async fn bgsave_replies_immediately() {
        let (table, exec) = (CommandTable::new(), executor());

        assert_eq!(
            run(&table, &exec, &["BGSAVE"]),
            Frame::simple("Background saving started")
        );

        // Wait for the detached task before cleaning up
        for _ in 0..50 {
            if exec.persistence.path().exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let _ = std::fs::remove_file(exec.persistence.path());
    }
}
