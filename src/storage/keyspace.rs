//! Concurrently-Shared Multi-Type Keyspace
//!
//! This module implements the store at the heart of flintkv: five
//! independent typed namespaces (strings, lists, hashes, sets, sorted
//! sets) plus an expiry map, all guarded by a single reader/writer lock.
//!
//! ## Design Decisions
//!
//! 1. **One exclusivity domain**: every mutation takes the write lock for
//!    the whole logical operation, so multi-key batches (`MSET`,
//!    `FLUSHALL`) are never partially visible.
//! 2. **Independent namespaces**: the same key name may exist in several
//!    namespaces at once; each command touches exactly one of them.
//! 3. **Lazy expiry**: there is no background sweep. Every accessor first
//!    resolves expiry for the key it touches; a passed expiry deletes the
//!    key from *all* namespaces before the operation proceeds.
//! 4. **Wall-clock expiry instants**: expirations are `SystemTime` so a
//!    serialized snapshot remains meaningful across a restart.
//!
//! ## Concurrency Model
//!
//! Read-only accessors take the shared lock and run concurrently. When a
//! read finds a due expiry it upgrades by re-acquiring the write lock,
//! re-checks, and purges before answering. Mutating accessors go straight
//! to the write lock. No lock is ever held across I/O.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Upper bound for relative expiry (100 years). Durations beyond this are
/// clamped so the instant arithmetic can never overflow `SystemTime`.
const MAX_EXPIRE_SECS: u64 = 60 * 60 * 24 * 365 * 100;

/// Errors from the integer arithmetic commands (`INCR` family).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    /// The stored value does not parse as a base-10 signed 64-bit integer
    #[error("value is not an integer or out of range")]
    NotAnInteger,

    /// Applying the delta would overflow i64
    #[error("increment or decrement would overflow")]
    Overflow,
}

/// Remaining time-to-live for a key, as reported by `TTL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// No expiry entry exists for the key (wire sentinel `-1`)
    NoExpiry,
    /// An expiry entry existed but had passed; the key was purged
    /// (wire sentinel `-2`)
    Expired,
    /// Whole seconds until the key expires
    Remaining(i64),
}

/// Per-namespace entry counts, reported by `INFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceCounts {
    pub strings: usize,
    pub lists: usize,
    pub hashes: usize,
    pub sets: usize,
    pub sorted_sets: usize,
}

/// The keyspace tables: five typed namespaces plus the expiry map.
///
/// This is the unit the persistence layer serializes; a `Snapshot` taken
/// under the exclusive lock is a point-in-time consistent view.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    strings: HashMap<String, String>,
    lists: HashMap<String, VecDeque<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, BTreeSet<String>>,
    sorted_sets: HashMap<String, HashMap<String, f64>>,
    expirations: HashMap<String, SystemTime>,
}

impl Snapshot {
    /// Returns true if an expiry is recorded for `key` and has passed.
    fn expiry_due(&self, key: &str) -> bool {
        self.expirations
            .get(key)
            .is_some_and(|at| SystemTime::now() >= *at)
    }

    /// Deletes `key` from every namespace and drops its expiry entry.
    fn purge(&mut self, key: &str) {
        self.expirations.remove(key);
        self.strings.remove(key);
        self.lists.remove(key);
        self.hashes.remove(key);
        self.sets.remove(key);
        self.sorted_sets.remove(key);
    }

    /// Purges `key` if its expiry has passed. Called before every
    /// per-key access so an expired key behaves as if it never existed.
    fn resolve(&mut self, key: &str) {
        if self.expiry_due(key) {
            self.purge(key);
        }
    }
}

/// The shared, internally-synchronized store.
///
/// Wrap in an `Arc` and share across all connection tasks; every method is
/// safe to call concurrently.
///
/// # Example
///
/// ```
/// use flintkv::storage::Keyspace;
///
/// let keyspace = Keyspace::new();
/// keyspace.set("name", "flint");
/// assert_eq!(keyspace.get("name"), Some("flint".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct Keyspace {
    tables: RwLock<Snapshot>,
}

impl Keyspace {
    /// Creates an empty keyspace.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Snapshot::default()),
        }
    }

    /// Runs a read-only closure after resolving expiry for `key`.
    ///
    /// Fast path: shared lock only. If the key's expiry has passed the
    /// shared lock is dropped, the write lock taken, and the purge applied
    /// before the closure runs.
    fn read_resolved<R>(&self, key: &str, f: impl FnOnce(&Snapshot) -> R) -> R {
        {
            let tables = self.tables.read().unwrap();
            if !tables.expiry_due(key) {
                return f(&tables);
            }
        }
        let mut tables = self.tables.write().unwrap();
        tables.resolve(key);
        f(&tables)
    }

    /// Runs a mutating closure under the write lock, resolving expiry for
    /// `key` first.
    fn write_resolved<R>(&self, key: &str, f: impl FnOnce(&mut Snapshot) -> R) -> R {
        let mut tables = self.tables.write().unwrap();
        tables.resolve(key);
        f(&mut tables)
    }

    // ========================================================================
    // String namespace
    // ========================================================================

    /// Returns the string value for `key`, or `None` if absent/expired.
    pub fn get(&self, key: &str) -> Option<String> {
        self.read_resolved(key, |tables| tables.strings.get(key).cloned())
    }

    /// Unconditionally stores `value` under `key`.
    ///
    /// A live expiry on the key keeps running; a passed one is purged
    /// before the write.
    pub fn set(&self, key: &str, value: &str) {
        self.write_resolved(key, |tables| {
            tables.strings.insert(key.to_string(), value.to_string());
        });
    }

    /// Deletes keys from the string namespace.
    ///
    /// # Returns
    ///
    /// The number of keys actually removed. A removed key's expiry entry
    /// goes with it.
    pub fn del(&self, keys: &[String]) -> u64 {
        let mut tables = self.tables.write().unwrap();
        let mut removed = 0;
        for key in keys {
            tables.resolve(key);
            if tables.strings.remove(key).is_some() {
                tables.expirations.remove(key);
                removed += 1;
            }
        }
        removed
    }

    /// Returns true if `key` exists in the string namespace.
    pub fn exists(&self, key: &str) -> bool {
        self.read_resolved(key, |tables| tables.strings.contains_key(key))
    }

    /// Applies a signed delta to the integer stored at `key`.
    ///
    /// A missing key is treated as `"0"`. The stored text must parse as a
    /// base-10 signed 64-bit integer; nothing is written on failure.
    ///
    /// # Returns
    ///
    /// The new value after the delta.
    pub fn incr_by(&self, key: &str, delta: i64) -> Result<i64, ArithmeticError> {
        self.write_resolved(key, |tables| {
            let current = match tables.strings.get(key) {
                Some(text) => text
                    .parse::<i64>()
                    .map_err(|_| ArithmeticError::NotAnInteger)?,
                None => 0,
            };
            let updated = current.checked_add(delta).ok_or(ArithmeticError::Overflow)?;
            tables.strings.insert(key.to_string(), updated.to_string());
            Ok(updated)
        })
    }

    /// Stores every key/value pair as one atomic batch.
    pub fn mset(&self, pairs: &[(String, String)]) {
        let mut tables = self.tables.write().unwrap();
        for (key, value) in pairs {
            tables.resolve(key);
            tables.strings.insert(key.clone(), value.clone());
        }
    }

    /// Looks up several keys, preserving input order.
    ///
    /// Missing keys yield `None` in the corresponding slot.
    pub fn mget(&self, keys: &[String]) -> Vec<Option<String>> {
        {
            let tables = self.tables.read().unwrap();
            if !keys.iter().any(|key| tables.expiry_due(key)) {
                return keys.iter().map(|key| tables.strings.get(key).cloned()).collect();
            }
        }
        // At least one key has a due expiry: purge under the write lock.
        let mut tables = self.tables.write().unwrap();
        for key in keys {
            tables.resolve(key);
        }
        keys.iter().map(|key| tables.strings.get(key).cloned()).collect()
    }

    // ========================================================================
    // List namespace
    // ========================================================================

    /// Inserts values at the head of the list, in argument order.
    ///
    /// `LPUSH k a b c` leaves the list as `c, b, a` (the last argument is
    /// pushed last and ends up closest to the head).
    ///
    /// # Returns
    ///
    /// The list length after the push.
    pub fn lpush(&self, key: &str, values: &[String]) -> usize {
        self.write_resolved(key, |tables| {
            let list = tables.lists.entry(key.to_string()).or_default();
            for value in values {
                list.push_front(value.clone());
            }
            list.len()
        })
    }

    /// Appends values at the tail of the list, in argument order.
    ///
    /// # Returns
    ///
    /// The list length after the push.
    pub fn rpush(&self, key: &str, values: &[String]) -> usize {
        self.write_resolved(key, |tables| {
            let list = tables.lists.entry(key.to_string()).or_default();
            for value in values {
                list.push_back(value.clone());
            }
            list.len()
        })
    }

    /// Removes and returns the head element, or `None` if the list is
    /// absent. Popping the last element deletes the list entry.
    pub fn lpop(&self, key: &str) -> Option<String> {
        self.write_resolved(key, |tables| {
            let list = tables.lists.get_mut(key)?;
            let value = list.pop_front();
            let now_empty = list.is_empty();
            if now_empty {
                tables.lists.remove(key);
            }
            value
        })
    }

    /// Removes and returns the tail element, or `None` if the list is
    /// absent. Popping the last element deletes the list entry.
    pub fn rpop(&self, key: &str) -> Option<String> {
        self.write_resolved(key, |tables| {
            let list = tables.lists.get_mut(key)?;
            let value = list.pop_back();
            let now_empty = list.is_empty();
            if now_empty {
                tables.lists.remove(key);
            }
            value
        })
    }

    /// Returns the list length, or 0 if the key is absent.
    pub fn llen(&self, key: &str) -> usize {
        self.read_resolved(key, |tables| {
            tables.lists.get(key).map(VecDeque::len).unwrap_or(0)
        })
    }

    // ========================================================================
    // Hash namespace
    // ========================================================================

    /// Upserts field/value pairs into the hash at `key`.
    ///
    /// # Returns
    ///
    /// The hash's total field count after the operation.
    pub fn hset(&self, key: &str, pairs: &[(String, String)]) -> usize {
        self.write_resolved(key, |tables| {
            let hash = tables.hashes.entry(key.to_string()).or_default();
            for (field, value) in pairs {
                hash.insert(field.clone(), value.clone());
            }
            hash.len()
        })
    }

    /// Returns the value of `field` in the hash at `key`.
    pub fn hget(&self, key: &str, field: &str) -> Option<String> {
        self.read_resolved(key, |tables| {
            tables.hashes.get(key).and_then(|hash| hash.get(field).cloned())
        })
    }

    /// Removes fields from the hash at `key`.
    ///
    /// # Returns
    ///
    /// The number of fields actually removed. Removing the last field
    /// deletes the hash entry.
    pub fn hdel(&self, key: &str, fields: &[String]) -> u64 {
        self.write_resolved(key, |tables| {
            let Some(hash) = tables.hashes.get_mut(key) else {
                return 0;
            };
            let mut removed = 0;
            for field in fields {
                if hash.remove(field).is_some() {
                    removed += 1;
                }
            }
            let now_empty = hash.is_empty();
            if now_empty {
                tables.hashes.remove(key);
            }
            removed
        })
    }

    /// Returns the hash's field count, or 0 if the key is absent.
    pub fn hlen(&self, key: &str) -> usize {
        self.read_resolved(key, |tables| {
            tables.hashes.get(key).map(HashMap::len).unwrap_or(0)
        })
    }

    /// Looks up several hash fields, preserving input order.
    ///
    /// An absent hash yields `None` for every field.
    pub fn hmget(&self, key: &str, fields: &[String]) -> Vec<Option<String>> {
        self.read_resolved(key, |tables| {
            let hash = tables.hashes.get(key);
            fields
                .iter()
                .map(|field| hash.and_then(|h| h.get(field).cloned()))
                .collect()
        })
    }

    /// Returns every field/value pair of the hash at `key`, or `None` if
    /// the key is absent. Pair order is unspecified.
    pub fn hgetall(&self, key: &str) -> Option<Vec<(String, String)>> {
        self.read_resolved(key, |tables| {
            tables.hashes.get(key).map(|hash| {
                hash.iter()
                    .map(|(field, value)| (field.clone(), value.clone()))
                    .collect()
            })
        })
    }

    // ========================================================================
    // Set namespace
    // ========================================================================

    /// Adds members to the set at `key`.
    ///
    /// # Returns
    ///
    /// The number of members newly inserted (duplicates not counted).
    pub fn sadd(&self, key: &str, members: &[String]) -> u64 {
        self.write_resolved(key, |tables| {
            let set = tables.sets.entry(key.to_string()).or_default();
            let mut added = 0;
            for member in members {
                if set.insert(member.clone()) {
                    added += 1;
                }
            }
            added
        })
    }

    /// Removes members from the set at `key`.
    ///
    /// # Returns
    ///
    /// The number of members actually removed. Removing the last member
    /// deletes the set entry.
    pub fn srem(&self, key: &str, members: &[String]) -> u64 {
        self.write_resolved(key, |tables| {
            let Some(set) = tables.sets.get_mut(key) else {
                return 0;
            };
            let mut removed = 0;
            for member in members {
                if set.remove(member) {
                    removed += 1;
                }
            }
            let now_empty = set.is_empty();
            if now_empty {
                tables.sets.remove(key);
            }
            removed
        })
    }

    /// Returns all members of the set at `key` in ascending lexical order.
    pub fn smembers(&self, key: &str) -> Vec<String> {
        self.read_resolved(key, |tables| {
            tables
                .sets
                .get(key)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default()
        })
    }

    /// Returns true if `member` is in the set at `key`.
    pub fn sismember(&self, key: &str, member: &str) -> bool {
        self.read_resolved(key, |tables| {
            tables.sets.get(key).is_some_and(|set| set.contains(member))
        })
    }

    // ========================================================================
    // Sorted-set namespace
    // ========================================================================

    /// Adds score/member pairs to the sorted set at `key`.
    ///
    /// Re-adding an existing member is a no-op: its score is left
    /// untouched and it does not count toward the result (first write
    /// wins, preserved reference behavior).
    ///
    /// # Returns
    ///
    /// The number of members newly inserted.
    pub fn zadd(&self, key: &str, entries: &[(f64, String)]) -> u64 {
        self.write_resolved(key, |tables| {
            let zset = tables.sorted_sets.entry(key.to_string()).or_default();
            let mut added = 0;
            for (score, member) in entries {
                if !zset.contains_key(member) {
                    zset.insert(member.clone(), *score);
                    added += 1;
                }
            }
            added
        })
    }

    /// Returns members in `[start, end]` ordered by ascending score, ties
    /// broken by lexical member order.
    ///
    /// Negative indices wrap from the end; bounds are clamped. An empty or
    /// inverted range yields an empty vec.
    pub fn zrange(&self, key: &str, start: i64, end: i64) -> Vec<String> {
        self.read_resolved(key, |tables| {
            let Some(zset) = tables.sorted_sets.get(key) else {
                return Vec::new();
            };

            let mut members: Vec<(&String, f64)> =
                zset.iter().map(|(member, score)| (member, *score)).collect();
            members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

            let len = members.len() as i64;
            let mut start = if start < 0 { len + start } else { start };
            let mut end = if end < 0 { len + end } else { end };
            if start < 0 {
                start = 0;
            }
            if end >= len {
                end = len - 1;
            }
            if start > end || start >= len {
                return Vec::new();
            }

            members[start as usize..=end as usize]
                .iter()
                .map(|(member, _)| (*member).clone())
                .collect()
        })
    }

    /// Removes members from the sorted set at `key`.
    ///
    /// # Returns
    ///
    /// The number of members actually removed. Removing the last member
    /// deletes the sorted-set entry.
    pub fn zrem(&self, key: &str, members: &[String]) -> u64 {
        self.write_resolved(key, |tables| {
            let Some(zset) = tables.sorted_sets.get_mut(key) else {
                return 0;
            };
            let mut removed = 0;
            for member in members {
                if zset.remove(member).is_some() {
                    removed += 1;
                }
            }
            let now_empty = zset.is_empty();
            if now_empty {
                tables.sorted_sets.remove(key);
            }
            removed
        })
    }

    // ========================================================================
    // Expiry and administration
    // ========================================================================

    /// Records an expiry `seconds` from now for `key`.
    ///
    /// Only keys present in the string namespace are expirable. A
    /// non-positive delay expires the key on its next access.
    ///
    /// # Returns
    ///
    /// True if the expiry was recorded, false if the key is not a string.
    pub fn expire(&self, key: &str, seconds: i64) -> bool {
        self.write_resolved(key, |tables| {
            if !tables.strings.contains_key(key) {
                return false;
            }
            let now = SystemTime::now();
            let at = if seconds >= 0 {
                now + Duration::from_secs((seconds as u64).min(MAX_EXPIRE_SECS))
            } else {
                now.checked_sub(Duration::from_secs(seconds.unsigned_abs().min(MAX_EXPIRE_SECS)))
                    .unwrap_or(SystemTime::UNIX_EPOCH)
            };
            tables.expirations.insert(key.to_string(), at);
            true
        })
    }

    /// Reports the remaining time-to-live for `key`.
    ///
    /// Observing a passed expiry purges the key from every namespace as a
    /// side effect and reports [`Ttl::Expired`].
    pub fn ttl(&self, key: &str) -> Ttl {
        {
            let tables = self.tables.read().unwrap();
            match tables.expirations.get(key) {
                None => return Ttl::NoExpiry,
                Some(at) => {
                    let now = SystemTime::now();
                    if now < *at {
                        let remaining = at.duration_since(now).unwrap_or(Duration::ZERO);
                        return Ttl::Remaining(remaining.as_secs() as i64);
                    }
                }
            }
        }
        // The recorded expiry has passed: re-check and purge under the
        // write lock (another task may have purged or re-armed it).
        let mut tables = self.tables.write().unwrap();
        match tables.expirations.get(key) {
            None => Ttl::NoExpiry,
            Some(at) => {
                let now = SystemTime::now();
                if now < *at {
                    let remaining = at.duration_since(now).unwrap_or(Duration::ZERO);
                    Ttl::Remaining(remaining.as_secs() as i64)
                } else {
                    tables.purge(key);
                    Ttl::Expired
                }
            }
        }
    }

    /// Clears all five namespaces and the expiry map in one exclusive
    /// critical section.
    pub fn flush_all(&self) {
        let mut tables = self.tables.write().unwrap();
        tables.strings.clear();
        tables.lists.clear();
        tables.hashes.clear();
        tables.sets.clear();
        tables.sorted_sets.clear();
        tables.expirations.clear();
    }

    /// Returns per-namespace entry counts.
    pub fn counts(&self) -> NamespaceCounts {
        let tables = self.tables.read().unwrap();
        NamespaceCounts {
            strings: tables.strings.len(),
            lists: tables.lists.len(),
            hashes: tables.hashes.len(),
            sets: tables.sets.len(),
            sorted_sets: tables.sorted_sets.len(),
        }
    }

    /// Runs a closure over a point-in-time consistent view of the tables.
    ///
    /// Takes the exclusive lock — the same lock class as a mutating
    /// command — so the persistence layer serializes a snapshot no
    /// concurrent write can tear.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        let tables = self.tables.write().unwrap();
        f(&tables)
    }

    /// Replaces the keyspace contents wholesale (snapshot restore).
    pub fn restore(&self, snapshot: Snapshot) {
        let mut tables = self.tables.write().unwrap();
        *tables = snapshot;
    }
}
