//! Thread-Safe Storage Engine with Expiry Support
//!
//! This module implements the keyspace of EmberKV: a sharded map from
//! byte-string keys to typed entries (strings and lists), with optional
//! per-key expiry.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, keys are spread over 64 shards.
//! 2. **One operation, one critical section**: every public method does all of
//!    its work under the lock of the shard(s) it touches, so a command built on
//!    a single engine call is atomic.
//! 3. **Lazy Expiry**: every access first evicts the key if its deadline passed.
//! 4. **Expiration index**: each shard keeps its volatile keys ordered by
//!    deadline, so the background sweeper removes expired keys in bounded
//!    batches without scanning the whole shard.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ entries │ │ entries │ │ entries │ │ entries │           │
//! │  │ expiry  │ │ expiry  │ │ expiry  │ │ expiry  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Multi-key operations (`mset`, `mget`, `delete_many`, `exists_many`) lock
//! every shard they need in ascending shard order, which keeps them atomic
//! and deadlock-free.

use crate::storage::entry::{Entry, Value};
use crate::storage::glob::glob_match;
use bytes::{Bytes, BytesMut};
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Number of shards for the storage engine.
/// More shards = less lock contention, but more memory overhead.
/// 64 is a good balance for most workloads.
const NUM_SHARDS: usize = 64;

/// Errors raised by keyspace operations.
///
/// The display strings are the exact error replies sent to clients.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The operation does not apply to the type stored at the key
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// The stored string is not a base-10 64-bit integer
    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    /// The arithmetic result does not fit in an i64
    #[error("ERR increment or decrement would overflow")]
    Overflow,
}

/// Result type for keyspace operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Which end of a list to push to or pop from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEnd {
    Front,
    Back,
}

/// When a SET is allowed to write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SetCondition {
    #[default]
    Always,
    /// NX
    IfAbsent,
    /// XX
    IfPresent,
}

/// What happens to the key's expiry on SET.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SetExpiry {
    /// Drop any existing TTL
    #[default]
    Persist,
    /// KEEPTTL
    Keep,
    /// EX / PX
    At(Instant),
}

/// Options for [`StorageEngine::set`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    pub expiry: SetExpiry,
    pub condition: SetCondition,
    /// Return the previous string value (SET ... GET)
    pub return_previous: bool,
}

/// What a SET did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    pub written: bool,
    /// Previous value, only filled in when `return_previous` was requested
    pub previous: Option<Bytes>,
}

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist
    Missing,
    /// The key exists and never expires
    Persistent,
    /// The key expires after this long
    Expires(Duration),
}

/// A single shard containing a portion of the keyspace.
#[derive(Debug, Default)]
struct Shard {
    entries: HashMap<Bytes, Entry>,
    /// `(deadline, key)` for every entry that has a deadline
    expirations: BTreeSet<(Instant, Bytes)>,
}

impl Shard {
    /// Removes `key` if it has expired. Returns true if it was evicted.
    fn evict_if_expired(&mut self, key: &Bytes, now: Instant) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now));
        if expired {
            self.remove(key);
        }
        expired
    }

    /// Inserts or replaces an entry, keeping the expiration index in sync.
    fn insert(&mut self, key: Bytes, entry: Entry) -> Option<Entry> {
        let deadline = entry.expires_at;
        if let Some(deadline) = deadline {
            self.expirations.insert((deadline, key.clone()));
        }

        let previous = self.entries.insert(key.clone(), entry);
        if let Some(old) = previous.as_ref().and_then(|e| e.expires_at) {
            if Some(old) != deadline {
                self.expirations.remove(&(old, key));
            }
        }
        previous
    }

    fn remove(&mut self, key: &Bytes) -> Option<Entry> {
        let (key, entry) = self.entries.remove_entry(key)?;
        if let Some(deadline) = entry.expires_at {
            self.expirations.remove(&(deadline, key));
        }
        Some(entry)
    }

    /// Changes the deadline of an existing entry. Returns false if absent.
    fn set_deadline(&mut self, key: &Bytes, deadline: Option<Instant>) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };

        let old = std::mem::replace(&mut entry.expires_at, deadline);
        if old != deadline {
            if let Some(old) = old {
                self.expirations.remove(&(old, key.clone()));
            }
            if let Some(new) = deadline {
                self.expirations.insert((new, key.clone()));
            }
        }
        true
    }

    /// Pops up to `limit` expired keys from the front of the expiration index.
    fn purge_expired(&mut self, now: Instant, limit: usize) -> usize {
        let mut removed = 0;
        while removed < limit {
            match self.expirations.first() {
                Some((deadline, _)) if *deadline <= now => {}
                _ => break,
            }
            if let Some((_, key)) = self.expirations.pop_first() {
                self.entries.remove(&key);
                removed += 1;
            }
        }
        removed
    }

    fn string_value(&self, key: &Bytes) -> StoreResult<Option<Bytes>> {
        match self.entries.get(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::String(data)) => Ok(Some(data.clone())),
            Some(_) => Err(StoreError::WrongType),
        }
    }

    fn list_mut(&mut self, key: &Bytes) -> StoreResult<Option<&mut VecDeque<Bytes>>> {
        match self.entries.get_mut(key).map(|e| &mut e.value) {
            None => Ok(None),
            Some(Value::List(list)) => Ok(Some(list)),
            Some(_) => Err(StoreError::WrongType),
        }
    }
}

fn list_ref(entry: Option<&Entry>) -> StoreResult<Option<&VecDeque<Bytes>>> {
    match entry.map(|e| &e.value) {
        None => Ok(None),
        Some(Value::List(list)) => Ok(Some(list)),
        Some(_) => Err(StoreError::WrongType),
    }
}

/// Resolves a possibly negative list index against `len`.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let actual = if index < 0 { len + index } else { index };
    (0..len).contains(&actual).then_some(actual as usize)
}

/// Operation counters, updated with relaxed atomics.
#[derive(Debug, Default)]
struct Counters {
    keyspace_hits: AtomicU64,
    keyspace_misses: AtomicU64,
    expired_lazy: AtomicU64,
    expired_active: AtomicU64,
}

/// The keyspace shared by every connection.
///
/// Wrap it in an `Arc` and hand a clone to each connection and to the
/// expiry sweeper. All methods take `&self`.
///
/// # Example
///
/// ```
/// use emberkv::storage::{SetOptions, StorageEngine};
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
/// engine.set(Bytes::from("name"), Bytes::from("Ariz"), SetOptions::default()).unwrap();
/// assert_eq!(engine.get(&Bytes::from("name")).unwrap(), Some(Bytes::from("Ariz")));
/// ```
pub struct StorageEngine {
    shards: Box<[RwLock<Shard>]>,
    counters: Counters,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("keys", &self.len())
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| RwLock::new(Shard::default())).collect();

        Self {
            shards,
            counters: Counters::default(),
        }
    }

    /// Determines which shard a key belongs to.
    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    #[inline]
    fn shard(&self, key: &[u8]) -> &RwLock<Shard> {
        &self.shards[self.shard_index(key)]
    }

    fn record_lazy_expiry(&self, evicted: bool) {
        if evicted {
            self.counters.expired_lazy.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_lookup(&self, hit: bool) {
        let counter = if hit {
            &self.counters.keyspace_hits
        } else {
            &self.counters.keyspace_misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Runs `f` on the live entry for `key` (None if absent or expired).
    ///
    /// Takes a read lock on the fast path; upgrades to a write lock only to
    /// evict an expired entry.
    fn read<R>(&self, key: &Bytes, f: impl FnOnce(Option<&Entry>) -> R) -> R {
        let lock = self.shard(key);
        let now = Instant::now();

        {
            let shard = lock.read();
            match shard.entries.get(key) {
                Some(entry) if entry.is_expired_at(now) => {}
                entry => return f(entry),
            }
        }

        let mut shard = lock.write();
        self.record_lazy_expiry(shard.evict_if_expired(key, now));
        f(shard.entries.get(key))
    }

    /// Runs `f` with exclusive access to the shard owning `key`, after
    /// evicting `key` if it has expired.
    fn write<R>(&self, key: &Bytes, f: impl FnOnce(&mut Shard) -> R) -> R {
        let mut shard = self.shard(key).write();
        self.record_lazy_expiry(shard.evict_if_expired(key, Instant::now()));
        f(&mut shard)
    }

    /// Write-locks every shard touched by `keys`, in ascending shard order.
    fn lock_shards<'a>(
        &self,
        keys: impl Iterator<Item = &'a Bytes>,
    ) -> BTreeMap<usize, RwLockWriteGuard<'_, Shard>> {
        let indices: BTreeSet<usize> = keys.map(|key| self.shard_index(key)).collect();
        indices
            .into_iter()
            .map(|index| (index, self.shards[index].write()))
            .collect()
    }

    /// Evicts `key` if expired, inside an already locked shard set.
    fn locked_shard<'g>(
        &self,
        guards: &'g mut BTreeMap<usize, RwLockWriteGuard<'_, Shard>>,
        key: &Bytes,
        now: Instant,
    ) -> Option<&'g mut Shard> {
        let shard = guards.get_mut(&self.shard_index(key))?;
        self.record_lazy_expiry(shard.evict_if_expired(key, now));
        Some(&mut **shard)
    }

    // ========================================================================
    // Generic key operations
    // ========================================================================

    /// Checks if a key exists (and is not expired).
    pub fn exists(&self, key: &Bytes) -> bool {
        self.read(key, |entry| entry.is_some())
    }

    /// Counts how many of the given keys exist. Repeated keys count repeatedly.
    pub fn exists_many(&self, keys: &[Bytes]) -> usize {
        let now = Instant::now();
        let mut guards = self.lock_shards(keys.iter());
        keys.iter()
            .filter(|key| {
                self.locked_shard(&mut guards, key, now)
                    .is_some_and(|shard| shard.entries.contains_key(*key))
            })
            .count()
    }

    /// Deletes a key. Returns true if it existed.
    pub fn delete(&self, key: &Bytes) -> bool {
        self.write(key, |shard| shard.remove(key).is_some())
    }

    /// Deletes several keys atomically. Returns how many existed.
    pub fn delete_many(&self, keys: &[Bytes]) -> usize {
        let now = Instant::now();
        let mut guards = self.lock_shards(keys.iter());
        keys.iter()
            .filter(|key| {
                self.locked_shard(&mut guards, key, now)
                    .is_some_and(|shard| shard.remove(key).is_some())
            })
            .count()
    }

    /// Returns the type name of the value stored at `key`.
    pub fn key_type(&self, key: &Bytes) -> Option<&'static str> {
        self.read(key, |entry| entry.map(|e| e.value.type_name()))
    }

    /// Sets the absolute expiry time of an existing key.
    ///
    /// A deadline that is already in the past deletes the key. Returns false
    /// if the key does not exist.
    pub fn expire(&self, key: &Bytes, deadline: Instant) -> bool {
        self.write(key, |shard| {
            if !shard.entries.contains_key(key) {
                return false;
            }
            if deadline <= Instant::now() {
                shard.remove(key);
                return true;
            }
            shard.set_deadline(key, Some(deadline))
        })
    }

    /// Removes the expiry from a key.
    ///
    /// Returns false if the key doesn't exist or had no expiry.
    pub fn persist(&self, key: &Bytes) -> bool {
        self.write(key, |shard| {
            let volatile = shard
                .entries
                .get(key)
                .is_some_and(|e| e.expires_at.is_some());
            volatile && shard.set_deadline(key, None)
        })
    }

    /// Returns the remaining lifetime of a key.
    pub fn ttl(&self, key: &Bytes) -> KeyTtl {
        let now = Instant::now();
        self.read(key, |entry| match entry {
            None => KeyTtl::Missing,
            Some(entry) => match entry.remaining(now) {
                None => KeyTtl::Persistent,
                Some(left) => KeyTtl::Expires(left),
            },
        })
    }

    /// Returns all live keys matching a glob pattern.
    ///
    /// **Warning**: This operation scans all keys and can be slow on large databases.
    pub fn keys(&self, pattern: &[u8]) -> Vec<Bytes> {
        let now = Instant::now();
        let mut result = Vec::new();

        for shard in self.shards.iter() {
            let shard = shard.read();
            result.extend(
                shard
                    .entries
                    .iter()
                    .filter(|(key, entry)| !entry.is_expired_at(now) && glob_match(pattern, key))
                    .map(|(key, _)| key.clone()),
            );
        }

        result
    }

    /// Removes every key. Returns how many were removed.
    pub fn flush(&self) -> usize {
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut shard = shard.write();
            removed += shard.entries.len();
            shard.entries.clear();
            shard.expirations.clear();
        }
        removed
    }

    // ========================================================================
    // String operations
    // ========================================================================

    /// Gets the string value for a key.
    pub fn get(&self, key: &Bytes) -> StoreResult<Option<Bytes>> {
        let result = self.read(key, |entry| match entry.map(|e| &e.value) {
            None => Ok(None),
            Some(Value::String(data)) => Ok(Some(data.clone())),
            Some(_) => Err(StoreError::WrongType),
        });
        self.record_lookup(matches!(result, Ok(Some(_))));
        result
    }

    /// Sets a string value, overwriting a value of any type.
    ///
    /// The existence check for NX/XX, the optional read of the previous value
    /// and the write happen under one lock.
    pub fn set(&self, key: Bytes, value: Bytes, options: SetOptions) -> StoreResult<SetOutcome> {
        self.write(&key, |shard| {
            let previous = if options.return_previous {
                shard.string_value(&key)?
            } else {
                None
            };

            let existing = shard.entries.get(&key);
            let allowed = match options.condition {
                SetCondition::Always => true,
                SetCondition::IfAbsent => existing.is_none(),
                SetCondition::IfPresent => existing.is_some(),
            };
            if !allowed {
                return Ok(SetOutcome {
                    written: false,
                    previous,
                });
            }

            let expires_at = match options.expiry {
                SetExpiry::Persist => None,
                SetExpiry::Keep => existing.and_then(|e| e.expires_at),
                SetExpiry::At(deadline) => Some(deadline),
            };
            shard.insert(key.clone(), Entry::string(value, expires_at));

            Ok(SetOutcome {
                written: true,
                previous,
            })
        })
    }

    /// Sets several keys atomically. Existing TTLs are cleared.
    pub fn mset(&self, pairs: Vec<(Bytes, Bytes)>) {
        let mut guards = self.lock_shards(pairs.iter().map(|(key, _)| key));
        for (key, value) in pairs {
            if let Some(shard) = guards.get_mut(&self.shard_index(&key)) {
                shard.insert(key, Entry::string(value, None));
            }
        }
    }

    /// Gets several string values atomically. Non-string keys read as None.
    pub fn mget(&self, keys: &[Bytes]) -> Vec<Option<Bytes>> {
        let now = Instant::now();
        let mut guards = self.lock_shards(keys.iter());
        keys.iter()
            .map(|key| {
                let value = self
                    .locked_shard(&mut guards, key, now)
                    .and_then(|shard| shard.string_value(key).ok().flatten());
                self.record_lookup(value.is_some());
                value
            })
            .collect()
    }

    /// Gets a string value and deletes the key.
    pub fn get_del(&self, key: &Bytes) -> StoreResult<Option<Bytes>> {
        self.write(key, |shard| {
            let value = shard.string_value(key)?;
            if value.is_some() {
                shard.remove(key);
            }
            Ok(value)
        })
    }

    /// Appends to a string, creating it if missing. Returns the new length.
    pub fn append(&self, key: &Bytes, suffix: &[u8]) -> StoreResult<usize> {
        self.write(key, |shard| match shard.entries.get_mut(key) {
            Some(Entry {
                value: Value::String(data),
                ..
            }) => {
                let mut joined = BytesMut::with_capacity(data.len() + suffix.len());
                joined.extend_from_slice(data);
                joined.extend_from_slice(suffix);
                *data = joined.freeze();
                Ok(data.len())
            }
            Some(_) => Err(StoreError::WrongType),
            None => {
                shard.insert(
                    key.clone(),
                    Entry::string(Bytes::copy_from_slice(suffix), None),
                );
                Ok(suffix.len())
            }
        })
    }

    /// Returns the length of a string value (0 if missing).
    pub fn strlen(&self, key: &Bytes) -> StoreResult<usize> {
        self.read(key, |entry| match entry.map(|e| &e.value) {
            None => Ok(0),
            Some(Value::String(data)) => Ok(data.len()),
            Some(_) => Err(StoreError::WrongType),
        })
    }

    /// Adds `delta` to the integer stored at `key` (missing counts as 0).
    ///
    /// The key's TTL is preserved.
    pub fn incr_by(&self, key: &Bytes, delta: i64) -> StoreResult<i64> {
        self.write(key, |shard| {
            let current = match shard.string_value(key)? {
                None => 0,
                Some(data) => std::str::from_utf8(&data)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or(StoreError::NotInteger)?,
            };
            let updated = current.checked_add(delta).ok_or(StoreError::Overflow)?;
            let encoded = Bytes::from(updated.to_string());

            match shard.entries.get_mut(key) {
                Some(entry) => entry.value = Value::String(encoded),
                None => {
                    shard.insert(key.clone(), Entry::string(encoded, None));
                }
            }
            Ok(updated)
        })
    }

    // ========================================================================
    // List operations
    // ========================================================================

    /// Pushes values onto a list, creating it if missing.
    ///
    /// Values are pushed one at a time, so `LPUSH k a b c` yields `[c, b, a]`.
    /// Returns the list length after the push.
    pub fn push(&self, key: &Bytes, values: Vec<Bytes>, end: ListEnd) -> StoreResult<usize> {
        self.write(key, |shard| {
            if shard.list_mut(key)?.is_none() {
                shard.insert(key.clone(), Entry::new(Value::List(VecDeque::new())));
            }
            let Some(list) = shard.list_mut(key)? else {
                return Ok(0);
            };

            for value in values {
                match end {
                    ListEnd::Front => list.push_front(value),
                    ListEnd::Back => list.push_back(value),
                }
            }
            Ok(list.len())
        })
    }

    /// Pops up to `count` values from one end of a list.
    ///
    /// Returns None if the key does not exist. A list emptied by the pop is
    /// deleted.
    pub fn pop(&self, key: &Bytes, end: ListEnd, count: usize) -> StoreResult<Option<Vec<Bytes>>> {
        self.write(key, |shard| {
            let Some(list) = shard.list_mut(key)? else {
                return Ok(None);
            };

            let take = count.min(list.len());
            let popped: Vec<Bytes> = match end {
                ListEnd::Front => list.drain(..take).collect(),
                ListEnd::Back => list.drain(list.len() - take..).rev().collect(),
            };

            if list.is_empty() {
                shard.remove(key);
            }
            Ok(Some(popped))
        })
    }

    /// Returns the length of a list (0 if missing).
    pub fn llen(&self, key: &Bytes) -> StoreResult<usize> {
        self.read(key, |entry| Ok(list_ref(entry)?.map_or(0, |list| list.len())))
    }

    /// Returns the element at `index`. Negative indices count from the end.
    pub fn lindex(&self, key: &Bytes, index: i64) -> StoreResult<Option<Bytes>> {
        self.read(key, |entry| {
            Ok(list_ref(entry)?.and_then(|list| {
                resolve_index(index, list.len()).and_then(|i| list.get(i).cloned())
            }))
        })
    }

    /// Returns the inclusive range `start..=stop`. Negative indices count from
    /// the end; out-of-range bounds are clamped.
    pub fn lrange(&self, key: &Bytes, start: i64, stop: i64) -> StoreResult<Vec<Bytes>> {
        self.read(key, |entry| {
            let Some(list) = list_ref(entry)? else {
                return Ok(Vec::new());
            };

            let len = list.len() as i64;
            let start = if start < 0 { (len + start).max(0) } else { start };
            let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

            if start > stop || start >= len {
                return Ok(Vec::new());
            }

            Ok(list
                .iter()
                .skip(start as usize)
                .take((stop - start + 1) as usize)
                .cloned()
                .collect())
        })
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    /// Number of shards; the sweeper visits them one at a time.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Removes at most `limit` expired keys from one shard.
    ///
    /// Called by the background sweeper. Holds the shard lock only for the
    /// duration of one bounded batch.
    pub fn purge_expired(&self, shard_index: usize, limit: usize) -> usize {
        let Some(lock) = self.shards.get(shard_index) else {
            return 0;
        };
        let removed = lock.write().purge_expired(Instant::now(), limit);
        if removed > 0 {
            self.counters
                .expired_active
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
        removed
    }

    /// Number of keys stored, including expired keys not yet evicted.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().entries.len()).sum()
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys carrying an expiry.
    pub fn volatile_len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().expirations.len())
            .sum()
    }

    /// Returns database statistics.
    pub fn stats(&self) -> StorageStats {
        let expired_lazy = self.counters.expired_lazy.load(Ordering::Relaxed);
        let expired_active = self.counters.expired_active.load(Ordering::Relaxed);

        StorageStats {
            keys: self.len() as u64,
            volatile_keys: self.volatile_len() as u64,
            keyspace_hits: self.counters.keyspace_hits.load(Ordering::Relaxed),
            keyspace_misses: self.counters.keyspace_misses.load(Ordering::Relaxed),
            expired_keys: expired_lazy + expired_active,
            expired_by_sweeper: expired_active,
        }
    }
}

/// Database statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of keys currently stored
    pub keys: u64,
    /// Keys with an expiry attached
    pub volatile_keys: u64,
    /// Successful key lookups
    pub keyspace_hits: u64,
    /// Failed key lookups
    pub keyspace_misses: u64,
    /// Keys removed because they expired (lazy + active)
    pub expired_keys: u64,
    /// Keys removed by the background sweeper
    pub expired_by_sweeper: u64,
}
