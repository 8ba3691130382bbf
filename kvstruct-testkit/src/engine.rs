//! # In-Memory Keyspace
//!
//! Typed storage behind the mock store: numbered databases of strings,
//! lists, sets and hashes with per-key expiration.
//!
//! ## Design Principles
//!
//! 1. **TTL Fast Path**: Expiration is checked on access; no sweeper thread.
//! 2. **Single Lock**: One mutex over all databases keeps every command
//!    atomic, which is all a test double needs.
//! 3. **Store Semantics**: Empty collections disappear, wrong-type access
//!    fails, missing keys read as empty.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;

use crate::glob::glob_match;

/// Failures a command can hit inside the keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    WrongType,
    NotInteger,
    Overflow,
}

impl EngineError {
    /// Error reply text, as the real store words it.
    pub fn reply(&self) -> &'static str {
        match self {
            EngineError::WrongType => {
                "WRONGTYPE Operation against a key holding the wrong kind of value"
            }
            EngineError::NotInteger => "ERR value is not an integer or out of range",
            EngineError::Overflow => "ERR increment or decrement would overflow",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug)]
enum Value {
    Str(String),
    List(VecDeque<String>),
    Set(HashSet<String>),
    Hash(HashMap<String, String>),
}

impl Value {
    fn is_empty(&self) -> bool {
        match self {
            Value::Str(_) => false,
            Value::List(items) => items.is_empty(),
            Value::Set(members) => members.is_empty(),
            Value::Hash(fields) => fields.is_empty(),
        }
    }

    fn as_str(&self) -> EngineResult<&String> {
        match self {
            Value::Str(text) => Ok(text),
            _ => Err(EngineError::WrongType),
        }
    }

    fn as_list_mut(&mut self) -> EngineResult<&mut VecDeque<String>> {
        match self {
            Value::List(items) => Ok(items),
            _ => Err(EngineError::WrongType),
        }
    }

    fn as_set_mut(&mut self) -> EngineResult<&mut HashSet<String>> {
        match self {
            Value::Set(members) => Ok(members),
            _ => Err(EngineError::WrongType),
        }
    }

    fn as_hash_mut(&mut self) -> EngineResult<&mut HashMap<String, String>> {
        match self {
            Value::Hash(fields) => Ok(fields),
            _ => Err(EngineError::WrongType),
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }
}

#[derive(Debug, Default)]
struct Db {
    entries: HashMap<String, Entry>,
}

impl Db {
    fn purge(&mut self, key: &str) {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(Instant::now()));
        if expired {
            self.entries.remove(key);
        }
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.purge(key);
        self.entries.get_mut(key)
    }

    fn get_or_insert(&mut self, key: &str, make: fn() -> Value) -> &mut Value {
        self.purge(key);
        &mut self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry {
                value: make(),
                expires_at: None,
            })
            .value
    }

    fn drop_if_empty(&mut self, key: &str) {
        if self.entries.get(key).is_some_and(|entry| entry.value.is_empty()) {
            self.entries.remove(key);
        }
    }

    /// Applies `f` to the value at `key` if present, then drops it when empty.
    fn modify<T>(
        &mut self,
        key: &str,
        missing: T,
        f: impl FnOnce(&mut Value) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let result = match self.get_mut(key) {
            Some(entry) => f(&mut entry.value)?,
            None => return Ok(missing),
        };
        self.drop_if_empty(key);
        Ok(result)
    }
}

/// Thread-safe keyspace with numbered logical databases.
#[derive(Debug, Default)]
pub struct Keyspace {
    dbs: Mutex<HashMap<u32, Db>>,
}

impl Keyspace {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_db<T>(&self, index: u32, f: impl FnOnce(&mut Db) -> T) -> T {
        let mut dbs = self.dbs.lock();
        f(dbs.entry(index).or_default())
    }

    // Strings and keys

    pub fn get(&self, db: u32, key: &str) -> EngineResult<Option<String>> {
        self.with_db(db, |db| match db.get_mut(key) {
            Some(entry) => entry.value.as_str().map(|text| Some(text.clone())),
            None => Ok(None),
        })
    }

    pub fn set(&self, db: u32, key: &str, value: &str, ttl: Option<Duration>) {
        self.with_db(db, |db| {
            db.entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Str(value.to_string()),
                    expires_at: ttl.map(|ttl| Instant::now() + ttl),
                },
            );
        })
    }

    pub fn del(&self, db: u32, key: &str) -> bool {
        self.with_db(db, |db| {
            db.purge(key);
            db.entries.remove(key).is_some()
        })
    }

    pub fn exists(&self, db: u32, key: &str) -> bool {
        self.with_db(db, |db| db.get_mut(key).is_some())
    }

    pub fn incr(&self, db: u32, key: &str) -> EngineResult<i64> {
        self.with_db(db, |db| {
            let value = db.get_or_insert(key, || Value::Str("0".to_string()));
            let current: i64 = value
                .as_str()?
                .parse()
                .map_err(|_| EngineError::NotInteger)?;
            let next = current.checked_add(1).ok_or(EngineError::Overflow)?;
            *value = Value::Str(next.to_string());
            Ok(next)
        })
    }

    pub fn expire(&self, db: u32, key: &str, ttl: Duration) -> bool {
        self.with_db(db, |db| match db.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                true
            }
            None => false,
        })
    }

    /// Remaining time in milliseconds, -1 without expiry, -2 when missing.
    pub fn pttl(&self, db: u32, key: &str) -> i64 {
        self.with_db(db, |db| match db.get_mut(key) {
            Some(Entry {
                expires_at: Some(deadline),
                ..
            }) => deadline.saturating_duration_since(Instant::now()).as_millis() as i64,
            Some(_) => -1,
            None => -2,
        })
    }

    /// Cursor-based key iteration over a stable, sorted snapshot.
    pub fn scan(&self, db: u32, cursor: usize, pattern: &str, count: usize) -> (usize, Vec<String>) {
        self.with_db(db, |db| {
            let now = Instant::now();
            db.entries.retain(|_, entry| !entry.is_expired(now));
            let mut keys: Vec<&String> = db.entries.keys().collect();
            keys.sort();

            let end = cursor.saturating_add(count.max(1)).min(keys.len());
            let start = cursor.min(end);
            let batch = keys[start..end]
                .iter()
                .filter(|key| glob_match(pattern, key))
                .map(|key| key.to_string())
                .collect();
            let next = if end >= keys.len() { 0 } else { end };
            (next, batch)
        })
    }

    // Lists

    pub fn rpush(&self, db: u32, key: &str, value: &str) -> EngineResult<usize> {
        self.with_db(db, |db| {
            let items = db.get_or_insert(key, || Value::List(VecDeque::new())).as_list_mut()?;
            items.push_back(value.to_string());
            Ok(items.len())
        })
    }

    pub fn lrange(&self, db: u32, key: &str, start: i64, stop: i64) -> EngineResult<Vec<String>> {
        self.with_db(db, |db| {
            db.modify(key, Vec::new(), |value| {
                let items = value.as_list_mut()?;
                let len = items.len() as i64;
                let start = normalize_index(start, len).max(0);
                let stop = normalize_index(stop, len).min(len - 1);
                if start > stop {
                    return Ok(Vec::new());
                }
                Ok(items
                    .range(start as usize..=stop as usize)
                    .cloned()
                    .collect())
            })
        })
    }

    pub fn lindex(&self, db: u32, key: &str, index: i64) -> EngineResult<Option<String>> {
        self.with_db(db, |db| {
            db.modify(key, None, |value| {
                let items = value.as_list_mut()?;
                let index = normalize_index(index, items.len() as i64);
                if index < 0 {
                    return Ok(None);
                }
                Ok(items.get(index as usize).cloned())
            })
        })
    }

    pub fn llen(&self, db: u32, key: &str) -> EngineResult<usize> {
        self.with_db(db, |db| db.modify(key, 0, |value| Ok(value.as_list_mut()?.len())))
    }

    // Sets

    pub fn sadd(&self, db: u32, key: &str, member: &str) -> EngineResult<bool> {
        self.with_db(db, |db| {
            let members = db.get_or_insert(key, || Value::Set(HashSet::new())).as_set_mut()?;
            Ok(members.insert(member.to_string()))
        })
    }

    pub fn sismember(&self, db: u32, key: &str, member: &str) -> EngineResult<bool> {
        self.with_db(db, |db| {
            db.modify(key, false, |value| Ok(value.as_set_mut()?.contains(member)))
        })
    }

    pub fn srem(&self, db: u32, key: &str, member: &str) -> EngineResult<bool> {
        self.with_db(db, |db| {
            db.modify(key, false, |value| Ok(value.as_set_mut()?.remove(member)))
        })
    }

    pub fn smembers(&self, db: u32, key: &str) -> EngineResult<Vec<String>> {
        self.with_db(db, |db| {
            db.modify(key, Vec::new(), |value| {
                Ok(value.as_set_mut()?.iter().cloned().collect())
            })
        })
    }

    pub fn scard(&self, db: u32, key: &str) -> EngineResult<usize> {
        self.with_db(db, |db| db.modify(key, 0, |value| Ok(value.as_set_mut()?.len())))
    }

    // Hashes

    pub fn hset(&self, db: u32, key: &str, field: &str, value: &str) -> EngineResult<bool> {
        self.with_db(db, |db| {
            let fields = db.get_or_insert(key, || Value::Hash(HashMap::new())).as_hash_mut()?;
            Ok(fields.insert(field.to_string(), value.to_string()).is_none())
        })
    }

    pub fn hget(&self, db: u32, key: &str, field: &str) -> EngineResult<Option<String>> {
        self.with_db(db, |db| {
            db.modify(key, None, |value| Ok(value.as_hash_mut()?.get(field).cloned()))
        })
    }

    pub fn hexists(&self, db: u32, key: &str, field: &str) -> EngineResult<bool> {
        self.with_db(db, |db| {
            db.modify(key, false, |value| Ok(value.as_hash_mut()?.contains_key(field)))
        })
    }

    pub fn hdel(&self, db: u32, key: &str, field: &str) -> EngineResult<bool> {
        self.with_db(db, |db| {
            db.modify(key, false, |value| {
                Ok(value.as_hash_mut()?.remove(field).is_some())
            })
        })
    }

    pub fn hkeys(&self, db: u32, key: &str) -> EngineResult<Vec<String>> {
        self.with_db(db, |db| {
            db.modify(key, Vec::new(), |value| {
                Ok(value.as_hash_mut()?.keys().cloned().collect())
            })
        })
    }

    pub fn hlen(&self, db: u32, key: &str) -> EngineResult<usize> {
        self.with_db(db, |db| db.modify(key, 0, |value| Ok(value.as_hash_mut()?.len())))
    }

    /// Number of live keys in one database.
    pub fn dbsize(&self, db: u32) -> usize {
        self.with_db(db, |db| {
            let now = Instant::now();
            db.entries.retain(|_, entry| !entry.is_expired(now));
            db.entries.len()
        })
    }
}

// Negative indexes count from the end, as in LRANGE/LINDEX.
fn normalize_index(index: i64, len: i64) -> i64 {
    if index < 0 {
        len + index
    } else {
        index
    }
}
