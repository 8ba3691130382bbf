//! # Primitive Commands
//!
//! Typed wrappers for the store commands the data structures are composed
//! of. Each wrapper issues exactly one command on the borrowed connection and
//! converts the reply; nothing here retries or caches.

use std::time::Duration;

use tracing::trace;

use kvstruct_common::{StoreError, StoreResult, TtlStatus};

use crate::pool::PooledConnection;
use crate::resp::RespValue;

/// Number of keys requested per `SCAN` round trip.
const SCAN_BATCH: &str = "100";

impl PooledConnection {
    fn command<A: AsRef<[u8]>>(&mut self, args: &[A]) -> StoreResult<RespValue> {
        if let Some(name) = args.first() {
            trace!(command = %String::from_utf8_lossy(name.as_ref()), "exec");
        }
        self.exec(args)
    }

    // Strings and keys

    pub fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        self.command(&["GET", key])?.into_opt_string()
    }

    pub fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.command(&["SET", key, value])?.into_status()?;
        Ok(())
    }

    /// Sets a value and attaches a millisecond-precision expiration.
    pub fn set_px(&mut self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let millis = ttl_millis(ttl)?;
        self.command(&["SET", key, value, "PX", millis.as_str()])?
            .into_status()?;
        Ok(())
    }

    /// Deletes keys; returns how many existed.
    pub fn del(&mut self, keys: &[&str]) -> StoreResult<i64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut args = Vec::with_capacity(keys.len() + 1);
        args.push("DEL");
        args.extend_from_slice(keys);
        self.command(&args)?.into_integer()
    }

    pub fn exists(&mut self, key: &str) -> StoreResult<bool> {
        Ok(self.command(&["EXISTS", key])?.into_integer()? > 0)
    }

    pub fn incr(&mut self, key: &str) -> StoreResult<i64> {
        self.command(&["INCR", key])?.into_integer()
    }

    /// Attaches an expiration in whole seconds; false when the key is missing.
    pub fn expire(&mut self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let seconds = ttl.as_secs().to_string();
        Ok(self.command(&["EXPIRE", key, seconds.as_str()])?.into_integer()? == 1)
    }

    /// Returns TTL status with millisecond precision.
    pub fn pttl(&mut self, key: &str) -> StoreResult<TtlStatus> {
        match self.command(&["PTTL", key])?.into_integer()? {
            -2 => Ok(TtlStatus::Missing),
            -1 => Ok(TtlStatus::NoExpiry),
            millis if millis >= 0 => Ok(TtlStatus::ExpiresIn(Duration::from_millis(millis as u64))),
            _ => Err(StoreError::UnexpectedResponse),
        }
    }

    /// Collects every key matching a glob pattern with cursor-based `SCAN`.
    pub fn scan_match(&mut self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor = String::from("0");
        loop {
            let reply = self.command(&["SCAN", cursor.as_str(), "MATCH", pattern, "COUNT", SCAN_BATCH])?;
            let mut parts = match reply {
                RespValue::Array(parts) if parts.len() == 2 => parts,
                other => return Err(other.into_error()),
            };
            let batch = parts.pop().ok_or(StoreError::UnexpectedResponse)?;
            let next = parts.pop().ok_or(StoreError::UnexpectedResponse)?;
            keys.extend(batch.into_strings()?);
            cursor = next.into_opt_string()?.ok_or(StoreError::UnexpectedResponse)?;
            if cursor == "0" {
                break;
            }
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    // Lists

    pub fn rpush(&mut self, key: &str, value: &str) -> StoreResult<i64> {
        self.command(&["RPUSH", key, value])?.into_integer()
    }

    pub fn lrange(&mut self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let (start, stop) = (start.to_string(), stop.to_string());
        self.command(&["LRANGE", key, start.as_str(), stop.as_str()])?
            .into_strings()
    }

    pub fn lindex(&mut self, key: &str, index: i64) -> StoreResult<Option<String>> {
        let index = index.to_string();
        self.command(&["LINDEX", key, index.as_str()])?.into_opt_string()
    }

    pub fn llen(&mut self, key: &str) -> StoreResult<i64> {
        self.command(&["LLEN", key])?.into_integer()
    }

    // Sets

    pub fn sadd(&mut self, key: &str, member: &str) -> StoreResult<bool> {
        Ok(self.command(&["SADD", key, member])?.into_integer()? > 0)
    }

    pub fn sismember(&mut self, key: &str, member: &str) -> StoreResult<bool> {
        Ok(self.command(&["SISMEMBER", key, member])?.into_integer()? == 1)
    }

    pub fn srem(&mut self, key: &str, member: &str) -> StoreResult<bool> {
        Ok(self.command(&["SREM", key, member])?.into_integer()? > 0)
    }

    pub fn smembers(&mut self, key: &str) -> StoreResult<Vec<String>> {
        self.command(&["SMEMBERS", key])?.into_strings()
    }

    pub fn scard(&mut self, key: &str) -> StoreResult<i64> {
        self.command(&["SCARD", key])?.into_integer()
    }

    // Hashes

    pub fn hset(&mut self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.command(&["HSET", key, field, value])?.into_integer()?;
        Ok(())
    }

    pub fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.command(&["HGET", key, field])?.into_opt_string()
    }

    pub fn hexists(&mut self, key: &str, field: &str) -> StoreResult<bool> {
        Ok(self.command(&["HEXISTS", key, field])?.into_integer()? == 1)
    }

    pub fn hdel(&mut self, key: &str, field: &str) -> StoreResult<bool> {
        Ok(self.command(&["HDEL", key, field])?.into_integer()? > 0)
    }

    pub fn hkeys(&mut self, key: &str) -> StoreResult<Vec<String>> {
        self.command(&["HKEYS", key])?.into_strings()
    }

    pub fn hlen(&mut self, key: &str) -> StoreResult<i64> {
        self.command(&["HLEN", key])?.into_integer()
    }
}

fn ttl_millis(ttl: Duration) -> StoreResult<String> {
    let millis = ttl.as_millis();
    if millis == 0 {
        return Err(StoreError::InvalidValue {
            message: "expiration must be at least one millisecond".to_string(),
        });
    }
    Ok(millis.to_string())
}
