//! Key/value store scoped by name.
//!
//! Every entry lives at `name:key`, so one name groups many keys and
//! `remove` can find them all with a prefix scan.

use std::time::Duration;

use tracing::debug;

use kvstruct_client::{ConnectionPool, StoreError, StoreResult, TtlStatus};
use kvstruct_common::{compose_key, prefix_pattern};

use crate::capability::KeyValueStore;
use crate::handle::Handle;

#[derive(Clone)]
pub struct KeyValue {
    handle: Handle,
}

impl KeyValue {
    /// Binds a key/value store named `name` in database 0.
    pub fn new(pool: &ConnectionPool, name: &str) -> Self {
        Self::with_database(pool, name, 0)
    }

    pub fn with_database(pool: &ConnectionPool, name: &str, db_index: u32) -> Self {
        KeyValue {
            handle: Handle::new(pool, name, db_index),
        }
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    pub fn db_index(&self) -> u32 {
        self.handle.db_index()
    }

    /// Rebinds subsequent operations to another logical database.
    pub fn select_database(&mut self, index: u32) {
        self.handle.select_database(index);
    }

    fn entry_key(&self, key: &str) -> String {
        compose_key(&[self.name(), key])
    }
}

impl KeyValueStore for KeyValue {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.handle.conn()?.set(&self.entry_key(key), value)
    }

    fn get(&self, key: &str) -> StoreResult<String> {
        self.handle
            .conn()?
            .get(&self.entry_key(key))?
            .ok_or(StoreError::NotFound)
    }

    fn del(&self, key: &str) -> StoreResult<()> {
        self.handle.conn()?.del(&[self.entry_key(key).as_str()])?;
        Ok(())
    }

    fn inc(&self, key: &str) -> StoreResult<String> {
        let value = self.handle.conn()?.incr(&self.entry_key(key))?;
        Ok(value.to_string())
    }

    fn set_expire(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.handle.conn()?.set_px(&self.entry_key(key), value, ttl)
    }

    fn time_to_live(&self, key: &str) -> StoreResult<TtlStatus> {
        self.handle.conn()?.pttl(&self.entry_key(key))
    }

    fn remove(&self) -> StoreResult<()> {
        let mut conn = self.handle.conn()?;
        let keys = conn.scan_match(&prefix_pattern(&[self.name()]))?;
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        let removed = conn.del(&keys)?;
        debug!(name = self.name(), removed, "removed key/value store");
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.remove()
    }
}
