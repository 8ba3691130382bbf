//! # Hash of Hashes
//!
//! Purpose: Store named elements, each a set of field/value pairs, and
//! answer reverse lookups the backing store has no primitive for.
//!
//! ## Layout
//!
//! ```text
//! name                      set      registry of element IDs
//! name:elementID            hash     field -> value
//! name:elementID:field      string   one field written with its own TTL
//! ```
//!
//! A field lives in exactly one of the two element representations: `set`
//! deletes the expiring copy, `set_expire` deletes the hash copy. Reads
//! consult both. The registry gains an ID on every write and loses it when
//! `del_key` or `del` leave the element without fields; a field that expires
//! on its own leaves its ID registered, and lookups treat such an element as
//! having no value for that field.
//!
//! ## Consistency
//!
//! `find_id_by_field_value` and `find_key_by_value` are linear scans of one
//! round trip per candidate, with no snapshot: writes that land during a
//! scan may or may not be observed. Each scan reuses a single connection.

use std::time::Duration;

use tracing::debug;

use kvstruct_client::{ConnectionPool, PooledConnection, StoreError, StoreResult, TtlStatus};
use kvstruct_common::{compose_key, prefix_pattern, validate_element_id};

use crate::capability::HashMapStore;
use crate::handle::Handle;

#[derive(Clone)]
pub struct HashMap {
    handle: Handle,
}

impl HashMap {
    /// Binds a hash map named `name` in database 0.
    pub fn new(pool: &ConnectionPool, name: &str) -> Self {
        Self::with_database(pool, name, 0)
    }

    pub fn with_database(pool: &ConnectionPool, name: &str, db_index: u32) -> Self {
        HashMap {
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

    fn element_key(&self, element_id: &str) -> String {
        compose_key(&[self.name(), element_id])
    }

    fn expiring_key(&self, element_id: &str, field: &str) -> String {
        compose_key(&[self.name(), element_id, field])
    }

    /// Value of one field from either representation.
    fn field_value(
        &self,
        conn: &mut PooledConnection,
        element_id: &str,
        field: &str,
    ) -> StoreResult<Option<String>> {
        if let Some(value) = conn.hget(&self.element_key(element_id), field)? {
            return Ok(Some(value));
        }
        conn.get(&self.expiring_key(element_id, field))
    }

    /// Field names written with their own TTL that have not expired yet.
    fn expiring_fields(&self, conn: &mut PooledConnection, element_id: &str) -> StoreResult<Vec<String>> {
        let prefix = compose_key(&[self.name(), element_id, ""]);
        let keys = conn.scan_match(&prefix_pattern(&[self.name(), element_id]))?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    fn field_names(&self, conn: &mut PooledConnection, element_id: &str) -> StoreResult<Vec<String>> {
        let mut fields = conn.hkeys(&self.element_key(element_id))?;
        for field in self.expiring_fields(conn, element_id)? {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        Ok(fields)
    }

    /// Deletes an element's hash and expiring fields, leaving the registry alone.
    fn delete_element(&self, conn: &mut PooledConnection, element_id: &str) -> StoreResult<()> {
        let mut keys = vec![self.element_key(element_id)];
        for field in self.expiring_fields(conn, element_id)? {
            keys.push(self.expiring_key(element_id, &field));
        }
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        conn.del(&keys)?;
        Ok(())
    }

    /// Unregisters an element once its last field is gone.
    fn unregister_if_empty(&self, conn: &mut PooledConnection, element_id: &str) -> StoreResult<()> {
        if conn.hlen(&self.element_key(element_id))? > 0 {
            return Ok(());
        }
        if self.expiring_fields(conn, element_id)?.is_empty() {
            conn.srem(self.name(), element_id)?;
        }
        Ok(())
    }
}

impl HashMapStore for HashMap {
    fn set(&self, element_id: &str, field: &str, value: &str) -> StoreResult<()> {
        validate_element_id(element_id)?;
        let mut conn = self.handle.conn()?;
        conn.sadd(self.name(), element_id)?;
        conn.hset(&self.element_key(element_id), field, value)?;
        conn.del(&[self.expiring_key(element_id, field).as_str()])?;
        Ok(())
    }

    fn set_expire(&self, element_id: &str, field: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        validate_element_id(element_id)?;
        let mut conn = self.handle.conn()?;
        // set_px rejects a zero TTL before sending, so it must come first.
        conn.set_px(&self.expiring_key(element_id, field), value, ttl)?;
        conn.hdel(&self.element_key(element_id), field)?;
        conn.sadd(self.name(), element_id)?;
        Ok(())
    }

    fn get(&self, element_id: &str, field: &str) -> StoreResult<String> {
        validate_element_id(element_id)?;
        let mut conn = self.handle.conn()?;
        self.field_value(&mut conn, element_id, field)?
            .ok_or(StoreError::NotFound)
    }

    fn has(&self, element_id: &str, field: &str) -> StoreResult<bool> {
        validate_element_id(element_id)?;
        let mut conn = self.handle.conn()?;
        if conn.hexists(&self.element_key(element_id), field)? {
            return Ok(true);
        }
        conn.exists(&self.expiring_key(element_id, field))
    }

    fn exists(&self, element_id: &str) -> StoreResult<bool> {
        validate_element_id(element_id)?;
        self.handle.conn()?.sismember(self.name(), element_id)
    }

    fn all(&self) -> StoreResult<Vec<String>> {
        self.handle.conn()?.smembers(self.name())
    }

    fn keys(&self, element_id: &str) -> StoreResult<Vec<String>> {
        validate_element_id(element_id)?;
        let mut conn = self.handle.conn()?;
        self.field_names(&mut conn, element_id)
    }

    fn del_key(&self, element_id: &str, field: &str) -> StoreResult<()> {
        validate_element_id(element_id)?;
        let mut conn = self.handle.conn()?;
        conn.hdel(&self.element_key(element_id), field)?;
        conn.del(&[self.expiring_key(element_id, field).as_str()])?;
        self.unregister_if_empty(&mut conn, element_id)
    }

    fn del(&self, element_id: &str) -> StoreResult<()> {
        validate_element_id(element_id)?;
        let mut conn = self.handle.conn()?;
        self.delete_element(&mut conn, element_id)?;
        conn.srem(self.name(), element_id)?;
        Ok(())
    }

    fn time_to_live(&self, element_id: &str, field: &str) -> StoreResult<TtlStatus> {
        validate_element_id(element_id)?;
        let mut conn = self.handle.conn()?;
        match conn.pttl(&self.expiring_key(element_id, field))? {
            TtlStatus::Missing if conn.hexists(&self.element_key(element_id), field)? => {
                Ok(TtlStatus::NoExpiry)
            }
            status => Ok(status),
        }
    }

    fn find_id_by_field_value(&self, field: &str, value: &str) -> StoreResult<String> {
        let mut conn = self.handle.conn()?;
        let element_ids = conn.smembers(self.name())?;
        for (scanned, element_id) in element_ids.into_iter().enumerate() {
            if self.field_value(&mut conn, &element_id, field)?.as_deref() == Some(value) {
                debug!(name = self.name(), scanned = scanned + 1, "element found by field value");
                return Ok(element_id);
            }
        }
        debug!(name = self.name(), field, "no element matches field value");
        Err(StoreError::NotFound)
    }

    fn find_key_by_value(&self, element_id: &str, value: &str) -> StoreResult<String> {
        validate_element_id(element_id)?;
        let mut conn = self.handle.conn()?;
        let fields = self.field_names(&mut conn, element_id)?;
        for field in fields {
            if self.field_value(&mut conn, element_id, &field)?.as_deref() == Some(value) {
                return Ok(field);
            }
        }
        Err(StoreError::NotFound)
    }

    fn remove(&self) -> StoreResult<()> {
        let mut conn = self.handle.conn()?;
        let element_ids = conn.smembers(self.name())?;
        for element_id in &element_ids {
            self.delete_element(&mut conn, element_id)?;
        }
        conn.del(&[self.name()])?;
        debug!(name = self.name(), elements = element_ids.len(), "removed hash map");
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.remove()
    }
}
