use kvstruct_client::{ConnectionPool, StoreError, StoreResult};

use crate::capability::ListStore;
use crate::handle::Handle;

/// Ordered list stored under its own name.
#[derive(Clone)]
pub struct List {
    handle: Handle,
}

impl List {
    /// Binds a list named `name` in database 0.
    pub fn new(pool: &ConnectionPool, name: &str) -> Self {
        Self::with_database(pool, name, 0)
    }

    pub fn with_database(pool: &ConnectionPool, name: &str, db_index: u32) -> Self {
        List {
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
}

impl ListStore for List {
    fn add(&self, value: &str) -> StoreResult<()> {
        self.handle.conn()?.rpush(self.name(), value)?;
        Ok(())
    }

    fn all(&self) -> StoreResult<Vec<String>> {
        self.handle.conn()?.lrange(self.name(), 0, -1)
    }

    fn get_last(&self) -> StoreResult<String> {
        self.handle
            .conn()?
            .lindex(self.name(), -1)?
            .ok_or(StoreError::NotFound)
    }

    fn last_n(&self, n: usize) -> StoreResult<Vec<String>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let start = -(i64::try_from(n).unwrap_or(i64::MAX));
        self.handle.conn()?.lrange(self.name(), start, -1)
    }

    fn size(&self) -> StoreResult<usize> {
        let len = self.handle.conn()?.llen(self.name())?;
        Ok(len as usize)
    }

    fn remove(&self) -> StoreResult<()> {
        self.handle.conn()?.del(&[self.name()])?;
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.remove()
    }
}
