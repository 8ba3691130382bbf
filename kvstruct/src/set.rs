use kvstruct_client::{ConnectionPool, StoreResult};

use crate::capability::SetStore;
use crate::handle::Handle;

/// Set of unique members stored under its own name.
#[derive(Clone)]
pub struct Set {
    handle: Handle,
}

impl Set {
    /// Binds a set named `name` in database 0.
    pub fn new(pool: &ConnectionPool, name: &str) -> Self {
        Self::with_database(pool, name, 0)
    }

    pub fn with_database(pool: &ConnectionPool, name: &str, db_index: u32) -> Self {
        Set {
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

impl SetStore for Set {
    fn add(&self, member: &str) -> StoreResult<()> {
        self.handle.conn()?.sadd(self.name(), member)?;
        Ok(())
    }

    fn has(&self, member: &str) -> StoreResult<bool> {
        self.handle.conn()?.sismember(self.name(), member)
    }

    fn del(&self, member: &str) -> StoreResult<()> {
        self.handle.conn()?.srem(self.name(), member)?;
        Ok(())
    }

    fn all(&self) -> StoreResult<Vec<String>> {
        self.handle.conn()?.smembers(self.name())
    }

    fn size(&self) -> StoreResult<usize> {
        let len = self.handle.conn()?.scard(self.name())?;
        Ok(len as usize)
    }

    fn remove(&self) -> StoreResult<()> {
        self.handle.conn()?.del(&[self.name()])?;
        Ok(())
    }

    // The store drops a set with its last member, so clearing and removing
    // leave the same state behind.
    fn clear(&self) -> StoreResult<()> {
        self.remove()
    }
}
