use kvstruct_client::{ConnectionPool, PooledConnection, StoreResult};

/// Pool, name and database shared by every data structure.
///
/// Two handles with the same name and database address the same remote
/// state; nothing is cached locally.
#[derive(Clone)]
pub(crate) struct Handle {
    pool: ConnectionPool,
    name: String,
    db_index: u32,
}

impl Handle {
    pub(crate) fn new(pool: &ConnectionPool, name: &str, db_index: u32) -> Self {
        Handle {
            pool: pool.clone(),
            name: name.to_string(),
            db_index,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn db_index(&self) -> u32 {
        self.db_index
    }

    pub(crate) fn select_database(&mut self, index: u32) {
        self.db_index = index;
    }

    /// Borrows a connection for the duration of one operation.
    pub(crate) fn conn(&self) -> StoreResult<PooledConnection> {
        self.pool.get(self.db_index)
    }
}
