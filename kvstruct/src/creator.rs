use kvstruct_client::ConnectionPool;

use crate::capability::{HashMapStore, KeyValueStore, ListStore, SetStore};
use crate::{HashMap, KeyValue, List, Set};

/// Factory for the four data structure families.
///
/// Callers generic over `C: Creator` depend only on the capability traits,
/// never on the concrete types behind them.
pub trait Creator {
    type List: ListStore;
    type Set: SetStore;
    type HashMap: HashMapStore;
    type KeyValue: KeyValueStore;

    fn new_list(&self, id: &str) -> Self::List;
    fn new_set(&self, id: &str) -> Self::Set;
    fn new_hash_map(&self, id: &str) -> Self::HashMap;
    fn new_key_value(&self, id: &str) -> Self::KeyValue;
}

/// Creates data structures bound to one pool and one logical database.
#[derive(Clone)]
pub struct PoolCreator {
    pool: ConnectionPool,
    db_index: u32,
}

impl PoolCreator {
    pub fn new(pool: &ConnectionPool, db_index: u32) -> Self {
        PoolCreator {
            pool: pool.clone(),
            db_index,
        }
    }

    pub fn db_index(&self) -> u32 {
        self.db_index
    }
}

impl Creator for PoolCreator {
    type List = List;
    type Set = Set;
    type HashMap = HashMap;
    type KeyValue = KeyValue;

    fn new_list(&self, id: &str) -> List {
        List::with_database(&self.pool, id, self.db_index)
    }

    fn new_set(&self, id: &str) -> Set {
        Set::with_database(&self.pool, id, self.db_index)
    }

    fn new_hash_map(&self, id: &str) -> HashMap {
        HashMap::with_database(&self.pool, id, self.db_index)
    }

    fn new_key_value(&self, id: &str) -> KeyValue {
        KeyValue::with_database(&self.pool, id, self.db_index)
    }
}
