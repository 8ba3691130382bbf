//! # kvstruct
//!
//! Purpose: Typed data structures (list, set, hash of hashes, key/value
//! store with expiration) kept entirely in a Redis-compatible store and
//! reached through a shared `ConnectionPool`.
//!
//! ## Design Principles
//! 1. **No Local State**: Every read is a round trip and every write goes
//!    straight to the store; two values with the same name and database
//!    alias the same data.
//! 2. **Borrow Per Operation**: Data structures hold a pool handle, never a
//!    connection.
//! 3. **Capability Traits**: `ListStore`, `SetStore`, `HashMapStore` and
//!    `KeyValueStore` describe what each family can do; `Creator` builds
//!    them without naming concrete types.
//! 4. **Typed Misses**: Lookups that find nothing return
//!    `StoreError::NotFound`, distinct from every transport failure.
//!
//! ## Usage
//!
//! ```no_run
//! use kvstruct::prelude::*;
//!
//! let pool = ConnectionPool::new();
//! let greetings = List::new(&pool, "greetings");
//! greetings.add("hello")?;
//! assert_eq!(greetings.get_last()?, "hello");
//! greetings.remove()?;
//! pool.close();
//! # Ok::<(), StoreError>(())
//! ```

mod capability;
mod creator;
mod handle;
mod hashmap;
mod keyvalue;
mod list;
mod set;

pub use capability::{HashMapStore, KeyValueStore, ListStore, SetStore};
pub use creator::{Creator, PoolCreator};
pub use hashmap::HashMap;
pub use keyvalue::KeyValue;
pub use list::List;
pub use set::Set;

pub use kvstruct_client::{
    test_connection, test_connection_host, ConnectionPool, PoolConfig, StoreError, StoreResult,
    TtlStatus,
};

/// Everything needed to create and use the data structures.
pub mod prelude {
    pub use crate::{
        ConnectionPool, Creator, HashMap, HashMapStore, KeyValue, KeyValueStore, List, ListStore,
        PoolCreator, Set, SetStore, StoreError, StoreResult, TtlStatus,
    };
}
