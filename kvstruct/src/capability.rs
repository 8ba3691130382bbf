//! # Capability Traits
//!
//! The operations each data structure family offers, independent of the
//! concrete type behind them. Code that only needs "a list" or "a hash map"
//! depends on these traits, and a `Creator` hands out implementations.

use std::time::Duration;

use kvstruct_common::{StoreResult, TtlStatus};

/// Ordered sequence of strings; duplicates allowed.
pub trait ListStore {
    /// Appends `value` to the end.
    fn add(&self, value: &str) -> StoreResult<()>;
    /// Every item in insertion order; empty when the list does not exist.
    fn all(&self) -> StoreResult<Vec<String>>;
    /// The most recently added item, `NotFound` when empty.
    fn get_last(&self) -> StoreResult<String>;
    /// The last `n` items in insertion order.
    fn last_n(&self, n: usize) -> StoreResult<Vec<String>>;
    fn size(&self) -> StoreResult<usize>;
    /// Deletes the whole list.
    fn remove(&self) -> StoreResult<()>;
    fn clear(&self) -> StoreResult<()>;
}

/// Unordered collection of unique strings.
pub trait SetStore {
    fn add(&self, member: &str) -> StoreResult<()>;
    /// Absence is `Ok(false)`, never an error.
    fn has(&self, member: &str) -> StoreResult<bool>;
    /// Removes one member; no-op when absent.
    fn del(&self, member: &str) -> StoreResult<()>;
    fn all(&self) -> StoreResult<Vec<String>>;
    fn size(&self) -> StoreResult<usize>;
    /// Deletes the whole set.
    fn remove(&self) -> StoreResult<()>;
    /// Removes every member.
    fn clear(&self) -> StoreResult<()>;
}

/// Elements identified by ID, each holding field/value pairs.
pub trait HashMapStore {
    fn set(&self, element_id: &str, field: &str, value: &str) -> StoreResult<()>;
    /// Sets one field that expires on its own after `ttl`.
    fn set_expire(&self, element_id: &str, field: &str, value: &str, ttl: Duration) -> StoreResult<()>;
    fn get(&self, element_id: &str, field: &str) -> StoreResult<String>;
    fn has(&self, element_id: &str, field: &str) -> StoreResult<bool>;
    /// True when the element is registered.
    fn exists(&self, element_id: &str) -> StoreResult<bool>;
    /// Every registered element ID.
    fn all(&self) -> StoreResult<Vec<String>>;
    /// Field names of one element.
    fn keys(&self, element_id: &str) -> StoreResult<Vec<String>>;
    fn del_key(&self, element_id: &str, field: &str) -> StoreResult<()>;
    /// Deletes one element with all of its fields.
    fn del(&self, element_id: &str) -> StoreResult<()>;
    fn time_to_live(&self, element_id: &str, field: &str) -> StoreResult<TtlStatus>;
    /// First element whose `field` equals `value`.
    fn find_id_by_field_value(&self, field: &str, value: &str) -> StoreResult<String>;
    /// First field of `element_id` whose value equals `value`.
    fn find_key_by_value(&self, element_id: &str, value: &str) -> StoreResult<String>;
    /// Deletes every element and the registry.
    fn remove(&self) -> StoreResult<()>;
    fn clear(&self) -> StoreResult<()>;
}

/// String keys mapped to string values, with expiration and counters.
pub trait KeyValueStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn get(&self, key: &str) -> StoreResult<String>;
    /// Deletes one key; no-op when absent.
    fn del(&self, key: &str) -> StoreResult<()>;
    /// Atomically increments an integer value and returns it as a string.
    fn inc(&self, key: &str) -> StoreResult<String>;
    fn set_expire(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;
    fn time_to_live(&self, key: &str) -> StoreResult<TtlStatus>;
    /// Deletes every key of this key/value store.
    fn remove(&self) -> StoreResult<()>;
    fn clear(&self) -> StoreResult<()>;
}
