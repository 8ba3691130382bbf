mod common;

use std::thread;
use std::time::Duration;

use kvstruct::{KeyValue, KeyValueStore, StoreError, TtlStatus};

#[test]
fn set_get_del() {
    let (_store, pool) = common::start();
    let mut kv = KeyValue::new(&pool, "kv_abc123_test_test_test_123abc");
    kv.select_database(1);

    kv.set("token", "123abc").expect("set");
    assert_eq!(kv.get("token").expect("get"), "123abc");

    kv.del("token").expect("del");
    assert!(matches!(kv.get("token"), Err(StoreError::NotFound)));
    assert!(matches!(kv.get("hurdygurdy32"), Err(StoreError::NotFound)));

    kv.del("token").expect("del of missing key");
    kv.remove().expect("remove");
}

#[test]
fn entries_are_namespaced_by_name() {
    let (store, pool) = common::start();
    let kv = KeyValue::new(&pool, "sessions");
    let other = KeyValue::new(&pool, "sessions2");

    kv.set("alice", "s1").expect("set");
    other.set("alice", "s2").expect("set");

    assert_eq!(store.keyspace().get(0, "sessions:alice").unwrap().as_deref(), Some("s1"));
    assert_eq!(kv.get("alice").expect("get"), "s1");
    assert_eq!(other.get("alice").expect("get"), "s2");
}

#[test]
fn inc_counts_from_absent_and_existing_values() {
    let (_store, pool) = common::start();
    let mut kv = KeyValue::new(&pool, "kv_234_test_test_test");
    kv.select_database(1);

    assert_eq!(kv.inc("fresh").expect("inc absent"), "1");
    assert_eq!(kv.get("fresh").expect("get"), "1");

    kv.set("counter", "9").expect("set");
    assert_eq!(kv.inc("counter").expect("inc"), "10");
    assert_eq!(kv.get("counter").expect("get"), "10");

    kv.set("name", "bob").expect("set");
    assert!(matches!(kv.inc("name"), Err(StoreError::InvalidValue { .. })));
    assert_eq!(kv.get("name").expect("unchanged"), "bob");

    let max = i64::MAX.to_string();
    kv.set("max", &max).expect("set");
    assert!(matches!(kv.inc("max"), Err(StoreError::InvalidValue { .. })));
    assert_eq!(kv.get("max").expect("unchanged"), max);
}

#[test]
fn set_expire_attaches_ttl() {
    let (_store, pool) = common::start();
    let kv = KeyValue::new(&pool, "kv_exp");
    let ttl = Duration::from_millis(300);

    kv.set_expire("token", "123abc", ttl).expect("set expire");
    assert_eq!(kv.get("token").expect("get"), "123abc");

    match kv.time_to_live("token").expect("ttl") {
        TtlStatus::ExpiresIn(remaining) => {
            assert!(remaining > Duration::ZERO);
            assert!(remaining <= ttl);
        }
        other => panic!("expected an expiration, got {other:?}"),
    }

    thread::sleep(Duration::from_millis(600));
    assert!(kv.get("token").expect_err("expired").is_not_found());
    assert_eq!(kv.time_to_live("token").expect("ttl"), TtlStatus::Missing);
}

#[test]
fn ttl_distinguishes_persistent_and_missing_keys() {
    let (_store, pool) = common::start();
    let kv = KeyValue::new(&pool, "kv_ttl");
    kv.set("forever", "1").expect("set");

    assert_eq!(kv.time_to_live("forever").expect("ttl"), TtlStatus::NoExpiry);
    assert_eq!(kv.time_to_live("nobody").expect("ttl"), TtlStatus::Missing);
}

#[test]
fn zero_ttl_is_rejected() {
    let (_store, pool) = common::start();
    let kv = KeyValue::new(&pool, "kv_zero");

    let err = kv.set_expire("k", "v", Duration::ZERO).expect_err("zero ttl");
    assert!(matches!(err, StoreError::InvalidValue { .. }));
    assert!(kv.get("k").expect_err("never written").is_not_found());
}

#[test]
fn remove_deletes_every_entry_and_nothing_else() {
    let (store, pool) = common::start();
    let kv = KeyValue::new(&pool, "kv*glob");
    let neighbour = KeyValue::new(&pool, "kvXglob");

    for key in ["a", "b", "c"] {
        kv.set(key, key).expect("set");
    }
    neighbour.set("a", "kept").expect("set");

    kv.remove().expect("remove");
    for key in ["a", "b", "c"] {
        assert!(kv.get(key).expect_err("removed").is_not_found());
    }
    assert_eq!(neighbour.get("a").expect("neighbour"), "kept");
    assert_eq!(store.keyspace().dbsize(0), 1);

    kv.remove().expect("remove twice");
    kv.clear().expect("clear");
}
