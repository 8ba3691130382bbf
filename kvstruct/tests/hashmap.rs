mod common;

use std::thread;
use std::time::Duration;

use kvstruct::{HashMap, HashMapStore, StoreError, TtlStatus};

#[test]
fn set_get_round_trip() {
    let (_store, pool) = common::start();
    let mut hash = HashMap::new(&pool, "abc123_test_test_test_123abc_123");
    hash.select_database(1);
    hash.clear().expect("clear");

    hash.set("bob", "password", "hunter1").expect("set");
    assert_eq!(hash.get("bob", "password").expect("get"), "hunter1");
    assert!(hash.has("bob", "password").expect("has"));
    assert!(!hash.has("bob", "email").expect("has"));
    assert!(hash.exists("bob").expect("exists"));

    assert_eq!(hash.all().expect("all"), vec!["bob"]);
    assert_eq!(hash.keys("bob").expect("keys"), vec!["password"]);

    hash.set("bob", "password", "hunter2").expect("overwrite");
    assert_eq!(hash.get("bob", "password").expect("get"), "hunter2");

    hash.remove().expect("remove");
}

#[test]
fn separator_in_element_id_is_rejected() {
    let (store, pool) = common::start();
    let hash = HashMap::new(&pool, "ids");

    let err = hash.set("b:ob", "password", "hunter1").expect_err("invalid id");
    assert!(matches!(err, StoreError::InvalidId(ref id) if id == "b:ob"));
    assert!(matches!(
        hash.set_expire("b:ob", "token", "t", Duration::from_secs(1)),
        Err(StoreError::InvalidId(_))
    ));
    assert!(matches!(hash.get("b:ob", "password"), Err(StoreError::InvalidId(_))));
    assert!(matches!(hash.has("b:ob", "password"), Err(StoreError::InvalidId(_))));
    assert!(matches!(hash.exists("b:ob"), Err(StoreError::InvalidId(_))));
    assert!(matches!(hash.keys("b:ob"), Err(StoreError::InvalidId(_))));
    assert!(matches!(hash.del_key("b:ob", "password"), Err(StoreError::InvalidId(_))));
    assert!(matches!(hash.del("b:ob"), Err(StoreError::InvalidId(_))));
    assert!(matches!(hash.time_to_live("b:ob", "password"), Err(StoreError::InvalidId(_))));
    assert!(matches!(hash.find_key_by_value("b:ob", "hunter1"), Err(StoreError::InvalidId(_))));
    assert!(hash.all().expect("all").is_empty());
    assert_eq!(store.keyspace().dbsize(0), 0);
}

#[test]
fn missing_element_or_field_is_not_found() {
    let (_store, pool) = common::start();
    let hash = HashMap::new(&pool, "sparse");
    hash.set("alice", "email", "alice@example.com").expect("set");

    assert!(matches!(hash.get("alice", "phone"), Err(StoreError::NotFound)));
    assert!(matches!(hash.get("nobody", "email"), Err(StoreError::NotFound)));
    assert!(!hash.exists("nobody").expect("exists"));
    assert!(hash.keys("nobody").expect("keys").is_empty());
}

#[test]
fn expiring_field_leaves_siblings_intact() {
    let (_store, pool) = common::start();
    let mut hash = HashMap::new(&pool, "hk_abc123_test_test_test_123abc_exp");
    hash.select_database(1);
    let ttl = Duration::from_millis(300);

    hash.set("bob", "email", "bob@zombo.com").expect("set");
    hash.set_expire("bob", "token", "123abc", ttl).expect("set expire");

    assert_eq!(hash.get("bob", "token").expect("get"), "123abc");
    assert!(hash.has("bob", "token").expect("has"));
    let mut keys = hash.keys("bob").expect("keys");
    keys.sort();
    assert_eq!(keys, vec!["email", "token"]);
    match hash.time_to_live("bob", "token").expect("ttl") {
        TtlStatus::ExpiresIn(remaining) => assert!(remaining > Duration::ZERO && remaining <= ttl),
        other => panic!("expected an expiration, got {other:?}"),
    }
    assert_eq!(hash.time_to_live("bob", "email").expect("ttl"), TtlStatus::NoExpiry);

    thread::sleep(Duration::from_millis(600));

    assert!(hash.get("bob", "token").expect_err("expired").is_not_found());
    assert!(!hash.has("bob", "token").expect("has"));
    assert_eq!(hash.get("bob", "email").expect("sibling"), "bob@zombo.com");
    assert_eq!(hash.keys("bob").expect("keys"), vec!["email"]);
    assert_eq!(hash.time_to_live("bob", "token").expect("ttl"), TtlStatus::Missing);

    hash.remove().expect("remove");
}

#[test]
fn set_replaces_expiring_field_and_vice_versa() {
    let (store, pool) = common::start();
    let hash = HashMap::new(&pool, "switch");

    hash.set_expire("bob", "token", "temporary", Duration::from_secs(60)).expect("set expire");
    hash.set("bob", "token", "permanent").expect("set");
    assert!(!store.keyspace().exists(0, "switch:bob:token"));
    assert_eq!(hash.get("bob", "token").expect("get"), "permanent");
    assert_eq!(hash.time_to_live("bob", "token").expect("ttl"), TtlStatus::NoExpiry);

    hash.set_expire("bob", "token", "temporary", Duration::from_secs(60)).expect("set expire");
    assert_eq!(hash.get("bob", "token").expect("get"), "temporary");
    assert_eq!(hash.keys("bob").expect("keys"), vec!["token"]);
    assert!(!store.keyspace().exists(0, "switch:bob"));
}

#[test]
fn rejected_set_expire_writes_nothing() {
    let (store, pool) = common::start();
    let hash = HashMap::new(&pool, "zero_ttl");

    hash.set("bob", "token", "permanent").expect("set");
    let err = hash.set_expire("bob", "token", "x", Duration::ZERO).expect_err("zero ttl");
    assert!(matches!(err, StoreError::InvalidValue { .. }));
    assert_eq!(hash.get("bob", "token").expect("value kept"), "permanent");
    assert_eq!(hash.time_to_live("bob", "token").expect("ttl"), TtlStatus::NoExpiry);

    assert!(matches!(
        hash.set_expire("alice", "token", "x", Duration::ZERO),
        Err(StoreError::InvalidValue { .. })
    ));
    assert_eq!(hash.all().expect("all"), vec!["bob"]);
    assert!(!hash.exists("alice").expect("exists"));
    assert!(!store.keyspace().exists(0, "zero_ttl:alice:token"));
}

#[test]
fn find_id_by_field_value() {
    let (_store, pool) = common::start();
    let mut hash = HashMap::new(&pool, "test_users_hashmap");
    hash.select_database(1);

    hash.set("user1", "email", "user1@example.com").expect("set");
    hash.set("user2", "email", "user2@example.com").expect("set");
    hash.set("user3", "email", "user3@example.com").expect("set");
    hash.set("user4", "name", "no email at all").expect("set");

    assert_eq!(
        hash.find_id_by_field_value("email", "user2@example.com").expect("find"),
        "user2"
    );
    assert!(matches!(
        hash.find_id_by_field_value("email", "nonexistent@example.com"),
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        hash.find_id_by_field_value("phone", "user2@example.com"),
        Err(StoreError::NotFound)
    ));

    hash.remove().expect("remove");
    assert!(matches!(
        hash.find_id_by_field_value("email", "user2@example.com"),
        Err(StoreError::NotFound)
    ));
}

#[test]
fn find_id_sees_expiring_fields() {
    let (_store, pool) = common::start();
    let hash = HashMap::new(&pool, "tokens");

    hash.set("alice", "token", "a-token").expect("set");
    hash.set_expire("bob", "token", "b-token", Duration::from_secs(60)).expect("set expire");

    assert_eq!(hash.find_id_by_field_value("token", "b-token").expect("find"), "bob");
}

#[test]
fn find_key_by_value() {
    let (_store, pool) = common::start();
    let hash = HashMap::new(&pool, "people");

    hash.set("bob", "email", "bob@zombo.com").expect("set");
    hash.set("bob", "username", "bob").expect("set");

    assert_eq!(hash.find_key_by_value("bob", "bob@zombo.com").expect("find"), "email");
    assert_eq!(hash.find_key_by_value("bob", "bob").expect("find"), "username");
    assert!(matches!(
        hash.find_key_by_value("bob", "alice@zombo.com"),
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        hash.find_key_by_value("nobody", "bob"),
        Err(StoreError::NotFound)
    ));
}

#[test]
fn del_key_keeps_registry_consistent() {
    let (_store, pool) = common::start();
    let hash = HashMap::new(&pool, "registry");

    hash.set("bob", "email", "bob@zombo.com").expect("set");
    hash.set_expire("bob", "token", "t", Duration::from_secs(60)).expect("set expire");

    hash.del_key("bob", "email").expect("del key");
    assert!(hash.exists("bob").expect("still has token"));

    hash.del_key("bob", "token").expect("del key");
    assert!(!hash.exists("bob").expect("no fields left"));
    assert!(hash.all().expect("all").is_empty());

    hash.del_key("bob", "token").expect("del of absent field");
}

#[test]
fn del_removes_one_element() {
    let (store, pool) = common::start();
    let hash = HashMap::new(&pool, "elements");

    hash.set("alice", "email", "alice@example.com").expect("set");
    hash.set("bob", "email", "bob@example.com").expect("set");
    hash.set_expire("bob", "token", "t", Duration::from_secs(60)).expect("set expire");

    hash.del("bob").expect("del");
    assert_eq!(hash.all().expect("all"), vec!["alice"]);
    assert!(hash.get("bob", "email").expect_err("gone").is_not_found());
    assert!(hash.get("bob", "token").expect_err("gone").is_not_found());
    assert!(!store.keyspace().exists(0, "elements:bob:token"));
    assert_eq!(hash.get("alice", "email").expect("kept"), "alice@example.com");
}

#[test]
fn remove_is_complete_and_idempotent() {
    let (store, pool) = common::start();
    let hash = HashMap::new(&pool, "everything");

    hash.set("a", "f", "1").expect("set");
    hash.set("b", "f", "2").expect("set");
    hash.set_expire("b", "g", "3", Duration::from_secs(60)).expect("set expire");

    hash.remove().expect("remove");
    assert!(hash.all().expect("all").is_empty());
    assert!(!hash.has("a", "f").expect("has"));
    assert!(hash.get("b", "g").expect_err("gone").is_not_found());
    assert_eq!(store.keyspace().dbsize(0), 0);

    hash.remove().expect("remove twice");
}
