mod common;

use std::thread;

use kvstruct::{
    test_connection_host, ConnectionPool, KeyValue, KeyValueStore, List, ListStore, PoolConfig,
    StoreError,
};
use kvstruct_testkit::{init_tracing, MockStore};

#[test]
fn password_protected_store() {
    init_tracing();
    let store = MockStore::start_with_password("s3cret").expect("start mock store");

    let pool = ConnectionPool::with_host_password(&store.addr(), "s3cret");
    let kv = KeyValue::new(&pool, "auth");
    kv.set("k", "v").expect("set");
    assert_eq!(kv.get("k").expect("get"), "v");

    let inline = ConnectionPool::with_host(&format!("s3cret@{}", store.addr()));
    assert_eq!(KeyValue::new(&inline, "auth").get("k").expect("get"), "v");

    let wrong = ConnectionPool::with_host_password(&store.addr(), "nope");
    let err = KeyValue::new(&wrong, "auth").get("k").expect_err("wrong password");
    assert!(matches!(err, StoreError::Auth { .. }), "got {err:?}");

    let none = ConnectionPool::with_host(&store.addr());
    let err = KeyValue::new(&none, "auth").get("k").expect_err("no password");
    assert!(matches!(err, StoreError::Auth { .. }), "got {err:?}");
}

#[test]
fn test_connection_reports_reachability() {
    let (store, _pool) = common::start();
    test_connection_host(&store.addr()).expect("reachable");

    let err = test_connection_host("127.0.0.1:1").expect_err("unreachable");
    assert!(err.is_connection_error(), "got {err:?}");
}

#[test]
fn closed_pool_refuses_operations() {
    let (_store, pool) = common::start();
    let list = List::new(&pool, "closing");
    list.add("before").expect("add");

    pool.close();
    pool.close();
    assert!(pool.is_closed());
    assert!(matches!(list.all(), Err(StoreError::PoolClosed)));
    assert!(matches!(pool.ping(), Err(StoreError::PoolClosed)));
}

#[test]
fn clones_share_one_pool() {
    let (_store, pool) = common::start();
    let clone = pool.clone();
    List::new(&clone, "shared").add("x").expect("add");
    assert_eq!(List::new(&pool, "shared").get_last().expect("last"), "x");

    clone.close();
    assert!(pool.is_closed());
}

#[test]
fn default_pool_serves_many_concurrent_borrows() {
    let (_store, pool) = common::start();

    let held = (0..80)
        .map(|_| pool.get(0))
        .collect::<Result<Vec<_>, _>>()
        .expect("borrow past the old fixed cap");
    List::new(&pool, "busy").add("still served").expect("add while borrowed");
    drop(held);

    let workers: Vec<_> = (0..16)
        .map(|worker| {
            let pool = pool.clone();
            thread::spawn(move || {
                let list = List::new(&pool, &format!("worker_{worker}"));
                for item in 0..20 {
                    list.add(&item.to_string()).expect("add");
                }
                list.size().expect("size")
            })
        })
        .collect();
    for worker in workers {
        assert_eq!(worker.join().expect("worker thread"), 20);
    }
}

#[test]
fn explicit_cap_fails_fast() {
    let (store, _pool) = common::start();
    let pool = ConnectionPool::with_config(PoolConfig {
        max_total: Some(2),
        ..PoolConfig::from_host(&store.addr())
    });

    let first = pool.get(0).expect("first");
    let second = pool.get(0).expect("second");
    assert!(matches!(pool.get(0), Err(StoreError::PoolExhausted)));

    drop(first);
    pool.get(0).expect("slot returned");
    drop(second);
}
