mod common;

use kvstruct::{Set, SetStore};

#[test]
fn membership_follows_add_and_del() {
    let (_store, pool) = common::start();
    let set = Set::new(&pool, "members");

    for member in ["alice", "bob", ""] {
        assert!(!set.has(member).expect("has before add"));
        set.add(member).expect("add");
        assert!(set.has(member).expect("has after add"));
        set.del(member).expect("del");
        assert!(!set.has(member).expect("has after del"));
    }
}

#[test]
fn members_are_unique() {
    let (_store, pool) = common::start();
    let set = Set::new(&pool, "unique");

    for member in ["a", "b", "a", "c", "b"] {
        set.add(member).expect("add");
    }
    let mut all = set.all().expect("all");
    all.sort();
    assert_eq!(all, vec!["a", "b", "c"]);
    assert_eq!(set.size().expect("size"), 3);
}

#[test]
fn del_of_absent_member_is_a_no_op() {
    let (_store, pool) = common::start();
    let set = Set::new(&pool, "sparse");
    set.add("kept").expect("add");

    set.del("never added").expect("del");
    assert_eq!(set.all().expect("all"), vec!["kept"]);
}

#[test]
fn clear_and_remove_leave_nothing_behind() {
    let (store, pool) = common::start();
    let set = Set::new(&pool, "to_clear");
    set.add("x").expect("add");
    set.add("y").expect("add");

    set.clear().expect("clear");
    assert!(set.all().expect("all").is_empty());
    assert!(!set.has("x").expect("has"));

    set.add("z").expect("add");
    set.remove().expect("remove");
    set.remove().expect("remove twice");
    assert!(!store.keyspace().exists(0, "to_clear"));
}
