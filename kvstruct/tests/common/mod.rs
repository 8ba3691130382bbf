use kvstruct::ConnectionPool;
use kvstruct_testkit::{init_tracing, MockStore};

/// Starts a private in-memory store and a pool pointed at it.
///
/// Keep the store alive for as long as the pool is used.
pub fn start() -> (MockStore, ConnectionPool) {
    init_tracing();
    let store = MockStore::start().expect("start mock store");
    let pool = ConnectionPool::with_host(&store.addr());
    (store, pool)
}
