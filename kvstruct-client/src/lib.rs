//! # kvstruct Client
//!
//! Purpose: Provide a lightweight, synchronous Redis-compatible client with
//! connection pooling, exposing the primitive commands the kvstruct data
//! structures are built from.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Reuse TCP connections to avoid repeated connects.
//! 2. **Lazy Dialing**: Constructing a pool never touches the network.
//! 3. **Minimal Allocation**: Reuse buffers for RESP framing and parsing.
//! 4. **Protocol Clarity**: Encode/parse RESP2 explicitly for correctness.
//!
//! ## Usage
//!
//! ```no_run
//! use kvstruct_client::ConnectionPool;
//!
//! let pool = ConnectionPool::with_host("foobared@localhost:6379");
//! pool.ping()?;
//! let mut conn = pool.get(1)?;
//! conn.set("greeting", "hello")?;
//! assert_eq!(conn.get("greeting")?.as_deref(), Some("hello"));
//! drop(conn);
//! pool.close();
//! # Ok::<(), kvstruct_common::StoreError>(())
//! ```

mod commands;
mod pool;
mod resp;

pub use kvstruct_common::{StoreError, StoreResult, TtlStatus};
pub use pool::{test_connection, test_connection_host, ConnectionPool, PoolConfig, PooledConnection};
pub use resp::RespValue;
