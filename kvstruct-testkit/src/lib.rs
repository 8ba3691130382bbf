//! # kvstruct Testkit
//!
//! Purpose: Run the kvstruct integration tests without an external store.
//! `MockStore` serves an in-memory keyspace over RESP2 on an ephemeral
//! loopback port, speaking the command subset the client issues.
//!
//! ## Usage
//!
//! - `MockStore::start()` for an open store, `MockStore::start_with_password`
//!   to require AUTH.
//! - Every store owns its own keyspace, so tests never share state.
//! - Call `init_tracing()` to see client and server logs under `RUST_LOG`.

mod engine;
mod glob;
mod protocol;
mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

pub use engine::{EngineError, Keyspace};
pub use glob::glob_match;

use crate::server::{serve, Shared};

/// Handle to a running in-memory store.
///
/// The server thread lives until the test process exits.
pub struct MockStore {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl MockStore {
    /// Starts a store that accepts unauthenticated clients.
    pub fn start() -> anyhow::Result<Self> {
        Self::launch(None)
    }

    /// Starts a store that requires `AUTH password` before any command.
    pub fn start_with_password(password: &str) -> anyhow::Result<Self> {
        Self::launch(Some(password.to_string()))
    }

    fn launch(password: Option<String>) -> anyhow::Result<Self> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").context("bind mock store")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let shared = Arc::new(Shared {
            keyspace: Keyspace::new(),
            password,
        });
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("build mock store runtime")?;

        let server_shared = shared.clone();
        std::thread::Builder::new()
            .name(format!("mock-store-{}", addr.port()))
            .spawn(move || {
                runtime.block_on(async move {
                    match tokio::net::TcpListener::from_std(listener) {
                        Ok(listener) => serve(listener, server_shared).await,
                        Err(err) => error!(error = %err, "mock store listener failed"),
                    }
                })
            })
            .context("spawn mock store thread")?;

        debug!(%addr, "mock store listening");
        Ok(MockStore { addr, shared })
    }

    /// Address in `host:port` form.
    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Direct access to the stored data, for asserting on key layout.
    pub fn keyspace(&self) -> &Keyspace {
        &self.shared.keyspace
    }
}

/// Installs a fmt subscriber filtered by `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
