//! # Connection Pool
//!
//! Purpose: Own every network resource the data structures use. Connections
//! are dialed lazily on first borrow, handed out per operation, and returned
//! for reuse when the borrow ends.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep a bounded set of reusable connections.
//! 2. **Minimal Locking**: Hold the mutex only while moving idle connections.
//! 3. **Caller-Owned**: A pool is an explicit value, never a process global;
//!    cloning shares the same connection set.
//! 4. **No Retries**: Dial, auth and transport failures go straight back to
//!    the caller; a broken connection is dropped, not repaired.

use std::collections::VecDeque;
use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, warn};

use kvstruct_common::{StoreError, StoreResult, DEFAULT_ADDR, DEFAULT_HOST, DEFAULT_PORT};

use crate::resp::{encode_command, read_response, RespValue};

/// Pool configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Store address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Password sent with AUTH after dialing.
    pub password: Option<String>,
    /// Maximum number of idle connections to keep.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use). `None` never refuses a
    /// borrow; with a cap, a borrow past it fails with `PoolExhausted`.
    pub max_total: Option<usize>,
    /// Idle connections older than this are closed instead of reused.
    pub idle_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            addr: DEFAULT_ADDR.to_string(),
            password: None,
            max_idle: 3,
            max_total: None,
            idle_timeout: Some(Duration::from_secs(240)),
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl PoolConfig {
    /// Builds a configuration from `[password@]host[:port]`.
    pub fn from_host(host: &str) -> Self {
        let (password, addr) = split_password(host);
        PoolConfig {
            addr: normalize_addr(addr),
            password: password.map(str::to_string),
            ..PoolConfig::default()
        }
    }
}

/// Splits `password@host` at the first `@`.
fn split_password(host: &str) -> (Option<&str>, &str) {
    match host.split_once('@') {
        Some((password, addr)) => (Some(password), addr),
        None => (None, host),
    }
}

/// Fills in the default host and port where the address leaves them out.
///
/// IPv6 literals are accepted bracketed (`[::1]:6380`, `[::1]`) or bare
/// (`::1`); a bare literal always gets the default port.
fn normalize_addr(addr: &str) -> String {
    let addr = addr.trim();
    if let Some(rest) = addr.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((_, "")) => format!("{addr}:{DEFAULT_PORT}"),
            _ => addr.to_string(),
        };
    }
    if addr.matches(':').count() > 1 {
        return format!("[{addr}]:{DEFAULT_PORT}");
    }
    let (host, port) = match addr.rsplit_once(':') {
        Some((host, port)) => (host.trim(), port.trim().to_string()),
        None => (addr, DEFAULT_PORT.to_string()),
    };
    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    format!("{host}:{port}")
}

struct IdleConnection {
    conn: Connection,
    since: Instant,
}

struct PoolState {
    idle: VecDeque<IdleConnection>,
    total: usize,
    closed: bool,
}

struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
}

/// Connection pool handle.
///
/// Cheap to clone; every clone shares the same connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionPool {
    /// Creates a pool targeting `127.0.0.1:6379`.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Creates a pool targeting `[password@]host[:port]`.
    pub fn with_host(host: &str) -> Self {
        Self::with_config(PoolConfig::from_host(host))
    }

    /// Creates a pool targeting `host` and authenticating with `password`.
    pub fn with_host_password(host: &str, password: &str) -> Self {
        let mut config = PoolConfig::from_host(host);
        config.password = Some(password.to_string());
        Self::with_config(config)
    }

    /// Creates a pool with a custom configuration. Nothing is dialed yet.
    pub fn with_config(config: PoolConfig) -> Self {
        let state = PoolState {
            idle: VecDeque::with_capacity(config.max_idle),
            total: 0,
            closed: false,
        };
        ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(state),
            }),
        }
    }

    /// Returns the configuration the pool dials with.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Borrows a connection bound to logical database `db_index`.
    pub fn get(&self, db_index: u32) -> StoreResult<PooledConnection> {
        let mut conn = self.acquire()?;
        conn.select(db_index)?;
        Ok(conn)
    }

    /// Sends PING and expects PONG.
    pub fn ping(&self) -> StoreResult<()> {
        let mut conn = self.acquire()?;
        let reply = conn.exec(&["PING"])?.into_status()?;
        if reply != "PONG" {
            return Err(StoreError::UnexpectedResponse);
        }
        Ok(())
    }

    /// Closes idle connections and refuses new borrows. Idempotent.
    ///
    /// Connections still borrowed are closed when their borrow ends.
    pub fn close(&self) {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        if state.closed {
            return;
        }
        state.closed = true;
        let dropped = state.idle.len();
        state.total = state.total.saturating_sub(dropped);
        state.idle.clear();
        debug!(addr = %self.inner.config.addr, dropped, "connection pool closed");
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().expect("pool mutex poisoned").closed
    }

    fn acquire(&self) -> StoreResult<PooledConnection> {
        if let Some(conn) = self.pop_idle()? {
            return Ok(PooledConnection::new(self.inner.clone(), conn));
        }

        if !self.try_reserve()? {
            return Err(StoreError::PoolExhausted);
        }

        match Connection::connect(&self.inner.config) {
            Ok(conn) => Ok(PooledConnection::new(self.inner.clone(), conn)),
            Err(err) => {
                self.release_slot();
                Err(err)
            }
        }
    }

    fn pop_idle(&self) -> StoreResult<Option<Connection>> {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        if state.closed {
            return Err(StoreError::PoolClosed);
        }
        while let Some(entry) = state.idle.pop_front() {
            match self.inner.config.idle_timeout {
                Some(timeout) if entry.since.elapsed() > timeout => {
                    debug!("discarding stale idle connection");
                    state.total = state.total.saturating_sub(1);
                }
                _ => return Ok(Some(entry.conn)),
            }
        }
        Ok(None)
    }

    fn try_reserve(&self) -> StoreResult<bool> {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        if state.closed {
            return Err(StoreError::PoolClosed);
        }
        if let Some(max_total) = self.inner.config.max_total {
            if state.total >= max_total {
                return Ok(false);
            }
        }
        state.total += 1;
        Ok(true)
    }

    fn release_slot(&self) {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        state.total = state.total.saturating_sub(1);
    }

    fn return_connection(&self, conn: Connection) {
        let mut state = self.inner.state.lock().expect("pool mutex poisoned");
        if !state.closed && state.idle.len() < self.inner.config.max_idle {
            state.idle.push_back(IdleConnection {
                conn,
                since: Instant::now(),
            });
        } else {
            state.total = state.total.saturating_sub(1);
        }
    }
}

/// Dials `127.0.0.1:6379`, pings and closes again.
pub fn test_connection() -> StoreResult<()> {
    test_connection_host(DEFAULT_ADDR)
}

/// Dials `[password@]host[:port]`, pings and closes again.
pub fn test_connection_host(host: &str) -> StoreResult<()> {
    let pool = ConnectionPool::with_host(host);
    let result = pool.ping();
    pool.close();
    result
}

/// RAII wrapper returning a connection to the pool on drop.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    valid: bool,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: Connection) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            valid: true,
        }
    }

    /// Logical database the connection currently addresses.
    pub fn db_index(&self) -> u32 {
        self.conn.as_ref().map_or(0, |conn| conn.db)
    }

    /// Executes a RESP command and returns the parsed reply.
    ///
    /// Error replies are returned as `RespValue::Error`; only transport and
    /// framing failures are `Err`, and they retire the connection.
    pub fn exec<A: AsRef<[u8]>>(&mut self, args: &[A]) -> StoreResult<RespValue> {
        let conn = self.conn.as_mut().ok_or(StoreError::PoolClosed)?;
        let response = conn.exec(args);
        if let Err(err) = &response {
            warn!(error = %err, "dropping broken connection");
            self.valid = false;
        }
        response
    }

    fn select(&mut self, db_index: u32) -> StoreResult<()> {
        if self.db_index() == db_index {
            return Ok(());
        }
        let index = db_index.to_string();
        self.exec(&["SELECT", index.as_str()])?.into_status()?;
        if let Some(conn) = self.conn.as_mut() {
            conn.db = db_index;
        }
        debug!(db_index, "selected database");
        Ok(())
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => return,
        };

        let pool = ConnectionPool {
            inner: self.pool.clone(),
        };

        if self.valid {
            pool.return_connection(conn);
        } else {
            pool.release_slot();
        }
    }
}

/// Single TCP connection with reusable buffers.
struct Connection {
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
    db: u32,
}

impl Connection {
    fn connect(config: &PoolConfig) -> StoreResult<Self> {
        debug!(addr = %config.addr, "dialing store");
        let stream = connect_stream(config)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;

        let mut conn = Connection {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
            db: 0,
        };

        if let Some(password) = config.password.as_deref() {
            conn.authenticate(password)?;
        }
        Ok(conn)
    }

    fn authenticate(&mut self, password: &str) -> StoreResult<()> {
        match self.exec(&["AUTH", password])? {
            RespValue::Simple(_) => {
                debug!("authenticated");
                Ok(())
            }
            RespValue::Error(message) => Err(StoreError::Auth { message }),
            _ => Err(StoreError::UnexpectedResponse),
        }
    }

    fn exec<A: AsRef<[u8]>>(&mut self, args: &[A]) -> StoreResult<RespValue> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        read_response(&mut self.reader, &mut self.line_buf)
    }
}

fn connect_stream(config: &PoolConfig) -> StoreResult<TcpStream> {
    let addrs: Vec<SocketAddr> = config
        .addr
        .to_socket_addrs()
        .map_err(|_| StoreError::InvalidAddress(config.addr.clone()))?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        let attempt = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }

    match last_err {
        Some(source) => Err(StoreError::Connect {
            addr: config.addr.clone(),
            source,
        }),
        None => Err(StoreError::InvalidAddress(config.addr.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_local_store() {
        let config = PoolConfig::default();
        assert_eq!(config.addr, "127.0.0.1:6379");
        assert_eq!(config.password, None);
        assert_eq!(config.max_idle, 3);
        assert_eq!(config.max_total, None);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(240)));
    }

    #[test]
    fn strips_password_before_first_at() {
        let config = PoolConfig::from_host("foobared@localhost:6379");
        assert_eq!(config.password.as_deref(), Some("foobared"));
        assert_eq!(config.addr, "localhost:6379");

        let config = PoolConfig::from_host("p@ss@redis:7000");
        assert_eq!(config.password.as_deref(), Some("p"));
        assert_eq!(config.addr, "ss@redis:7000");
    }

    #[test]
    fn fills_in_default_host_and_port() {
        assert_eq!(PoolConfig::from_host(":6379").addr, "127.0.0.1:6379");
        assert_eq!(PoolConfig::from_host("foobared@ :6380").addr, "127.0.0.1:6380");
        assert_eq!(PoolConfig::from_host("redishost").addr, "redishost:6379");
        assert_eq!(PoolConfig::from_host("").addr, "127.0.0.1:6379");
    }

    #[test]
    fn ipv6_hosts_keep_their_colons() {
        assert_eq!(PoolConfig::from_host("::1").addr, "[::1]:6379");
        assert_eq!(PoolConfig::from_host("[::1]").addr, "[::1]:6379");
        assert_eq!(PoolConfig::from_host("[::1]:6380").addr, "[::1]:6380");
        let config = PoolConfig::from_host("foobared@fe80::1");
        assert_eq!(config.password.as_deref(), Some("foobared"));
        assert_eq!(config.addr, "[fe80::1]:6379");
    }

    #[test]
    fn explicit_password_overrides_embedded_one() {
        let pool = ConnectionPool::with_host_password("old@localhost", "new");
        assert_eq!(pool.config().password.as_deref(), Some("new"));
        assert_eq!(pool.config().addr, "localhost:6379");
    }

    #[test]
    fn closed_pool_refuses_borrows() {
        let pool = ConnectionPool::with_host("127.0.0.1:1");
        pool.close();
        pool.close();
        assert!(pool.is_closed());
        assert!(matches!(pool.get(0), Err(StoreError::PoolClosed)));
    }
}
