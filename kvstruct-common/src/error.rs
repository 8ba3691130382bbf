//! # Error Taxonomy
//!
//! Purpose: One error type shared by the pool, the primitive commands and the
//! typed data structures built on top of them.
//!
//! ## Design Principles
//! 1. **Distinguished Sentinel**: `NotFound` is a unit variant so callers can
//!    branch on it with `matches!` instead of comparing strings.
//! 2. **Classify Once**: Server error replies are mapped to variants in a
//!    single place (`StoreError::from_server`).
//! 3. **Passthrough**: Transport and protocol failures are surfaced unchanged.

use std::io;

use thiserror::Error;

/// Result type used by every fallible kvstruct operation.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the pool, the commands and the data structures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// TCP connection to the backing store could not be established.
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The store rejected the credentials, or requires them.
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Address could not be resolved into a socket address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Pool is at capacity and no idle connections are available.
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// The pool was closed; no further connections are handed out.
    #[error("connection pool is closed")]
    PoolClosed,

    /// Key, field or element is absent.
    #[error("not found")]
    NotFound,

    /// Stored value cannot be used for the requested operation.
    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    /// Element ID contains the reserved separator.
    #[error("invalid element id {0:?}: must not contain ':'")]
    InvalidId(String),

    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// RESP2 framing or parse error.
    #[error("protocol error")]
    Protocol,

    /// Response type did not match the expected command response.
    #[error("unexpected response")]
    UnexpectedResponse,

    /// Any other error reply from the store.
    #[error("server error: {message}")]
    Server { message: String },
}

impl StoreError {
    /// Maps an error reply (without the leading `-`) onto a variant.
    pub fn from_server(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.starts_with("NOAUTH")
            || message.starts_with("WRONGPASS")
            || message.contains("invalid password")
        {
            return StoreError::Auth { message };
        }
        if message.contains("not an integer")
            || message.contains("not a valid float")
            || message.contains("would overflow")
        {
            return StoreError::InvalidValue { message };
        }
        StoreError::Server { message }
    }

    /// Returns true for the lookup-miss sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    /// Returns true when the pool could not supply a usable connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            StoreError::Connect { .. }
                | StoreError::Auth { .. }
                | StoreError::InvalidAddress(_)
                | StoreError::PoolExhausted
                | StoreError::PoolClosed
        )
    }
}
