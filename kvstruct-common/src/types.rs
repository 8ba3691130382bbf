//! # Shared Types
//!
//! TTL reporting and the key-layout rules every data structure follows.
//!
//! ## Key Layout
//!
//! ```text
//! List / Set            name
//! KeyValue entry        name:key
//! HashMap registry      name
//! HashMap element       name:elementID            (hash of field -> value)
//! HashMap expiring      name:elementID:field      (string with its own TTL)
//! ```

use std::time::Duration;

use crate::error::{StoreError, StoreResult};

/// Default store address when none is given.
pub const DEFAULT_ADDR: &str = "127.0.0.1:6379";

/// Default store host when the address has no host part.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default store port when the address has no port.
pub const DEFAULT_PORT: u16 = 6379;

/// Reserved separator between the parts of a composite key.
pub const SEPARATOR: char = ':';

/// TTL state reported by the store, mirroring Redis semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    /// Key is missing or already expired.
    Missing,
    /// Key exists without expiration.
    NoExpiry,
    /// Key expires after the provided duration.
    ExpiresIn(Duration),
}

impl TtlStatus {
    /// Returns the remaining time when an expiration is attached.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            TtlStatus::ExpiresIn(remaining) => Some(*remaining),
            _ => None,
        }
    }
}

/// Joins key parts with the reserved separator.
pub fn compose_key(parts: &[&str]) -> String {
    let len = parts.iter().map(|part| part.len() + 1).sum();
    let mut key = String::with_capacity(len);
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            key.push(SEPARATOR);
        }
        key.push_str(part);
    }
    key
}

/// Rejects element IDs that contain the reserved separator.
pub fn validate_element_id(id: &str) -> StoreResult<()> {
    if id.contains(SEPARATOR) {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Escapes glob metacharacters so `text` matches itself in a `SCAN MATCH`.
pub fn escape_glob(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Builds a `SCAN MATCH` pattern for every key below `prefix:`.
pub fn prefix_pattern(parts: &[&str]) -> String {
    let mut pattern = String::new();
    for part in parts {
        pattern.push_str(&escape_glob(part));
        pattern.push(SEPARATOR);
    }
    pattern.push('*');
    pattern
}
