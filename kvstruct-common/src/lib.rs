// kvstruct-common - Shared types for the kvstruct client and data structures
//
// This crate defines the error taxonomy, TTL reporting and key layout rules

pub mod error;
pub mod types;

// Re-export for convenience
pub use error::*;
pub use types::*;
