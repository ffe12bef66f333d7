//! Error types for armory-workshop

use armory_core::ItemId;
use std::time::Duration;
use thiserror::Error;

/// Result type for armory-workshop operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in armory-workshop
#[derive(Debug, Error)]
pub enum Error {
    /// No item stored under this ID
    #[error("{0} not found")]
    ItemNotFound(ItemId),

    /// The actor has used up its mutation allowance
    #[error("{actor} is rate limited, retry in {}ms", retry_after.as_millis())]
    RateLimited {
        actor: String,
        retry_after: Duration,
    },

    /// Formula rejected by the evaluator
    #[error("invalid formula: {0}")]
    InvalidFormula(#[from] armory_core::Error),

    /// Workshop state lock was poisoned by a panicking writer
    #[error("workshop state lock poisoned")]
    LockPoisoned,
}

// Compile-time check that Error is Send + Sync for thread-safe error propagation.
// This function is never called but will fail to compile if the bound is not satisfied.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
