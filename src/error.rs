//! # Structured Error Handling
//!
//! Two error layers with very different blast radii:
//!
//! - [`StoreError`] covers durable-store trouble. It never leaves the
//!   subsystem: every storage failure is recovered locally by falling back
//!   to the in-memory mirror.
//! - [`ResilienceError`] is the public API error. The only variant callers
//!   will ever see is [`ResilienceError::InvalidKey`], which signals caller
//!   misuse rather than a transient fault and therefore fails fast.

use thiserror::Error;

/// Errors raised by the durable circuit store. Always recovered internally
/// via the fallback path, never surfaced through the service API.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The durable store is unreachable (connect, pool, TLS, I/O).
    #[error("storage connection error: {0}")]
    Connection(String),

    /// The store answered but the query failed.
    #[error("storage query error: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => StoreError::Connection(error.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

/// Public error type for the circuit breaker service.
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// Empty or malformed dependency name. The one error that propagates to
    /// callers: a bad key means the caller is holding the API wrong.
    #[error("invalid dependency name: {0}")]
    InvalidKey(String),

    /// Internal storage failure. Kept for completeness of the taxonomy;
    /// the decision path recovers from these instead of returning them.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration could not be loaded or validated.
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, ResilienceError>;
