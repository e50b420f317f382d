//! # Storage Layer
//!
//! Dual-backend persistence for circuit records: a shared PostgreSQL store
//! behind the [`CircuitStore`] trait, a process-local
//! [`FallbackMemoryStore`] mirror, and the [`ConnectionHealthTracker`] that
//! decides which of the two is usable at any moment.

pub mod connection;
pub mod fallback;
pub mod store;

pub use connection::ConnectionHealthTracker;
pub use fallback::FallbackMemoryStore;
pub use store::{CircuitStore, PgCircuitStore};
