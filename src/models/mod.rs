//! # Data Model
//!
//! Record and status types shared by the durable store, the in-memory
//! fallback, and the engine. One [`CircuitRecord`] exists per protected
//! dependency; it is created implicitly on first use and never deleted.

pub mod circuit_record;

pub use circuit_record::{
    CircuitDecision, CircuitRecord, CircuitState, CircuitStatus, ConnectionStatus,
};
