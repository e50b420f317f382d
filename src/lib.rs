#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Resilience Core
//!
//! In-process circuit breaker library that protects calls to unreliable
//! downstream dependencies (external APIs, signing providers, RPC
//! endpoints) by tracking per-dependency health and short-circuiting calls
//! to dependencies in a failing state.
//!
//! ## Architecture
//!
//! Circuit records live in a PostgreSQL table shared by all process
//! instances, so breakers converge across a horizontally scaled fleet
//! (eventual, not linearizable, consistency). Every access to the durable
//! store is gated by a connection-health tracker; when the store is
//! unreachable the engine runs against a process-local in-memory mirror
//! with identical state-machine semantics. The resilience layer is itself
//! resilient: no storage failure ever reaches the caller's request path.
//!
//! ## Module Organization
//!
//! - [`resilience`] - State machine, background refresher, service façade
//! - [`database`] - Durable store, in-memory fallback, connection tracking
//! - [`events`] - Audit/observability reporter seam
//! - [`models`] - Circuit records and status snapshots
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`clock`] - Time source abstraction for deterministic timers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use resilience_core::{CircuitBreakerService, NoopReporter, ResilienceConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ResilienceConfig::from_env()?;
//! let service = CircuitBreakerService::connect(config, Arc::new(NoopReporter)).await?;
//!
//! let decision = service.should_allow_request("signing-provider").await?;
//! if !decision.allowed {
//!     // fail fast, queue, or surface retry-after - the caller's choice
//!     println!("circuit open, retry in {}ms", decision.remaining_time_ms);
//! }
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod resilience;
pub mod test_utils;

pub use clock::{Clock, SystemClock};
pub use config::{BreakerConfig, RefresherConfig, ResilienceConfig, StorageConfig};
pub use database::{CircuitStore, ConnectionHealthTracker, FallbackMemoryStore, PgCircuitStore};
pub use error::{ResilienceError, Result, StoreError};
pub use events::{
    BroadcastReporter, EventKind, EventReporter, EventSeverity, NoopReporter, TracingReporter,
};
pub use models::{
    CircuitDecision, CircuitRecord, CircuitState, CircuitStatus, ConnectionStatus,
};
pub use resilience::{BackgroundRefresher, CircuitBreakerEngine, CircuitBreakerService};
