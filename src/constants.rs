//! # System Constants
//!
//! Core constants that define the operational boundaries of the circuit
//! breaker subsystem. These are the compiled-in defaults; deployments can
//! override the tunable ones through [`crate::config::ResilienceConfig`].

/// Failure ratio at or above which a CLOSED circuit opens.
pub const FAILURE_THRESHOLD: f64 = 0.5;

/// Minimum time a circuit stays OPEN before trial calls are permitted again.
pub const RECOVERY_TIMEOUT_MS: i64 = 30_000;

/// Number of trial calls admitted while a circuit is HALF_OPEN.
pub const HALF_OPEN_MAX_TRIALS: i32 = 3;

/// Cooldown between durable-store reconnection attempts.
pub const RECONNECT_COOLDOWN_MS: i64 = 5_000;

/// Default interval for the background status refresher.
pub const REFRESH_INTERVAL_MS: u64 = 60_000;

/// Storage-degraded events are emitted on the 1st consecutive failure and
/// every Nth thereafter (log-throttling, the store may flap for a while).
pub const DEGRADED_EVENT_EVERY: u64 = 10;

/// Upper bound on dependency names accepted at the API boundary.
pub const MAX_DEPENDENCY_NAME_LEN: usize = 255;

/// Event kinds emitted toward the audit/observability collaborator.
pub mod events {
    pub const CIRCUIT_STATE_CHANGED: &str = "circuit_state_changed";
    pub const STORAGE_CONNECTION_DEGRADED: &str = "storage_connection_degraded";
    pub const STORAGE_CONNECTION_RESTORED: &str = "storage_connection_restored";
}
