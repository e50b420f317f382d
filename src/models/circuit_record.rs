//! Per-dependency circuit record and the snapshot types derived from it.
//!
//! Maps to the `circuit_breaker_state` table - one row per dependency name.
//! The record carries lifetime counters (monotonically increasing) plus the
//! timestamp of the last state transition, which anchors the recovery
//! countdown while the circuit is OPEN.

use serde::{Deserialize, Serialize};

/// Circuit breaker states representing the current operational mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation - calls are allowed through
    Closed,
    /// Failure mode - calls are short-circuited until the recovery timeout
    Open,
    /// Testing recovery - a limited number of trial calls are admitted
    HalfOpen,
}

impl CircuitState {
    /// Text form persisted in the durable store.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }

    /// Parse the persisted text form. Unknown values default to CLOSED:
    /// a corrupt row must not manufacture a false outage.
    pub fn parse(value: &str) -> Self {
        match value {
            "OPEN" => CircuitState::Open,
            "HALF_OPEN" => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One circuit record per dependency name, keyed by name.
///
/// Invariant: `failure_count + success_count == total_count` and
/// `failure_rate == failure_count / max(total_count, 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitRecord {
    pub service_name: String,
    pub state: CircuitState,
    /// Lifetime cumulative failure ratio in `[0, 1]`.
    pub failure_rate: f64,
    /// Epoch-ms of the last state transition.
    pub timestamp: i64,
    pub success_count: i64,
    pub failure_count: i64,
    pub total_count: i64,
    /// Trial calls admitted since entering HALF_OPEN. Reset to 0 on every
    /// transition into HALF_OPEN. A dedicated field: the fallback path must
    /// never reuse a remaining-time value as a trial counter.
    pub half_open_trial_count: i32,
}

impl CircuitRecord {
    /// Fresh CLOSED record for a never-seen dependency.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            state: CircuitState::Closed,
            failure_rate: 0.0,
            timestamp: 0,
            success_count: 0,
            failure_count: 0,
            total_count: 0,
            half_open_trial_count: 0,
        }
    }

    /// `failure_count / max(total_count, 1)`.
    pub fn computed_failure_rate(&self) -> f64 {
        self.failure_count as f64 / std::cmp::max(self.total_count, 1) as f64
    }

    /// Milliseconds left on the recovery countdown; 0 unless the circuit is
    /// OPEN with time still on the clock.
    pub fn remaining_time_ms(&self, now_ms: i64, recovery_timeout_ms: i64) -> i64 {
        match self.state {
            CircuitState::Open => std::cmp::max(0, recovery_timeout_ms - (now_ms - self.timestamp)),
            _ => 0,
        }
    }
}

/// Decision returned to callers asking whether a request may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CircuitDecision {
    pub allowed: bool,
    pub state: CircuitState,
    /// Milliseconds until the next trial is permitted; 0 when `allowed`.
    pub remaining_time_ms: i64,
}

/// Observable per-dependency snapshot (dashboard shape).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitStatus {
    pub state: CircuitState,
    pub failure_rate: f64,
    pub timestamp: i64,
    pub remaining_time_ms: i64,
}

/// Durable-store connection health as seen by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    /// Epoch-ms of the last connection attempt, if any.
    pub last_connection_attempt: Option<i64>,
    pub consecutive_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_text() {
        for state in [CircuitState::Closed, CircuitState::Open, CircuitState::HalfOpen] {
            assert_eq!(CircuitState::parse(state.as_str()), state);
        }
    }

    #[test]
    fn unknown_state_text_defaults_to_closed() {
        assert_eq!(CircuitState::parse("EXPLODED"), CircuitState::Closed);
        assert_eq!(CircuitState::parse(""), CircuitState::Closed);
    }

    #[test]
    fn new_record_starts_closed_with_zeroed_counters() {
        let record = CircuitRecord::new("payments-api");
        assert_eq!(record.state, CircuitState::Closed);
        assert_eq!(record.total_count, 0);
        assert_eq!(record.computed_failure_rate(), 0.0);
    }

    #[test]
    fn remaining_time_counts_down_only_while_open() {
        let mut record = CircuitRecord::new("rpc");
        record.state = CircuitState::Open;
        record.timestamp = 1_000;

        assert_eq!(record.remaining_time_ms(1_000, 30_000), 30_000);
        assert_eq!(record.remaining_time_ms(30_999, 30_000), 1);
        assert_eq!(record.remaining_time_ms(31_001, 30_000), 0);

        record.state = CircuitState::Closed;
        assert_eq!(record.remaining_time_ms(1_000, 30_000), 0);
    }

    #[test]
    fn failure_rate_divides_by_at_least_one() {
        let record = CircuitRecord::new("empty");
        assert_eq!(record.computed_failure_rate(), 0.0);

        let mut record = CircuitRecord::new("half");
        record.success_count = 1;
        record.failure_count = 1;
        record.total_count = 2;
        assert_eq!(record.computed_failure_rate(), 0.5);
    }
}
