//! Reporter trait and the always-safe default implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::constants;

/// Kinds of events the subsystem emits. Only state transitions and
/// storage-connection changes are reported, never individual reads/writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CircuitStateChanged,
    StorageConnectionDegraded,
    StorageConnectionRestored,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CircuitStateChanged => constants::events::CIRCUIT_STATE_CHANGED,
            EventKind::StorageConnectionDegraded => {
                constants::events::STORAGE_CONNECTION_DEGRADED
            }
            EventKind::StorageConnectionRestored => {
                constants::events::STORAGE_CONNECTION_RESTORED
            }
        }
    }
}

/// Severity attached to each reported event.
///
/// Mapping: transition to OPEN and storage degraded are high; transition to
/// HALF_OPEN or CLOSED and storage restored are medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Medium,
    High,
}

/// Fire-and-forget audit sink.
///
/// Implementations must not block and must swallow their own failures
/// (logging them at most). The engine awaits `report` inline on the
/// decision path, so a slow or throwing reporter would violate the
/// "broken breaker must not break the calls it protects" rule.
#[async_trait]
pub trait EventReporter: Send + Sync + std::fmt::Debug {
    async fn report(&self, kind: EventKind, details: Value, severity: EventSeverity);
}

/// Default reporter: drops everything. Keeps the engine free of any hard
/// dependency on a concrete audit backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

#[async_trait]
impl EventReporter for NoopReporter {
    async fn report(&self, _kind: EventKind, _details: Value, _severity: EventSeverity) {}
}

/// Reporter that maps severities onto structured log levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

#[async_trait]
impl EventReporter for TracingReporter {
    async fn report(&self, kind: EventKind, details: Value, severity: EventSeverity) {
        match severity {
            EventSeverity::High => {
                warn!(kind = kind.as_str(), %details, "circuit breaker event");
            }
            EventSeverity::Medium => {
                info!(kind = kind.as_str(), %details, "circuit breaker event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_strings_match_wire_constants() {
        assert_eq!(EventKind::CircuitStateChanged.as_str(), "circuit_state_changed");
        assert_eq!(
            EventKind::StorageConnectionDegraded.as_str(),
            "storage_connection_degraded"
        );
        assert_eq!(
            EventKind::StorageConnectionRestored.as_str(),
            "storage_connection_restored"
        );
    }

    #[tokio::test]
    async fn noop_reporter_accepts_anything() {
        NoopReporter
            .report(
                EventKind::CircuitStateChanged,
                json!({"dependency": "payments-api"}),
                EventSeverity::High,
            )
            .await;
    }
}
