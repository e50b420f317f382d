//! Broadcast-backed reporter for hosts that want to consume the event
//! stream in-process (dashboards, test assertions, bridging to an external
//! audit service).

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use super::reporter::{EventKind, EventReporter, EventSeverity};

/// Event as delivered to broadcast subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct ReportedEvent {
    pub kind: EventKind,
    pub severity: EventSeverity,
    pub details: Value,
    pub reported_at: chrono::DateTime<chrono::Utc>,
}

/// High-throughput reporter fanning events out over a tokio broadcast
/// channel. Lossy by design: slow subscribers miss events rather than
/// backpressuring the breaker.
#[derive(Debug, Clone)]
pub struct BroadcastReporter {
    sender: broadcast::Sender<ReportedEvent>,
}

impl BroadcastReporter {
    /// Create a reporter with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ReportedEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastReporter {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl EventReporter for BroadcastReporter {
    async fn report(&self, kind: EventKind, details: Value, severity: EventSeverity) {
        let event = ReportedEvent {
            kind,
            severity,
            details,
            reported_at: chrono::Utc::now(),
        };

        // send() errors only when there are no subscribers, which is
        // acceptable: events are emitted whether or not anyone listens.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn delivers_events_to_subscribers() {
        let reporter = BroadcastReporter::new(16);
        let mut rx = reporter.subscribe();

        reporter
            .report(
                EventKind::CircuitStateChanged,
                json!({"dependency": "payments-api", "to": "OPEN"}),
                EventSeverity::High,
            )
            .await;

        let event = rx.recv().await.expect("event should be delivered");
        assert_eq!(event.kind, EventKind::CircuitStateChanged);
        assert_eq!(event.severity, EventSeverity::High);
        assert_eq!(event.details["dependency"], "payments-api");
    }

    #[tokio::test]
    async fn reporting_without_subscribers_is_fine() {
        let reporter = BroadcastReporter::new(4);
        assert_eq!(reporter.subscriber_count(), 0);
        reporter
            .report(EventKind::StorageConnectionDegraded, json!({}), EventSeverity::High)
            .await;
    }
}
