//! Connection health tracking for the durable store.
//!
//! Gates every durable-store access behind a liveness check with a
//! reconnect cooldown, so a dead database costs one probe per cooldown
//! window instead of a retry storm per request. The tracker is the only
//! mutator of the connection state.

use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::constants::DEGRADED_EVENT_EVERY;
use crate::database::store::CircuitStore;
use crate::error::StoreError;
use crate::events::{EventKind, EventReporter, EventSeverity};
use crate::models::ConnectionStatus;

#[derive(Debug)]
struct ConnectionState {
    is_connected: bool,
    last_attempt_ms: Option<i64>,
    consecutive_failures: u64,
}

/// Tracks whether the durable store is reachable and throttles
/// reconnection attempts.
#[derive(Debug, Clone)]
pub struct ConnectionHealthTracker {
    store: Arc<dyn CircuitStore>,
    state: Arc<Mutex<ConnectionState>>,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn EventReporter>,
    cooldown_ms: i64,
}

impl ConnectionHealthTracker {
    pub fn new(
        store: Arc<dyn CircuitStore>,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn EventReporter>,
        cooldown_ms: i64,
    ) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(ConnectionState {
                is_connected: false,
                last_attempt_ms: None,
                consecutive_failures: 0,
            })),
            clock,
            reporter,
            cooldown_ms,
        }
    }

    /// Probe the durable store unless a probe ran within the cooldown, in
    /// which case the cached verdict is returned. Ensures the schema exists
    /// before the liveness check. Never returns an error: an unreachable
    /// store is an answer (`false`), not a failure.
    pub async fn ensure_connection(&self) -> bool {
        // Holding the lock across the probe serializes concurrent
        // reconnect attempts onto a single probe.
        let mut state = self.state.lock().await;
        let now = self.clock.now_ms();

        if let Some(last) = state.last_attempt_ms {
            if now - last < self.cooldown_ms {
                return state.is_connected;
            }
        }
        state.last_attempt_ms = Some(now);

        let probe = async {
            self.store.ensure_schema().await?;
            self.store.ping().await
        }
        .await;

        match probe {
            Ok(()) => {
                let was_failing = !state.is_connected && state.consecutive_failures > 0;
                if was_failing {
                    info!(
                        failed_attempts = state.consecutive_failures,
                        "🟢 Durable circuit store restored"
                    );
                    self.reporter
                        .report(
                            EventKind::StorageConnectionRestored,
                            json!({ "failed_attempts": state.consecutive_failures }),
                            EventSeverity::Medium,
                        )
                        .await;
                }
                state.is_connected = true;
                state.consecutive_failures = 0;
                true
            }
            Err(error) => {
                state.is_connected = false;
                state.consecutive_failures += 1;
                let failures = state.consecutive_failures;

                if failures == 1 || failures % DEGRADED_EVENT_EVERY == 0 {
                    warn!(
                        consecutive_failures = failures,
                        error = %error,
                        "🔴 Durable circuit store unreachable, using in-memory fallback"
                    );
                    self.reporter
                        .report(
                            EventKind::StorageConnectionDegraded,
                            json!({
                                "consecutive_failures": failures,
                                "error": error.to_string(),
                            }),
                            EventSeverity::High,
                        )
                        .await;
                } else {
                    debug!(
                        consecutive_failures = failures,
                        error = %error,
                        "durable circuit store still unreachable"
                    );
                }
                false
            }
        }
    }

    /// Administrative reset: clear the cooldown and cached verdict, then
    /// re-probe asynchronously. Fire-and-forget; returns immediately.
    pub fn force_reconnect(&self) -> bool {
        info!("🔄 Forced durable store reconnect requested");
        let tracker = self.clone();
        tokio::spawn(async move {
            {
                let mut state = tracker.state.lock().await;
                state.last_attempt_ms = None;
                state.is_connected = false;
            }
            tracker.ensure_connection().await;
        });
        true
    }

    pub async fn status(&self) -> ConnectionStatus {
        let state = self.state.lock().await;
        ConnectionStatus {
            is_connected: state.is_connected,
            last_connection_attempt: state.last_attempt_ms,
            consecutive_failures: state.consecutive_failures,
        }
    }

    /// Run `operation` against the durable store if it is reachable; on an
    /// unreachable store or any operation error, produce the result from
    /// `fallback` instead. Never propagates an error to the caller.
    pub async fn guarded<T, F, Fut, G>(&self, operation: F, fallback: G) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
        G: FnOnce() -> T,
    {
        if !self.ensure_connection().await {
            return fallback();
        }

        match operation().await {
            Ok(value) => value,
            Err(error) => {
                if matches!(error, StoreError::Connection(_)) {
                    let mut state = self.state.lock().await;
                    state.is_connected = false;
                }
                warn!(error = %error, "durable store operation failed, using fallback");
                fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::test_utils::{CollectingReporter, FlakyStore};

    fn tracker_with(
        store: Arc<FlakyStore>,
        clock: Arc<ManualClock>,
        reporter: Arc<CollectingReporter>,
    ) -> ConnectionHealthTracker {
        ConnectionHealthTracker::new(store, clock, reporter, 5_000)
    }

    #[tokio::test]
    async fn caches_the_verdict_within_the_cooldown() {
        let store = Arc::new(FlakyStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let reporter = Arc::new(CollectingReporter::default());
        let tracker = tracker_with(store.clone(), clock.clone(), reporter.clone());

        assert!(tracker.ensure_connection().await);
        store.set_available(false);

        // Still inside the cooldown: cached `true` without re-probing.
        clock.advance(4_999);
        assert!(tracker.ensure_connection().await);

        clock.advance(2);
        assert!(!tracker.ensure_connection().await);
    }

    #[tokio::test]
    async fn degraded_events_are_throttled() {
        let store = Arc::new(FlakyStore::new());
        store.set_available(false);
        let clock = Arc::new(ManualClock::new(0));
        let reporter = Arc::new(CollectingReporter::default());
        let tracker = tracker_with(store, clock.clone(), reporter.clone());

        for _ in 0..12 {
            tracker.ensure_connection().await;
            clock.advance(5_001);
        }

        // Failures 1 and 10 emit; 2-9, 11, 12 stay quiet.
        let degraded = reporter.count(EventKind::StorageConnectionDegraded);
        assert_eq!(degraded, 2);
        assert_eq!(tracker.status().await.consecutive_failures, 12);
    }

    #[tokio::test]
    async fn restored_event_fires_exactly_once() {
        let store = Arc::new(FlakyStore::new());
        store.set_available(false);
        let clock = Arc::new(ManualClock::new(0));
        let reporter = Arc::new(CollectingReporter::default());
        let tracker = tracker_with(store.clone(), clock.clone(), reporter.clone());

        tracker.ensure_connection().await;
        clock.advance(5_001);
        tracker.ensure_connection().await;

        store.set_available(true);
        clock.advance(5_001);
        assert!(tracker.ensure_connection().await);
        clock.advance(5_001);
        assert!(tracker.ensure_connection().await);

        assert_eq!(reporter.count(EventKind::StorageConnectionRestored), 1);
        let status = tracker.status().await;
        assert!(status.is_connected);
        assert_eq!(status.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn first_successful_probe_is_not_a_restoration() {
        let store = Arc::new(FlakyStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let reporter = Arc::new(CollectingReporter::default());
        let tracker = tracker_with(store, clock, reporter.clone());

        assert!(tracker.ensure_connection().await);
        assert_eq!(reporter.count(EventKind::StorageConnectionRestored), 0);
    }

    #[tokio::test]
    async fn guarded_prefers_the_store_and_falls_back_on_outage() {
        let store = Arc::new(FlakyStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let reporter = Arc::new(CollectingReporter::default());
        let tracker = tracker_with(store.clone(), clock.clone(), reporter);

        let value = tracker
            .guarded(|| async { Ok::<_, StoreError>(42) }, || 7)
            .await;
        assert_eq!(value, 42);

        store.set_available(false);
        clock.advance(5_001);
        let value = tracker
            .guarded(|| async { Ok::<_, StoreError>(42) }, || 7)
            .await;
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn guarded_recovers_from_operation_errors() {
        let store = Arc::new(FlakyStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let reporter = Arc::new(CollectingReporter::default());
        let tracker = tracker_with(store, clock, reporter);

        let value = tracker
            .guarded(
                || async { Err::<i32, _>(StoreError::Connection("boom".into())) },
                || 7,
            )
            .await;
        assert_eq!(value, 7);
        assert!(!tracker.status().await.is_connected);
    }

    #[tokio::test]
    async fn force_reconnect_clears_the_cooldown() {
        let store = Arc::new(FlakyStore::new());
        store.set_available(false);
        let clock = Arc::new(ManualClock::new(0));
        let reporter = Arc::new(CollectingReporter::default());
        let tracker = tracker_with(store.clone(), clock, reporter);

        tracker.ensure_connection().await;
        store.set_available(true);

        assert!(tracker.force_reconnect());
        // Fire-and-forget: give the spawned probe a moment to land.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(tracker.status().await.is_connected);
    }
}
