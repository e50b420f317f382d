//! # Background Status Refresher
//!
//! A single cancellable periodic task that re-reads every circuit record
//! and caches the result for observers (dashboards, health endpoints)
//! without putting them on the storage path. Owned by whatever hosts the
//! service: lifecycle is explicit `start()`/`stop()`, nothing ambient.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::models::CircuitStatus;
use crate::resilience::engine::CircuitBreakerEngine;

/// Periodically refreshes a cached snapshot of all circuit statuses.
#[derive(Debug)]
pub struct BackgroundRefresher {
    engine: Arc<CircuitBreakerEngine>,
    interval: Duration,
    snapshot: Arc<RwLock<HashMap<String, CircuitStatus>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl BackgroundRefresher {
    pub fn new(engine: Arc<CircuitBreakerEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            snapshot: Arc::new(RwLock::new(HashMap::new())),
            handle: Mutex::new(None),
            shutdown: Mutex::new(None),
        }
    }

    /// Spawn the refresh loop. Idempotent: a second call while running is a
    /// logged no-op. The first refresh happens immediately.
    pub async fn start(&self) {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            warn!("background refresher already running");
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        *self.shutdown.lock().await = Some(tx);

        let engine = Arc::clone(&self.engine);
        let snapshot = Arc::clone(&self.snapshot);
        let interval = self.interval;

        info!(interval_ms = interval.as_millis() as u64, "🔄 Background refresher started");
        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let statuses = engine.all_statuses().await;
                        debug!(circuits = statuses.len(), "refreshed circuit status snapshot");
                        *snapshot.write() = statuses;
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("background refresher stopped");
        }));
    }

    /// Signal the loop to stop and wait for it to finish. Safe to call when
    /// not running.
    pub async fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().await.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Last cached snapshot; empty until the first refresh completes.
    pub fn snapshot(&self) -> HashMap<String, CircuitStatus> {
        self.snapshot.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::BreakerConfig;
    use crate::database::{ConnectionHealthTracker, FallbackMemoryStore};
    use crate::models::CircuitState;
    use crate::test_utils::{CollectingReporter, FlakyStore};

    fn engine_fixture() -> Arc<CircuitBreakerEngine> {
        let store = Arc::new(FlakyStore::new());
        let clock = Arc::new(ManualClock::new(1_000_000));
        let reporter = Arc::new(CollectingReporter::default());
        let tracker =
            ConnectionHealthTracker::new(store.clone(), clock.clone(), reporter.clone(), 5_000);
        Arc::new(CircuitBreakerEngine::new(
            store,
            Arc::new(FallbackMemoryStore::new()),
            tracker,
            reporter,
            clock,
            BreakerConfig::default(),
        ))
    }

    #[tokio::test]
    async fn refreshes_and_stops() {
        let engine = engine_fixture();
        engine.record_failure("flaky-api").await;

        let refresher = BackgroundRefresher::new(engine.clone(), Duration::from_millis(20));
        assert!(refresher.snapshot().is_empty());

        refresher.start().await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let snapshot = refresher.snapshot();
        assert_eq!(snapshot["flaky-api"].state, CircuitState::Open);

        refresher.stop().await;
        assert!(!refresher.is_running().await);

        // No further refreshes after stop.
        engine.record_success("late-arrival").await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!refresher.snapshot().contains_key("late-arrival"));
    }

    #[tokio::test]
    async fn double_start_is_a_noop_and_stop_is_reentrant() {
        let engine = engine_fixture();
        let refresher = BackgroundRefresher::new(engine, Duration::from_millis(20));

        refresher.start().await;
        refresher.start().await;
        assert!(refresher.is_running().await);

        refresher.stop().await;
        refresher.stop().await;
        assert!(!refresher.is_running().await);
    }
}
