//! # Test Utilities
//!
//! Doubles shared by unit and integration tests: a durable store whose
//! availability can be flipped mid-test, and a reporter that records every
//! emitted event for assertions. Not intended for production wiring.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::database::{CircuitStore, FallbackMemoryStore};
use crate::error::StoreError;
use crate::events::{EventKind, EventReporter, EventSeverity};
use crate::models::{CircuitRecord, CircuitState};

/// In-memory [`CircuitStore`] that can be made unreachable on demand,
/// simulating a durable-store outage without a database.
#[derive(Debug)]
pub struct FlakyStore {
    inner: FallbackMemoryStore,
    available: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: FallbackMemoryStore::new(),
            available: AtomicBool::new(true),
        }
    }

    pub fn unavailable() -> Self {
        let store = Self::new();
        store.set_available(false);
        store
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Peek at the stored record, bypassing the availability switch.
    pub fn peek(&self, name: &str) -> Option<CircuitRecord> {
        self.inner.get(name)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Connection("simulated storage outage".into()))
        }
    }
}

#[async_trait]
impl CircuitStore for FlakyStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn get_record(&self, name: &str) -> Result<Option<CircuitRecord>, StoreError> {
        self.check()?;
        Ok(self.inner.get(name))
    }

    async fn set_state(
        &self,
        name: &str,
        state: CircuitState,
        failure_rate: f64,
        timestamp_ms: i64,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set_state(name, state, failure_rate, timestamp_ms);
        Ok(())
    }

    async fn increment_success(&self, name: &str, now_ms: i64) -> Result<(), StoreError> {
        self.check()?;
        self.inner.increment_success(name, now_ms);
        Ok(())
    }

    async fn increment_failure(&self, name: &str, now_ms: i64) -> Result<(), StoreError> {
        self.check()?;
        self.inner.increment_failure(name, now_ms);
        Ok(())
    }

    async fn recompute_failure_rate(&self, name: &str) -> Result<f64, StoreError> {
        self.check()?;
        Ok(self.inner.recompute_failure_rate(name))
    }

    async fn increment_half_open_trials(&self, name: &str) -> Result<i32, StoreError> {
        self.check()?;
        Ok(self.inner.increment_half_open_trials(name))
    }

    async fn list_all(&self) -> Result<Vec<CircuitRecord>, StoreError> {
        self.check()?;
        Ok(self.inner.list_all())
    }
}

/// Reporter that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<(EventKind, EventSeverity, Value)>>,
}

impl CollectingReporter {
    pub fn events(&self) -> Vec<(EventKind, EventSeverity, Value)> {
        self.events.lock().clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .count()
    }

    pub fn last(&self) -> Option<(EventKind, EventSeverity, Value)> {
        self.events.lock().last().cloned()
    }
}

#[async_trait]
impl EventReporter for CollectingReporter {
    async fn report(&self, kind: EventKind, details: Value, severity: EventSeverity) {
        self.events.lock().push((kind, severity, details));
    }
}
