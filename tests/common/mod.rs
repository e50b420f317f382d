//! Shared harness for integration tests: a service wired over a
//! switchable-availability store, a manual clock, and a collecting
//! reporter.

use std::sync::Arc;

use resilience_core::clock::ManualClock;
use resilience_core::test_utils::{CollectingReporter, FlakyStore};
use resilience_core::{CircuitBreakerService, ResilienceConfig};

pub const T0: i64 = 1_000_000;

pub struct Harness {
    pub service: CircuitBreakerService,
    pub store: Arc<FlakyStore>,
    pub clock: Arc<ManualClock>,
    pub reporter: Arc<CollectingReporter>,
}

pub fn harness() -> Harness {
    let store = Arc::new(FlakyStore::new());
    let clock = Arc::new(ManualClock::new(T0));
    let reporter = Arc::new(CollectingReporter::default());
    let service = CircuitBreakerService::with_clock(
        store.clone(),
        reporter.clone(),
        ResilienceConfig::default(),
        clock.clone(),
    );
    Harness {
        service,
        store,
        clock,
        reporter,
    }
}

pub fn degraded_harness() -> Harness {
    let h = harness();
    h.store.set_available(false);
    h
}
