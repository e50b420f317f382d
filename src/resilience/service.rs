//! # Circuit Breaker Service
//!
//! The façade the rest of the platform consumes. One explicit instance owns
//! the engine, the connection tracker, the fallback mirror, and the
//! background refresher - constructor-wired, no ambient singletons. Apart
//! from dependency-name validation, no method here can fail: a broken
//! breaker must never break the calls it protects.

use std::collections::HashMap;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::ResilienceConfig;
use crate::constants::MAX_DEPENDENCY_NAME_LEN;
use crate::database::{
    CircuitStore, ConnectionHealthTracker, FallbackMemoryStore, PgCircuitStore,
};
use crate::error::{ResilienceError, Result};
use crate::events::EventReporter;
use crate::models::{CircuitDecision, CircuitStatus, ConnectionStatus};
use crate::resilience::engine::CircuitBreakerEngine;
use crate::resilience::refresher::BackgroundRefresher;

/// In-process resilience service protecting calls to named downstream
/// dependencies.
#[derive(Debug, Clone)]
pub struct CircuitBreakerService {
    engine: Arc<CircuitBreakerEngine>,
    tracker: ConnectionHealthTracker,
    refresher: Arc<BackgroundRefresher>,
}

impl CircuitBreakerService {
    /// Wire a service over an already-constructed durable store.
    pub fn new(
        durable: Arc<dyn CircuitStore>,
        reporter: Arc<dyn EventReporter>,
        config: ResilienceConfig,
    ) -> Self {
        Self::with_clock(durable, reporter, config, Arc::new(SystemClock))
    }

    /// Same as [`new`](Self::new) with an injected clock (deterministic
    /// timers under test).
    pub fn with_clock(
        durable: Arc<dyn CircuitStore>,
        reporter: Arc<dyn EventReporter>,
        config: ResilienceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let fallback = Arc::new(FallbackMemoryStore::new());
        let tracker = ConnectionHealthTracker::new(
            Arc::clone(&durable),
            Arc::clone(&clock),
            Arc::clone(&reporter),
            config.storage.reconnect_cooldown_ms,
        );
        let engine = Arc::new(CircuitBreakerEngine::new(
            durable,
            fallback,
            tracker.clone(),
            reporter,
            clock,
            config.breaker.clone(),
        ));
        let refresher = Arc::new(BackgroundRefresher::new(
            Arc::clone(&engine),
            config.refresher.interval(),
        ));

        Self {
            engine,
            tracker,
            refresher,
        }
    }

    /// Connect to PostgreSQL per the storage config and wire a service
    /// over it.
    pub async fn connect(
        config: ResilienceConfig,
        reporter: Arc<dyn EventReporter>,
    ) -> Result<Self> {
        let store = PgCircuitStore::connect(&config.storage).await?;
        Ok(Self::new(Arc::new(store), reporter, config))
    }

    /// Ask whether a call to `name` may proceed right now.
    pub async fn should_allow_request(&self, name: &str) -> Result<CircuitDecision> {
        validate_name(name)?;
        Ok(self.engine.should_allow(name).await)
    }

    /// Report the outcome of a protected call.
    pub async fn record_request_result(&self, name: &str, success: bool) -> Result<()> {
        validate_name(name)?;
        self.engine.record_result(name, success).await;
        Ok(())
    }

    /// Live snapshot of every known circuit.
    pub async fn get_all_circuit_statuses(&self) -> HashMap<String, CircuitStatus> {
        self.engine.all_statuses().await
    }

    /// Last snapshot cached by the background refresher; never touches
    /// storage.
    pub fn get_cached_statuses(&self) -> HashMap<String, CircuitStatus> {
        self.refresher.snapshot()
    }

    /// Administrative reconnect; fire-and-forget.
    pub fn force_reconnect(&self) -> bool {
        self.tracker.force_reconnect()
    }

    pub async fn get_connection_status(&self) -> ConnectionStatus {
        self.tracker.status().await
    }

    /// Start the background refresher.
    pub async fn start(&self) {
        self.refresher.start().await;
    }

    /// Stop the background refresher.
    pub async fn stop(&self) {
        self.refresher.stop().await;
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ResilienceError::InvalidKey(
            "dependency name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_DEPENDENCY_NAME_LEN {
        return Err(ResilienceError::InvalidKey(format!(
            "dependency name exceeds {MAX_DEPENDENCY_NAME_LEN} characters"
        )));
    }
    Ok(())
}
