//! # Circuit Breaker Engine
//!
//! The CLOSED/OPEN/HALF_OPEN state machine. Every decision reads through
//! the guarded store (durable first, in-memory mirror on failure) and every
//! write lands in both backends, so the machine keeps answering with the
//! same semantics when its own persistence is down.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::BreakerConfig;
use crate::database::{CircuitStore, ConnectionHealthTracker, FallbackMemoryStore};
use crate::events::{EventKind, EventReporter, EventSeverity};
use crate::models::{CircuitDecision, CircuitRecord, CircuitState, CircuitStatus};

/// Per-dependency circuit breaker state machine.
#[derive(Debug, Clone)]
pub struct CircuitBreakerEngine {
    durable: Arc<dyn CircuitStore>,
    fallback: Arc<FallbackMemoryStore>,
    tracker: ConnectionHealthTracker,
    reporter: Arc<dyn EventReporter>,
    clock: Arc<dyn Clock>,
    config: BreakerConfig,
    /// Serializes in-process mutation per dependency; cross-instance races
    /// are left to the additive upserts to absorb.
    key_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl CircuitBreakerEngine {
    pub fn new(
        durable: Arc<dyn CircuitStore>,
        fallback: Arc<FallbackMemoryStore>,
        tracker: ConnectionHealthTracker,
        reporter: Arc<dyn EventReporter>,
        clock: Arc<dyn Clock>,
        config: BreakerConfig,
    ) -> Self {
        info!(
            failure_threshold = config.failure_threshold,
            recovery_timeout_ms = config.recovery_timeout_ms,
            half_open_max_trials = config.half_open_max_trials,
            "🛡️ Circuit breaker engine initialized"
        );

        Self {
            durable,
            fallback,
            tracker,
            reporter,
            clock,
            config,
            key_locks: Arc::new(DashMap::new()),
        }
    }

    fn key_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.key_locks.entry(name.to_string()).or_default().clone()
    }

    /// Decide whether a call to `name` may proceed, applying the OPEN →
    /// HALF_OPEN transition as a side effect once the recovery timeout has
    /// elapsed.
    pub async fn should_allow(&self, name: &str) -> CircuitDecision {
        let lock = self.key_lock(name);
        let _guard = lock.lock().await;

        let record = self.current_record(name).await;
        let now = self.clock.now_ms();

        match record.state {
            CircuitState::Closed => CircuitDecision {
                allowed: true,
                state: CircuitState::Closed,
                remaining_time_ms: 0,
            },
            CircuitState::Open => {
                let elapsed = now - record.timestamp;
                if elapsed >= self.config.recovery_timeout_ms {
                    self.transition(name, record.state, CircuitState::HalfOpen, record.failure_rate, now)
                        .await;
                    // The triggering call becomes the first trial.
                    let trials = self.bump_trials(name).await;
                    debug!(
                        dependency = name,
                        trials, "recovery timeout elapsed, admitting trial call"
                    );
                    CircuitDecision {
                        allowed: true,
                        state: CircuitState::HalfOpen,
                        remaining_time_ms: 0,
                    }
                } else {
                    CircuitDecision {
                        allowed: false,
                        state: CircuitState::Open,
                        remaining_time_ms: self.config.recovery_timeout_ms - elapsed,
                    }
                }
            }
            CircuitState::HalfOpen => {
                let trials = self.bump_trials(name).await;
                let allowed = trials <= self.config.half_open_max_trials;
                if !allowed {
                    debug!(
                        dependency = name,
                        trials,
                        max_trials = self.config.half_open_max_trials,
                        "trial budget exhausted, denying call"
                    );
                }
                CircuitDecision {
                    allowed,
                    state: CircuitState::HalfOpen,
                    remaining_time_ms: 0,
                }
            }
        }
    }

    /// Record the outcome of a protected call.
    pub async fn record_result(&self, name: &str, success: bool) {
        if success {
            self.record_success(name).await;
        } else {
            self.record_failure(name).await;
        }
    }

    /// Successes always count toward lifetime totals; in HALF_OPEN a single
    /// success closes the circuit.
    pub async fn record_success(&self, name: &str) {
        let lock = self.key_lock(name);
        let _guard = lock.lock().await;

        let record = self.current_record(name).await;
        let now = self.clock.now_ms();

        self.fallback.increment_success(name, now);
        let durable = Arc::clone(&self.durable);
        let key = name.to_string();
        self.tracker
            .guarded(
                move || async move { durable.increment_success(&key, now).await },
                || (),
            )
            .await;
        let rate = self.recompute_rate(name).await;

        if record.state == CircuitState::HalfOpen {
            self.transition(name, record.state, CircuitState::Closed, rate, now)
                .await;
        }
    }

    /// Failures are ignored while OPEN, reopen the circuit from HALF_OPEN,
    /// and in CLOSED count toward the threshold.
    pub async fn record_failure(&self, name: &str) {
        let lock = self.key_lock(name);
        let _guard = lock.lock().await;

        let record = self.current_record(name).await;
        let now = self.clock.now_ms();

        match record.state {
            CircuitState::Open => {
                debug!(dependency = name, "failure recorded while open, ignoring");
            }
            CircuitState::HalfOpen => {
                // One failed trial reopens the circuit; the fresh timestamp
                // restarts the recovery countdown.
                self.transition(name, record.state, CircuitState::Open, record.failure_rate, now)
                    .await;
            }
            CircuitState::Closed => {
                self.fallback.increment_failure(name, now);
                let durable = Arc::clone(&self.durable);
                let key = name.to_string();
                self.tracker
                    .guarded(
                        move || async move { durable.increment_failure(&key, now).await },
                        || (),
                    )
                    .await;
                let rate = self.recompute_rate(name).await;

                if rate >= self.config.failure_threshold {
                    self.transition(name, record.state, CircuitState::Open, rate, now)
                        .await;
                }
            }
        }
    }

    /// Snapshot of every known circuit with its remaining recovery time.
    pub async fn all_statuses(&self) -> HashMap<String, CircuitStatus> {
        let durable = Arc::clone(&self.durable);
        let mirror = Arc::clone(&self.fallback);
        let records = self
            .tracker
            .guarded(
                move || async move {
                    let records = durable.list_all().await?;
                    for record in &records {
                        mirror.put(record.clone());
                    }
                    Ok(records)
                },
                || self.fallback.list_all(),
            )
            .await;

        let now = self.clock.now_ms();
        records
            .into_iter()
            .map(|record| {
                let remaining = record.remaining_time_ms(now, self.config.recovery_timeout_ms);
                (
                    record.service_name.clone(),
                    CircuitStatus {
                        state: record.state,
                        failure_rate: record.failure_rate,
                        timestamp: record.timestamp,
                        remaining_time_ms: remaining,
                    },
                )
            })
            .collect()
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Read the current record, preferring the durable store and mirroring
    /// a successful read into the fallback. Never-seen dependencies default
    /// to a fresh CLOSED record.
    async fn current_record(&self, name: &str) -> CircuitRecord {
        let durable = Arc::clone(&self.durable);
        let mirror = Arc::clone(&self.fallback);
        let key = name.to_string();

        let fetched = self
            .tracker
            .guarded(
                move || async move {
                    let record = durable.get_record(&key).await?;
                    if let Some(record) = &record {
                        mirror.put(record.clone());
                    }
                    Ok(record)
                },
                || self.fallback.get(name),
            )
            .await;

        fetched.unwrap_or_else(|| CircuitRecord::new(name))
    }

    /// Increment the HALF_OPEN trial counter in whichever backend is
    /// serving, keeping the mirror aligned with the returned count.
    async fn bump_trials(&self, name: &str) -> i32 {
        let durable = Arc::clone(&self.durable);
        let key = name.to_string();

        let count = self
            .tracker
            .guarded(
                move || async move { durable.increment_half_open_trials(&key).await },
                || self.fallback.increment_half_open_trials(name),
            )
            .await;

        self.fallback.set_half_open_trials(name, count);
        count
    }

    /// Recompute and persist the lifetime failure rate, mirroring the
    /// authoritative value.
    async fn recompute_rate(&self, name: &str) -> f64 {
        let local = self.fallback.recompute_failure_rate(name);
        let durable = Arc::clone(&self.durable);
        let key = name.to_string();

        let rate = self
            .tracker
            .guarded(
                move || async move { durable.recompute_failure_rate(&key).await },
                || local,
            )
            .await;

        self.fallback.set_failure_rate(name, rate);
        rate
    }

    /// Apply a state transition to both backends and report it. Only
    /// transitions emit events, never individual reads or outcome records.
    async fn transition(
        &self,
        name: &str,
        from: CircuitState,
        to: CircuitState,
        failure_rate: f64,
        now_ms: i64,
    ) {
        self.fallback.set_state(name, to, failure_rate, now_ms);

        let durable = Arc::clone(&self.durable);
        let key = name.to_string();
        self.tracker
            .guarded(
                move || async move { durable.set_state(&key, to, failure_rate, now_ms).await },
                || (),
            )
            .await;

        match to {
            CircuitState::Open => warn!(
                dependency = name,
                from = %from,
                failure_rate,
                "🔴 Circuit opened (failing fast)"
            ),
            CircuitState::HalfOpen => info!(
                dependency = name,
                from = %from,
                "🟡 Circuit half-open (testing recovery)"
            ),
            CircuitState::Closed => info!(
                dependency = name,
                from = %from,
                "🟢 Circuit closed (recovered)"
            ),
        }

        let severity = match to {
            CircuitState::Open => EventSeverity::High,
            _ => EventSeverity::Medium,
        };
        self.reporter
            .report(
                EventKind::CircuitStateChanged,
                json!({
                    "dependency": name,
                    "from": from.as_str(),
                    "to": to.as_str(),
                    "failure_rate": failure_rate,
                    "timestamp": now_ms,
                }),
                severity,
            )
            .await;
    }
}
