//! Process-local mirror of the circuit table.
//!
//! Every engine write lands here unconditionally so the mirror is warm the
//! moment the durable store disappears. Records use the full corrected
//! model - the trial counter is its own field, never a repurposed
//! remaining-time value. Nothing here survives a process restart; that is
//! the accepted trade for a breaker that keeps deciding during an outage.

use dashmap::DashMap;

use crate::models::{CircuitRecord, CircuitState};

/// DashMap-backed stand-in used whenever the guarded store falls through.
#[derive(Debug, Default)]
pub struct FallbackMemoryStore {
    records: DashMap<String, CircuitRecord>,
}

impl FallbackMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<CircuitRecord> {
        self.records.get(name).map(|entry| entry.value().clone())
    }

    pub fn get_or_default(&self, name: &str) -> CircuitRecord {
        self.get(name).unwrap_or_else(|| CircuitRecord::new(name))
    }

    /// Replace the mirrored record wholesale (used to sync from the durable
    /// store after a successful read).
    pub fn put(&self, record: CircuitRecord) {
        self.records.insert(record.service_name.clone(), record);
    }

    pub fn set_state(
        &self,
        name: &str,
        state: CircuitState,
        failure_rate: f64,
        timestamp_ms: i64,
    ) {
        let mut entry = self
            .records
            .entry(name.to_string())
            .or_insert_with(|| CircuitRecord::new(name));
        entry.state = state;
        entry.failure_rate = failure_rate;
        entry.timestamp = timestamp_ms;
        if state == CircuitState::HalfOpen {
            entry.half_open_trial_count = 0;
        }
    }

    pub fn increment_success(&self, name: &str, now_ms: i64) {
        let mut entry = self
            .records
            .entry(name.to_string())
            .or_insert_with(|| CircuitRecord::new(name));
        if entry.total_count == 0 {
            entry.timestamp = now_ms;
        }
        entry.success_count += 1;
        entry.total_count += 1;
    }

    pub fn increment_failure(&self, name: &str, now_ms: i64) {
        let mut entry = self
            .records
            .entry(name.to_string())
            .or_insert_with(|| CircuitRecord::new(name));
        if entry.total_count == 0 {
            entry.timestamp = now_ms;
        }
        entry.failure_count += 1;
        entry.total_count += 1;
    }

    pub fn recompute_failure_rate(&self, name: &str) -> f64 {
        let mut entry = self
            .records
            .entry(name.to_string())
            .or_insert_with(|| CircuitRecord::new(name));
        entry.failure_rate = entry.computed_failure_rate();
        entry.failure_rate
    }

    pub fn set_failure_rate(&self, name: &str, failure_rate: f64) {
        if let Some(mut entry) = self.records.get_mut(name) {
            entry.failure_rate = failure_rate;
        }
    }

    pub fn increment_half_open_trials(&self, name: &str) -> i32 {
        let mut entry = self
            .records
            .entry(name.to_string())
            .or_insert_with(|| CircuitRecord::new(name));
        entry.half_open_trial_count += 1;
        entry.half_open_trial_count
    }

    /// Align the mirrored trial counter with the durable store's
    /// authoritative count.
    pub fn set_half_open_trials(&self, name: &str, count: i32) {
        let mut entry = self
            .records
            .entry(name.to_string())
            .or_insert_with(|| CircuitRecord::new(name));
        entry.half_open_trial_count = count;
    }

    pub fn list_all(&self) -> Vec<CircuitRecord> {
        let mut records: Vec<CircuitRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_keep_the_lifetime_invariant() {
        let store = FallbackMemoryStore::new();
        store.increment_success("api", 100);
        store.increment_failure("api", 200);
        store.increment_failure("api", 300);

        let record = store.get("api").unwrap();
        assert_eq!(record.success_count + record.failure_count, record.total_count);
        assert_eq!(record.total_count, 3);

        let rate = store.recompute_failure_rate("api");
        assert!((rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn entering_half_open_resets_the_trial_counter() {
        let store = FallbackMemoryStore::new();
        assert_eq!(store.increment_half_open_trials("api"), 1);
        assert_eq!(store.increment_half_open_trials("api"), 2);

        store.set_state("api", CircuitState::HalfOpen, 0.5, 1_000);
        let record = store.get("api").unwrap();
        assert_eq!(record.half_open_trial_count, 0);
        assert_eq!(store.increment_half_open_trials("api"), 1);
    }

    #[test]
    fn set_state_does_not_touch_counters() {
        let store = FallbackMemoryStore::new();
        store.increment_success("api", 100);
        store.set_state("api", CircuitState::Open, 1.0, 2_000);

        let record = store.get("api").unwrap();
        assert_eq!(record.success_count, 1);
        assert_eq!(record.total_count, 1);
        assert_eq!(record.state, CircuitState::Open);
        assert_eq!(record.timestamp, 2_000);
    }

    #[test]
    fn list_all_is_sorted_and_stable() {
        let store = FallbackMemoryStore::new();
        store.increment_success("zeta", 1);
        store.increment_success("alpha", 1);

        let names: Vec<String> = store
            .list_all()
            .into_iter()
            .map(|r| r.service_name)
            .collect();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn missing_record_defaults_to_closed() {
        let store = FallbackMemoryStore::new();
        let record = store.get_or_default("never-seen");
        assert_eq!(record.state, CircuitState::Closed);
        assert!(store.get("never-seen").is_none());
    }
}
