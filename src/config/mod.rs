//! # Configuration System
//!
//! Explicit, validated configuration for the circuit breaker subsystem.
//! Defaults come from [`crate::constants`]; deployments override them via
//! `RESILIENCE_`-prefixed environment variables (double underscore as the
//! section separator, e.g. `RESILIENCE_BREAKER__RECOVERY_TIMEOUT_MS=10000`).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use resilience_core::config::ResilienceConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ResilienceConfig::from_env()?;
//! let timeout = config.breaker.recovery_timeout();
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;
use crate::error::ResilienceError;

/// Root configuration for the subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResilienceConfig {
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub refresher: RefresherConfig,
}

/// State-machine thresholds and timers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Failure ratio at or above which a CLOSED circuit opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: f64,
    /// How long a circuit stays OPEN before trial calls are admitted.
    #[serde(default = "default_recovery_timeout_ms")]
    pub recovery_timeout_ms: i64,
    /// Trial calls admitted per HALF_OPEN episode.
    #[serde(default = "default_half_open_max_trials")]
    pub half_open_max_trials: i32,
}

/// Durable-store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Connection string; falls back to `DATABASE_URL` when unset.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Bound on pool acquisition so no decision path blocks indefinitely.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Cooldown between reconnection attempts after the store goes away.
    #[serde(default = "default_reconnect_cooldown_ms")]
    pub reconnect_cooldown_ms: i64,
}

/// Background status refresher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefresherConfig {
    #[serde(default = "default_refresh_interval_ms")]
    pub interval_ms: u64,
}

fn default_failure_threshold() -> f64 {
    constants::FAILURE_THRESHOLD
}

fn default_recovery_timeout_ms() -> i64 {
    constants::RECOVERY_TIMEOUT_MS
}

fn default_half_open_max_trials() -> i32 {
    constants::HALF_OPEN_MAX_TRIALS
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_reconnect_cooldown_ms() -> i64 {
    constants::RECONNECT_COOLDOWN_MS
}

fn default_refresh_interval_ms() -> u64 {
    constants::REFRESH_INTERVAL_MS
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_ms: default_recovery_timeout_ms(),
            half_open_max_trials: default_half_open_max_trials(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            reconnect_cooldown_ms: default_reconnect_cooldown_ms(),
        }
    }
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_refresh_interval_ms(),
        }
    }
}

impl BreakerConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms.max(0) as u64)
    }
}

impl StorageConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl RefresherConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ResilienceConfig {
    /// Load configuration: compiled-in defaults overlaid with
    /// `RESILIENCE_`-prefixed environment variables.
    pub fn from_env() -> Result<Self, ResilienceError> {
        let defaults = config::Config::try_from(&ResilienceConfig::default())
            .map_err(|e| ResilienceError::Configuration(e.to_string()))?;

        config::Config::builder()
            .add_source(defaults)
            .add_source(config::Environment::with_prefix("RESILIENCE").separator("__"))
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| ResilienceError::Configuration(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = ResilienceConfig::default();
        assert_eq!(config.breaker.failure_threshold, 0.5);
        assert_eq!(config.breaker.recovery_timeout_ms, 30_000);
        assert_eq!(config.breaker.half_open_max_trials, 3);
        assert_eq!(config.storage.reconnect_cooldown_ms, 5_000);
        assert_eq!(config.refresher.interval_ms, 60_000);
    }

    #[test]
    fn duration_helpers() {
        let config = ResilienceConfig::default();
        assert_eq!(config.breaker.recovery_timeout(), Duration::from_secs(30));
        assert_eq!(config.storage.acquire_timeout(), Duration::from_secs(5));
        assert_eq!(config.refresher.interval(), Duration::from_secs(60));
    }

    #[test]
    fn from_env_without_overrides_yields_defaults() {
        let config = ResilienceConfig::from_env().expect("defaults should load");
        assert_eq!(config.breaker.half_open_max_trials, 3);
        assert!(config.storage.database_url.is_none());
    }
}
