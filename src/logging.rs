//! # Structured Logging
//!
//! Optional tracing bootstrap for hosts that do not bring their own
//! subscriber. Embedders with an existing global subscriber keep it;
//! `try_init` makes the call a no-op in that case.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging. Level comes from `RUST_LOG` (default
/// `info`); set `RESILIENCE_LOG_FORMAT=json` for machine-readable output.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let json_output = std::env::var("RESILIENCE_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let layer = if json_output {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .json()
                .boxed()
        } else {
            fmt::layer().with_target(true).with_level(true).boxed()
        };

        if tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_err()
        {
            // A global subscriber is already set by the host - continue with it.
            tracing::debug!("global tracing subscriber already initialized");
        }
    });
}
