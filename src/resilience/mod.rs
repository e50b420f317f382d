//! # Resilience Module
//!
//! Circuit breaker state machine, background refresher, and the service
//! façade that hosts wire into their request handlers.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use resilience_core::config::ResilienceConfig;
//! use resilience_core::events::TracingReporter;
//! use resilience_core::resilience::CircuitBreakerService;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service =
//!     CircuitBreakerService::connect(ResilienceConfig::from_env()?, Arc::new(TracingReporter))
//!         .await?;
//! service.start().await;
//!
//! let decision = service.should_allow_request("payments-api").await?;
//! if decision.allowed {
//!     // ... call the dependency, then:
//!     service.record_request_result("payments-api", true).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod refresher;
pub mod service;

pub use engine::CircuitBreakerEngine;
pub use refresher::BackgroundRefresher;
pub use service::CircuitBreakerService;
