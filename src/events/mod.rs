//! # Event System
//!
//! Outbound interface to the audit/observability collaborator. The engine
//! depends only on the [`EventReporter`] trait; wiring a concrete sink is
//! the host's choice and a failing sink must never affect the breaker's
//! decision path.

pub mod publisher;
pub mod reporter;

pub use publisher::{BroadcastReporter, ReportedEvent};
pub use reporter::{EventKind, EventReporter, EventSeverity, NoopReporter, TracingReporter};
