//! Observability for the profile store
//!
//! - Structured logging (JSON lines)
//! - Per-store operation counters
//! - A closed set of named events
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. A logging failure never fails the operation being logged
//! 3. No background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use profiledb::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::ProfileStored, &[("item_id", "42")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_stores();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
