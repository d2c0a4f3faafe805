//! Observability subsystem for aerolive
//!
//! - Structured logs: one JSON object per line, event name first, fields
//!   in alphabetical order
//! - Typed adapter events
//! - Monotonic counters
//!
//! Observability is read-only: nothing here changes adapter behavior.
//!
//! ```ignore
//! use aerolive::observability::{Event, Logger};
//!
//! Logger::info(Event::OpWrite, &[("collection", "docs"), ("v", "3")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{AdapterMetrics, MetricsSnapshot};
