//! Adapter counters
//!
//! Counters only, monotonic, reset on construction. Relaxed ordering is
//! enough; readers only need eventually-exact totals.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-adapter operational counters
#[derive(Debug, Default)]
pub struct AdapterMetrics {
    snapshots_written: AtomicU64,
    ops_written: AtomicU64,
    queries_executed: AtomicU64,
    queries_rejected: AtomicU64,
    poll_delegations: AtomicU64,
    engine_errors: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub snapshots_written: u64,
    pub ops_written: u64,
    pub queries_executed: u64,
    pub queries_rejected: u64,
    pub poll_delegations: u64,
    pub engine_errors: u64,
}

impl AdapterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_snapshots_written(&self) {
        self.snapshots_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_ops_written(&self) {
        self.ops_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_poll_delegations(&self) {
        self.poll_delegations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_engine_errors(&self) {
        self.engine_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            snapshots_written: self.snapshots_written.load(Ordering::Relaxed),
            ops_written: self.ops_written.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            poll_delegations: self.poll_delegations.load(Ordering::Relaxed),
            engine_errors: self.engine_errors.load(Ordering::Relaxed),
        }
    }
}
