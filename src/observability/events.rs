//! Adapter lifecycle and data-path events

use std::fmt;

/// Observable events emitted by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Adapter constructed
    AdapterOpen,
    /// Adapter closed
    AdapterClosed,

    // Bootstrap
    /// Snapshot table created or confirmed
    TableEnsured,
    /// Oplog table and indexes created or confirmed
    OpIndexBootstrap,
    /// Oplog bootstrap step failed for a reason other than "already exists"
    OpIndexBootstrapWarn,

    // Writes
    /// Snapshot row written
    SnapshotWrite,
    /// Oplog row written
    OpWrite,

    // Queries
    /// Query compiled into a plan
    QueryCompiled,
    /// Query rejected by validation, feature gates, or the compiler
    QueryRejected,
    /// Query delegated to the polling replica
    PollDelegate,

    // Failures
    /// Target engine returned an error
    EngineError,
}

impl Event {
    /// Returns the event name as written to logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::AdapterOpen => "ADAPTER_OPEN",
            Event::AdapterClosed => "ADAPTER_CLOSED",
            Event::TableEnsured => "TABLE_ENSURED",
            Event::OpIndexBootstrap => "OP_INDEX_BOOTSTRAP",
            Event::OpIndexBootstrapWarn => "OP_INDEX_BOOTSTRAP_WARN",
            Event::SnapshotWrite => "SNAPSHOT_WRITE",
            Event::OpWrite => "OP_WRITE",
            Event::QueryCompiled => "QUERY_COMPILED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::PollDelegate => "POLL_DELEGATE",
            Event::EngineError => "ENGINE_ERROR",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
