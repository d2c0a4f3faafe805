//! Per-query options and read strategies

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::driver::MapReduce;
use crate::engine::Engine;

/// How the collaboration engine intends to maintain the query's results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryMode {
    /// One-off fetch or incrementally maintained subscription
    #[default]
    Fetch,
    /// Full rerun on every relevant edit
    Poll,
}

/// Options accompanying a query
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub mode: QueryMode,
    /// Map and reduce steps for `$mapReduce` queries
    pub map_reduce: Option<MapReduce>,
}

impl QueryOptions {
    pub fn poll() -> Self {
        Self {
            mode: QueryMode::Poll,
            map_reduce: None,
        }
    }

    pub fn with_map_reduce(mut self, map_reduce: MapReduce) -> Self {
        self.map_reduce = Some(map_reduce);
        self
    }
}

/// Where reads that may go to a replica are served from
#[derive(Clone, Default)]
pub enum ReadStrategy {
    /// Always the primary engine
    #[default]
    Direct,
    /// Poll-mode queries and single-document matches go to a replica after
    /// a settling delay; reads right after a write may be stale
    PollReplica {
        replica: Arc<dyn Engine>,
        settle_delay: Duration,
    },
}

impl ReadStrategy {
    /// The replica and its delay, if one is configured
    pub fn replica(&self) -> Option<(&dyn Engine, Duration)> {
        match self {
            ReadStrategy::Direct => None,
            ReadStrategy::PollReplica {
                replica,
                settle_delay,
            } => Some((replica.as_ref(), *settle_delay)),
        }
    }
}

impl fmt::Debug for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadStrategy::Direct => write!(f, "Direct"),
            ReadStrategy::PollReplica { settle_delay, .. } => f
                .debug_struct("PollReplica")
                .field("settle_delay", settle_delay)
                .finish_non_exhaustive(),
        }
    }
}
