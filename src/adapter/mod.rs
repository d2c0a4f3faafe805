//! Adapter facade for aerolive
//!
//! [`LiveDbAdapter`] is the fixed method set the collaboration engine calls:
//! snapshot reads and writes, oplog append and reads, version lookup,
//! queries, and the poll-mode and feature-gate predicates.
//!
//! # Validation order
//!
//! Every data-bearing call checks, before any I/O:
//!
//! 1. The adapter is open
//! 2. The collection name is not an oplog table or a reserved name
//! 3. For queries: normalization, feature gates, then compilation

mod config;
mod facade;
mod options;

pub use config::AdapterConfig;
pub use facade::LiveDbAdapter;
pub use options::{QueryMode, QueryOptions, ReadStrategy};
