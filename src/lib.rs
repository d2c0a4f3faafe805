//! aerolive - Versioned-document and oplog storage for real-time
//! collaboration engines over table databases
//!
//! The collaboration engine calls [`LiveDbAdapter`]; the adapter stores
//! snapshots and operations in any [`Engine`] and translates the engine's
//! query dialect into table queries.

pub mod adapter;
pub mod bootstrap;
pub mod codec;
pub mod driver;
pub mod engine;
pub mod error;
pub mod observability;
pub mod oplog;
pub mod query;
pub mod snapshot;

pub use adapter::{AdapterConfig, LiveDbAdapter, QueryMode, QueryOptions, ReadStrategy};
pub use codec::{DocEnvelope, Row};
pub use driver::{MapReduce, QueryResult};
pub use engine::{Engine, EngineError, MemoryEngine};
pub use error::{AdapterError, AdapterResult};
