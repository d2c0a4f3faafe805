//! Query execution driver
//!
//! Runs a normalized query against one table and shapes the result:
//!
//! - `$distinct`, `$aggregate`, `$count`: compiled query runs, its value is
//!   returned as `extra` with an empty row list
//! - `$mapReduce`: the literal filter and selector steps run, then the
//!   caller's map and reduce functions run in process
//! - otherwise: a plain find, projected when a field list is given and
//!   decoded into document envelopes
//!
//! Compilation happens before any I/O, so translation errors never reach
//! the engine.

mod executor;
mod map_reduce;
mod result;

pub use executor::QueryDriver;
pub use map_reduce::{MapFn, MapReduce, ReduceFn};
pub use result::QueryResult;
