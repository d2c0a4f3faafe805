//! Target table engine seam
//!
//! The adapter talks to the table database through [`Engine`]: table-scoped
//! get, upsert, and a run-to-completion call for compiled queries. A network
//! driver implements the trait by translating each [`TableQuery`] into its
//! own query terms; [`MemoryEngine`] interprets the same steps in process.
//!
//! All calls return boxed `Send` futures so the trait stays object safe and
//! engines can be shared as `Arc<dyn Engine>`.

mod compare;
mod errors;
mod memory;
mod steps;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

pub use crate::codec::Row;
pub use compare::{compare_values, values_equal};
pub use errors::{EngineError, EngineResult};
pub use memory::MemoryEngine;
pub use steps::StepExecutor;

use crate::query::{QueryPlan, Step};

/// Future returned by every engine call
pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = EngineResult<T>> + Send + 'a>>;

/// Insert behavior when the primary key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// Fail with `DuplicateKey`
    Error,
    /// Replace the stored row wholesale
    Replace,
    /// Merge the new fields over the stored row
    Update,
}

/// Outcome of an insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub inserted: u64,
    pub replaced: u64,
    pub unchanged: u64,
}

/// A query against one table: literal filter, then steps in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    pub filter: Row,
    pub steps: Vec<Step>,
}

impl TableQuery {
    /// Full table scan
    pub fn all() -> Self {
        Self::default()
    }

    /// Scan restricted by a literal filter
    pub fn filtered(filter: Row) -> Self {
        Self {
            filter,
            steps: Vec::new(),
        }
    }

    /// Appends a step
    pub fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

impl From<QueryPlan> for TableQuery {
    fn from(plan: QueryPlan) -> Self {
        Self {
            filter: plan.filter,
            steps: plan.steps,
        }
    }
}

/// Result of running a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Row sequence
    Rows(Vec<Row>),
    /// Scalar, value list, or grouped data
    Value(Value),
}

impl QueryOutput {
    /// Returns the rows, failing if the query produced something else
    pub fn into_rows(self) -> EngineResult<Vec<Row>> {
        match self {
            QueryOutput::Rows(rows) => Ok(rows),
            QueryOutput::Value(Value::Array(items)) if items.is_empty() => Ok(Vec::new()),
            QueryOutput::Value(other) => Err(EngineError::Query(format!(
                "expected a row sequence, found {}",
                other
            ))),
        }
    }

    /// Returns the result as a single JSON value
    pub fn into_value(self) -> Value {
        match self {
            QueryOutput::Rows(rows) => Value::Array(rows.into_iter().map(Value::Object).collect()),
            QueryOutput::Value(value) => value,
        }
    }
}

/// A table-oriented database reachable by the adapter
pub trait Engine: Send + Sync {
    /// Creates a table; `TableExists` if it is already there
    fn table_create<'a>(&'a self, table: &'a str) -> EngineFuture<'a, ()>;

    /// Creates a secondary index; `IndexExists` if it is already there
    fn index_create<'a>(&'a self, table: &'a str, field: &'a str) -> EngineFuture<'a, ()>;

    /// Fetches a row by primary key
    fn get<'a>(&'a self, table: &'a str, id: &'a str) -> EngineFuture<'a, Option<Row>>;

    /// Inserts a row keyed by its `id` column
    fn insert<'a>(
        &'a self,
        table: &'a str,
        row: Row,
        conflict: Conflict,
    ) -> EngineFuture<'a, WriteSummary>;

    /// Runs a query to completion
    fn run<'a>(&'a self, table: &'a str, query: &'a TableQuery) -> EngineFuture<'a, QueryOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_into_rows() {
        let rows = QueryOutput::Rows(vec![Row::new()]).into_rows().unwrap();
        assert_eq!(rows.len(), 1);

        assert!(QueryOutput::Value(json!(3)).into_rows().is_err());
        assert!(QueryOutput::Value(json!([])).into_rows().unwrap().is_empty());
    }

    #[test]
    fn test_output_into_value() {
        let mut row = Row::new();
        row.insert("a".into(), json!(1));
        assert_eq!(QueryOutput::Rows(vec![row]).into_value(), json!([{"a": 1}]));
        assert_eq!(QueryOutput::Value(json!(7)).into_value(), json!(7));
    }
}
