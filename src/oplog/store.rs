//! Oplog append, version lookup, and ranged reads

use std::sync::Arc;

use serde_json::Value;

use crate::bootstrap::{ensure_oplog, BootstrapCache};
use crate::codec::{self, Row, OP_NAME_KEY};
use crate::engine::{Conflict, Engine, TableQuery, WriteSummary};
use crate::error::{AdapterError, AdapterResult};
use crate::query::{Comparator, OrderKey, Predicate, Step};
use crate::snapshot::SnapshotStore;

const OP_VERSION_KEY: &str = "v";

/// Oplog store over `<collection><suffix>` tables
pub struct OplogStore {
    engine: Arc<dyn Engine>,
    op_indexes: BootstrapCache,
    suffix: String,
}

impl OplogStore {
    pub fn new(engine: Arc<dyn Engine>, suffix: impl Into<String>) -> Self {
        Self {
            engine,
            op_indexes: BootstrapCache::new(),
            suffix: suffix.into(),
        }
    }

    /// Name of the table holding `collection`'s operations
    pub fn table_name(&self, collection: &str) -> String {
        format!("{}{}", collection, self.suffix)
    }

    /// Creates the oplog table and indexes on first use
    pub async fn ensure_indexes(&self, collection: &str) -> String {
        let table = self.table_name(collection);
        ensure_oplog(self.engine.as_ref(), &self.op_indexes, collection, &table).await;
        table
    }

    /// Returns true once the collection's oplog bootstrap has completed
    pub fn is_bootstrapped(&self, collection: &str) -> bool {
        self.op_indexes.is_ensured(collection)
    }

    /// Upserts one operation
    ///
    /// # Panics
    ///
    /// Panics if `op` has no `v` (or `v` is null). Callers must always
    /// supply the version they are committing. A `v` that is present but not
    /// a non-negative integer is a `TranslationError`.
    pub async fn write_op(
        &self,
        collection: &str,
        doc_name: &str,
        op: &Row,
    ) -> AdapterResult<WriteSummary> {
        let v = match op.get(OP_VERSION_KEY) {
            None | Some(Value::Null) => panic!(
                "operation for '{}' has no `{}`",
                doc_name, OP_VERSION_KEY
            ),
            Some(raw) => codec::op_version(op).ok_or_else(|| {
                AdapterError::TranslationError(format!(
                    "operation `{}` for '{}' must be a non-negative integer, got {}",
                    OP_VERSION_KEY, doc_name, raw
                ))
            })?,
        };
        let row = codec::pack_op(doc_name, v, op);
        let table = self.ensure_indexes(collection).await;
        Ok(self.engine.insert(&table, row, Conflict::Replace).await?)
    }

    /// Highest stored operation version for a document
    pub async fn latest_version(
        &self,
        collection: &str,
        doc_name: &str,
    ) -> AdapterResult<Option<u64>> {
        let table = self.ensure_indexes(collection).await;
        let query = TableQuery::filtered(name_filter(doc_name))
            .then(Step::OrderBy(vec![OrderKey::desc(OP_VERSION_KEY)]))
            .then(Step::Limit(1));
        let rows = self.engine.run(&table, &query).await?.into_rows()?;
        Ok(rows.first().and_then(codec::op_version))
    }

    /// Next version to write for a document
    ///
    /// Latest oplog version + 1; with no oplog rows, the snapshot's stored
    /// version; with neither, 0. A latest version of `u64::MAX` has no
    /// successor and is reported as `MalformedRow`.
    pub async fn get_version(
        &self,
        snapshots: &SnapshotStore,
        collection: &str,
        doc_name: &str,
    ) -> AdapterResult<u64> {
        if let Some(latest) = self.latest_version(collection, doc_name).await? {
            return latest.checked_add(1).ok_or_else(|| {
                AdapterError::MalformedRow(format!(
                    "version overflow for '{}' in '{}'",
                    doc_name, collection
                ))
            });
        }
        Ok(snapshots
            .stored_version(collection, doc_name)
            .await?
            .unwrap_or(0))
    }

    /// Operations with `start <= v < end` (unbounded when `end` is `None`),
    /// ascending by version, storage keys stripped
    pub async fn get_ops(
        &self,
        collection: &str,
        doc_name: &str,
        start: u64,
        end: Option<u64>,
    ) -> AdapterResult<Vec<Row>> {
        let table = self.ensure_indexes(collection).await;
        let mut query = TableQuery::filtered(name_filter(doc_name))
            .then(version_bound(Comparator::Ge, start));
        if let Some(end) = end {
            query = query.then(version_bound(Comparator::Lt, end));
        }
        query = query.then(Step::OrderBy(vec![OrderKey::asc(OP_VERSION_KEY)]));

        let rows = self.engine.run(&table, &query).await?.into_rows()?;
        Ok(rows.into_iter().map(codec::unpack_op).collect())
    }
}

fn name_filter(doc_name: &str) -> Row {
    let mut filter = Row::new();
    filter.insert(OP_NAME_KEY.to_string(), Value::String(doc_name.to_string()));
    filter
}

fn version_bound(cmp: Comparator, bound: u64) -> Step {
    Step::Filter(Predicate::Compare {
        field: OP_VERSION_KEY.to_string(),
        cmp,
        operand: Value::from(bound),
    })
}
