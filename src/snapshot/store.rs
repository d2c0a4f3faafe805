//! Snapshot reads and writes

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::try_join_all;
use serde_json::Value;

use crate::bootstrap::{ensure_table, BootstrapCache};
use crate::codec::{self, DocEnvelope, Row, ID_KEY, VERSION_KEY};
use crate::engine::{Conflict, Engine, TableQuery, WriteSummary};
use crate::error::{AdapterError, AdapterResult};
use crate::query::{Predicate, Step};

/// Snapshot store over a collection's snapshot table
pub struct SnapshotStore {
    engine: Arc<dyn Engine>,
    tables: BootstrapCache,
}

impl SnapshotStore {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            tables: BootstrapCache::new(),
        }
    }

    /// Creates the collection's table on first use
    pub async fn ensure_table(&self, collection: &str) {
        ensure_table(self.engine.as_ref(), &self.tables, collection).await;
    }

    /// Returns true once the collection's table has been bootstrapped
    pub fn is_table_ensured(&self, collection: &str) -> bool {
        self.tables.is_ensured(collection)
    }

    /// Fetches and decodes a document; `None` if it does not exist
    pub async fn get(
        &self,
        collection: &str,
        doc_name: &str,
    ) -> AdapterResult<Option<DocEnvelope>> {
        self.ensure_table(collection).await;
        let row = self.engine.get(collection, doc_name).await?;
        Ok(codec::unpack(row)?)
    }

    /// Fetches a document restricted to `fields` plus the reserved keys
    pub async fn get_projected(
        &self,
        collection: &str,
        doc_name: &str,
        fields: &[String],
    ) -> AdapterResult<Option<DocEnvelope>> {
        self.ensure_table(collection).await;
        let query = TableQuery::filtered(id_filter(doc_name))
            .then(Step::Pluck(codec::projection_from_fields(fields)));
        let row = self
            .engine
            .run(collection, &query)
            .await?
            .into_rows()?
            .into_iter()
            .next();
        Ok(codec::unpack(row)?)
    }

    /// Fetches many documents across collections
    ///
    /// One query per collection, issued concurrently. The first failure
    /// aborts the whole call. Missing documents are simply absent from the
    /// per-collection map.
    pub async fn bulk_get(
        &self,
        requests: &HashMap<String, Vec<String>>,
    ) -> AdapterResult<HashMap<String, HashMap<String, DocEnvelope>>> {
        let lookups = requests.iter().map(|(collection, doc_names)| async move {
            let found = self.get_many(collection, doc_names).await?;
            Ok::<_, AdapterError>((collection.clone(), found))
        });
        Ok(try_join_all(lookups).await?.into_iter().collect())
    }

    async fn get_many(
        &self,
        collection: &str,
        doc_names: &[String],
    ) -> AdapterResult<HashMap<String, DocEnvelope>> {
        self.ensure_table(collection).await;
        let query = TableQuery::all().then(Step::Filter(Predicate::Contains {
            field: ID_KEY.to_string(),
            values: doc_names.iter().cloned().map(Value::String).collect(),
        }));
        let rows = self.engine.run(collection, &query).await?.into_rows()?;

        let mut found = HashMap::with_capacity(rows.len());
        for row in rows {
            if let Some(envelope) = codec::unpack(Some(row))? {
                found.insert(envelope.doc_name.clone(), envelope);
            }
        }
        Ok(found)
    }

    /// Encodes and upserts a document
    pub async fn write(
        &self,
        collection: &str,
        doc_name: &str,
        envelope: &DocEnvelope,
    ) -> AdapterResult<WriteSummary> {
        let row = codec::pack(doc_name, envelope)?;
        self.ensure_table(collection).await;
        Ok(self
            .engine
            .insert(collection, row, Conflict::Replace)
            .await?)
    }

    /// Stored `_v` of a document; `None` if it does not exist
    pub async fn stored_version(
        &self,
        collection: &str,
        doc_name: &str,
    ) -> AdapterResult<Option<u64>> {
        self.ensure_table(collection).await;
        match self.engine.get(collection, doc_name).await? {
            None => Ok(None),
            Some(row) => row
                .get(VERSION_KEY)
                .and_then(Value::as_u64)
                .map(Some)
                .ok_or_else(|| {
                    AdapterError::MalformedRow(format!(
                        "row '{}' has no valid '{}'",
                        doc_name, VERSION_KEY
                    ))
                }),
        }
    }
}

fn id_filter(doc_name: &str) -> Row {
    let mut filter = Row::new();
    filter.insert(ID_KEY.to_string(), Value::String(doc_name.to_string()));
    filter
}
