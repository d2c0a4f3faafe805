//! The adapter the collaboration engine talks to

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::config::AdapterConfig;
use super::options::{QueryMode, QueryOptions, ReadStrategy};
use crate::codec::{DocEnvelope, Row};
use crate::driver::{QueryDriver, QueryResult};
use crate::engine::Engine;
use crate::error::{AdapterError, AdapterResult};
use crate::observability::{AdapterMetrics, Event, Logger, MetricsSnapshot};
use crate::oplog::OplogStore;
use crate::query::{self, NormalizedQuery};
use crate::snapshot::SnapshotStore;

const WHERE_SELECTOR: &str = "$where";

/// Storage adapter between a collaboration engine and a table engine
pub struct LiveDbAdapter {
    engine: Arc<dyn Engine>,
    config: AdapterConfig,
    strategy: ReadStrategy,
    snapshots: SnapshotStore,
    oplog: OplogStore,
    metrics: AdapterMetrics,
    closed: AtomicBool,
}

impl LiveDbAdapter {
    /// Creates an adapter over `engine`
    pub fn new(engine: Arc<dyn Engine>, config: AdapterConfig) -> AdapterResult<Self> {
        config.validate()?;
        Logger::set_min_severity(config.log_level);
        let snapshots = SnapshotStore::new(Arc::clone(&engine));
        let oplog = OplogStore::new(Arc::clone(&engine), config.oplog_suffix.clone());

        let js = config.js_queries_allowed().to_string();
        let aggregate = config.aggregate_queries_allowed().to_string();
        Logger::info(
            Event::AdapterOpen,
            &[
                ("allow_aggregate_queries", aggregate.as_str()),
                ("allow_js_queries", js.as_str()),
                ("oplog_suffix", config.oplog_suffix.as_str()),
            ],
        );

        Ok(Self {
            engine,
            config,
            strategy: ReadStrategy::Direct,
            snapshots,
            oplog,
            metrics: AdapterMetrics::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Serves poll-mode queries and single-document matches from `replica`
    pub fn with_poll_replica(mut self, replica: Arc<dyn Engine>) -> Self {
        self.strategy = ReadStrategy::PollReplica {
            replica,
            settle_delay: self.config.poll_settle_delay(),
        };
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn read_strategy(&self) -> &ReadStrategy {
        &self.strategy
    }

    /// Current counter values
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Marks the adapter closed; the second call fails
    ///
    /// The engine connection is left untouched.
    pub fn close(&self) -> AdapterResult<()> {
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AdapterError::AdapterClosed)?;
        Logger::info(Event::AdapterClosed, &[]);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Name of the oplog table for `collection`
    pub fn oplog_collection_name(&self, collection: &str) -> String {
        self.oplog.table_name(collection)
    }

    // ==================
    // Snapshots
    // ==================

    pub async fn get_snapshot(
        &self,
        collection: &str,
        doc_name: &str,
    ) -> AdapterResult<Option<DocEnvelope>> {
        self.check(collection)?;
        let result = self.snapshots.get(collection, doc_name).await;
        self.observe(result)
    }

    /// Like [`get_snapshot`](Self::get_snapshot), restricted to `fields`
    pub async fn get_snapshot_projected(
        &self,
        collection: &str,
        doc_name: &str,
        fields: &[String],
    ) -> AdapterResult<Option<DocEnvelope>> {
        self.check(collection)?;
        let result = self
            .snapshots
            .get_projected(collection, doc_name, fields)
            .await;
        self.observe(result)
    }

    /// Fetches many documents; keyed by collection, then document name
    pub async fn bulk_get_snapshot(
        &self,
        requests: &HashMap<String, Vec<String>>,
    ) -> AdapterResult<HashMap<String, HashMap<String, DocEnvelope>>> {
        self.check_open()?;
        for collection in requests.keys() {
            self.check_name(collection)?;
        }
        let result = self.snapshots.bulk_get(requests).await;
        self.observe(result)
    }

    pub async fn write_snapshot(
        &self,
        collection: &str,
        doc_name: &str,
        envelope: &DocEnvelope,
    ) -> AdapterResult<()> {
        self.check(collection)?;
        let result = self.snapshots.write(collection, doc_name, envelope).await;
        self.observe(result)?;

        self.metrics.increment_snapshots_written();
        let v = envelope.v.to_string();
        Logger::trace(
            Event::SnapshotWrite,
            &[
                ("collection", collection),
                ("doc", doc_name),
                ("v", v.as_str()),
            ],
        );
        Ok(())
    }

    // ==================
    // Oplog
    // ==================

    /// Appends an operation
    ///
    /// # Panics
    ///
    /// Panics if `op` carries no `v`. A `v` that is not a non-negative
    /// integer is a `TranslationError`.
    pub async fn write_op(&self, collection: &str, doc_name: &str, op: &Row) -> AdapterResult<()> {
        self.check(collection)?;
        let result = self.oplog.write_op(collection, doc_name, op).await;
        self.observe(result)?;

        self.metrics.increment_ops_written();
        let v = op.get("v").map(Value::to_string).unwrap_or_default();
        Logger::trace(
            Event::OpWrite,
            &[
                ("collection", collection),
                ("doc", doc_name),
                ("v", v.as_str()),
            ],
        );
        Ok(())
    }

    /// Next version to write for a document
    pub async fn get_version(&self, collection: &str, doc_name: &str) -> AdapterResult<u64> {
        self.check(collection)?;
        let result = self
            .oplog
            .get_version(&self.snapshots, collection, doc_name)
            .await;
        self.observe(result)
    }

    /// Operations with `start <= v < end`, ascending
    pub async fn get_ops(
        &self,
        collection: &str,
        doc_name: &str,
        start: u64,
        end: Option<u64>,
    ) -> AdapterResult<Vec<Row>> {
        self.check(collection)?;
        let result = self.oplog.get_ops(collection, doc_name, start, end).await;
        self.observe(result)
    }

    // ==================
    // Queries
    // ==================

    pub async fn query(
        &self,
        collection: &str,
        query: &Value,
        options: &QueryOptions,
    ) -> AdapterResult<QueryResult> {
        self.query_projected(collection, None, query, options).await
    }

    /// Runs a query, projected to `fields` when given
    ///
    /// Poll-mode queries go to the replica, if one is configured, after the
    /// settling delay.
    pub async fn query_projected(
        &self,
        collection: &str,
        fields: Option<&[String]>,
        query: &Value,
        options: &QueryOptions,
    ) -> AdapterResult<QueryResult> {
        self.check(collection)?;
        let normalized = self.prepare(collection, query)?;
        let map_reduce = options.map_reduce.as_ref();

        let result = match (options.mode, self.strategy.replica()) {
            (QueryMode::Poll, Some((replica, delay))) => {
                self.delegate(collection, delay).await?;
                QueryDriver::execute(replica, collection, &normalized, fields, map_reduce).await
            }
            _ => {
                self.snapshots.ensure_table(collection).await;
                QueryDriver::execute(
                    self.engine.as_ref(),
                    collection,
                    &normalized,
                    fields,
                    map_reduce,
                )
                .await
            }
        };
        self.observe_query(collection, result)
    }

    pub async fn query_doc(
        &self,
        collection: &str,
        doc_name: &str,
        query: &Value,
    ) -> AdapterResult<Option<DocEnvelope>> {
        self.query_doc_projected(collection, doc_name, None, query)
            .await
    }

    /// Returns the document if it matches the query, `None` otherwise
    ///
    /// Served from the replica whenever one is configured.
    pub async fn query_doc_projected(
        &self,
        collection: &str,
        doc_name: &str,
        fields: Option<&[String]>,
        query: &Value,
    ) -> AdapterResult<Option<DocEnvelope>> {
        self.check(collection)?;
        let normalized = self.prepare(collection, query)?;

        let result = match self.strategy.replica() {
            Some((replica, delay)) => {
                self.delegate(collection, delay).await?;
                QueryDriver::find_one(replica, collection, doc_name, &normalized, fields).await
            }
            None => {
                self.snapshots.ensure_table(collection).await;
                QueryDriver::find_one(
                    self.engine.as_ref(),
                    collection,
                    doc_name,
                    &normalized,
                    fields,
                )
                .await
            }
        };
        self.observe_query(collection, result)
    }

    /// Always unknown: the adapter does not predict matches from operations
    pub fn will_op_make_doc_match_query(
        &self,
        _currently_matches: bool,
        _query: &Value,
        _op: &Value,
    ) -> Option<bool> {
        None
    }

    /// True if the query uses `$orderby`, `$limit`, `$skip` or `$count`
    pub fn query_needs_poll_mode(&self, query: &Value) -> bool {
        query::needs_poll_mode(query)
    }

    /// Returns the disabled-feature message for a query, if any
    pub fn check_query(&self, query: &NormalizedQuery) -> Option<String> {
        if !self.config.js_queries_allowed() {
            if matches!(query.selector.get(WHERE_SELECTOR), Some(v) if !v.is_null()) {
                return Some("$where queries disabled".to_string());
            }
            if query.directive("$mapReduce").is_some() {
                return Some("$mapReduce queries disabled".to_string());
            }
        }
        if !self.config.aggregate_queries_allowed() && query.has_directive("$aggregate") {
            return Some("$aggregate queries disabled".to_string());
        }
        None
    }

    // ==================
    // Internals
    // ==================

    fn check_open(&self) -> AdapterResult<()> {
        if self.is_closed() {
            return Err(AdapterError::AdapterClosed);
        }
        Ok(())
    }

    fn check_name(&self, collection: &str) -> AdapterResult<()> {
        if !self.config.is_valid_collection_name(collection) {
            return Err(AdapterError::InvalidCollectionName(collection.to_string()));
        }
        Ok(())
    }

    fn check(&self, collection: &str) -> AdapterResult<()> {
        self.check_open()?;
        self.check_name(collection)
    }

    /// Normalizes and applies feature gates
    fn prepare(&self, collection: &str, query: &Value) -> AdapterResult<NormalizedQuery> {
        let normalized = query::normalize(query)
            .map_err(|e| self.reject(collection, AdapterError::from(e)))?;
        match self.check_query(&normalized) {
            Some(message) => Err(self.reject(collection, AdapterError::DisabledQueryType(message))),
            None => Ok(normalized),
        }
    }

    /// Waits out the replica's settling delay; fails if closed meanwhile
    async fn delegate(&self, collection: &str, delay: Duration) -> AdapterResult<()> {
        self.metrics.increment_poll_delegations();
        let delay_ms = delay.as_millis().to_string();
        Logger::trace(
            Event::PollDelegate,
            &[("collection", collection), ("delay_ms", delay_ms.as_str())],
        );
        tokio::time::sleep(delay).await;
        self.check_open()
    }

    /// Counts and logs engine failures
    fn observe<T>(&self, result: AdapterResult<T>) -> AdapterResult<T> {
        if let Err(AdapterError::Engine(e)) = &result {
            self.metrics.increment_engine_errors();
            let error = e.to_string();
            Logger::error(
                Event::EngineError,
                &[("code", e.code()), ("error", error.as_str())],
            );
        }
        result
    }

    /// Like `observe`, and also counts executed and rejected queries
    fn observe_query<T>(&self, collection: &str, result: AdapterResult<T>) -> AdapterResult<T> {
        match result {
            Ok(value) => {
                self.metrics.increment_queries_executed();
                Ok(value)
            }
            Err(e) => self.observe(Err(self.reject(collection, e))),
        }
    }

    /// Counts and logs query rejections; other errors pass through
    fn reject(&self, collection: &str, e: AdapterError) -> AdapterError {
        if matches!(
            e,
            AdapterError::UnsupportedOperator(_)
                | AdapterError::TranslationError(_)
                | AdapterError::DisabledQueryType(_)
        ) {
            self.metrics.increment_queries_rejected();
            let error = e.to_string();
            Logger::warn(
                Event::QueryRejected,
                &[
                    ("code", e.code()),
                    ("collection", collection),
                    ("error", error.as_str()),
                ],
            );
        }
        e
    }
}
