//! Snapshot and Oplog Tests
//!
//! End-to-end through the adapter over the in-process engine:
//! - Snapshot write/read round trips
//! - Version derivation from oplog and snapshot
//! - Oplog idempotence and range reads
//! - Bulk reads and their failure mode

use std::collections::HashMap;
use std::sync::Arc;

use aerolive::{
    AdapterConfig, AdapterError, DocEnvelope, EngineError, LiveDbAdapter, MemoryEngine, Row,
};
use serde_json::{json, Value};

fn setup() -> (Arc<MemoryEngine>, LiveDbAdapter) {
    let engine = Arc::new(MemoryEngine::new());
    let adapter = LiveDbAdapter::new(engine.clone(), AdapterConfig::default()).unwrap();
    (engine, adapter)
}

fn op(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

// =============================================================================
// Snapshots
// =============================================================================

/// A written snapshot reads back with its name and no metadata.
#[tokio::test]
async fn test_snapshot_round_trip() {
    let (_, adapter) = setup();
    let env = DocEnvelope::new("doc1", "t", 1, json!({"x": 1}));
    adapter.write_snapshot("docs", "doc1", &env).await.unwrap();

    let got = adapter.get_snapshot("docs", "doc1").await.unwrap().unwrap();
    assert_eq!(got.doc_name, "doc1");
    assert_eq!(got.doc_type.as_deref(), Some("t"));
    assert_eq!(got.v, 1);
    assert_eq!(got.data, Some(json!({"x": 1})));
    assert_eq!(got.m, None);
    assert_eq!(adapter.metrics().snapshots_written, 1);
}

/// Missing documents are not errors.
#[tokio::test]
async fn test_missing_snapshot_is_none() {
    let (_, adapter) = setup();
    assert_eq!(adapter.get_snapshot("docs", "nope").await.unwrap(), None);
}

/// Non-object payloads and soft deletes survive storage.
#[tokio::test]
async fn test_scalar_and_deleted_snapshots() {
    let (_, adapter) = setup();
    let text = DocEnvelope::new("t", "text", 2, json!("hello"));
    let gone = DocEnvelope::deleted("g", 7);
    adapter.write_snapshot("docs", "t", &text).await.unwrap();
    adapter.write_snapshot("docs", "g", &gone).await.unwrap();

    assert_eq!(adapter.get_snapshot("docs", "t").await.unwrap(), Some(text));
    let got = adapter.get_snapshot("docs", "g").await.unwrap().unwrap();
    assert!(got.is_deleted());
    assert_eq!(got.v, 7);
}

/// Projection keeps version and type even when not asked for.
#[tokio::test]
async fn test_snapshot_projection() {
    let (_, adapter) = setup();
    let env = DocEnvelope::new("d", "json0", 4, json!({"a": 1, "b": 2}));
    adapter.write_snapshot("docs", "d", &env).await.unwrap();

    let got = adapter
        .get_snapshot_projected("docs", "d", &["b".to_string()])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.data, Some(json!({"b": 2})));
    assert_eq!(got.v, 4);
}

/// Payload fields that collide with storage columns are refused.
#[tokio::test]
async fn test_reserved_payload_field_rejected() {
    let (engine, adapter) = setup();
    let env = DocEnvelope::new("d", "json0", 1, json!({"_type": "x"}));

    let err = adapter.write_snapshot("docs", "d", &env).await.unwrap_err();
    assert_eq!(err, AdapterError::ReservedField("_type".to_string()));
    assert_eq!(engine.row_count("docs"), 0);
}

// =============================================================================
// Bulk reads
// =============================================================================

#[tokio::test]
async fn test_bulk_get_across_collections() {
    let (_, adapter) = setup();
    for (c, d) in [("docs", "a"), ("docs", "b"), ("notes", "n1")] {
        let env = DocEnvelope::new(d, "json0", 1, json!({"c": c}));
        adapter.write_snapshot(c, d, &env).await.unwrap();
    }

    let mut requests = HashMap::new();
    requests.insert("docs".to_string(), vec!["a".to_string(), "x".to_string()]);
    requests.insert("notes".to_string(), vec!["n1".to_string()]);

    let results = adapter.bulk_get_snapshot(&requests).await.unwrap();
    assert_eq!(results["docs"].len(), 1);
    assert_eq!(results["docs"]["a"].data, Some(json!({"c": "docs"})));
    assert_eq!(results["notes"]["n1"].doc_name, "n1");
}

/// One failing collection fails the whole call.
#[tokio::test]
async fn test_bulk_get_partial_failure() {
    let (engine, adapter) = setup();
    let env = DocEnvelope::new("a", "json0", 1, json!({}));
    adapter.write_snapshot("docs", "a", &env).await.unwrap();
    adapter.write_snapshot("broken", "a", &env).await.unwrap();
    engine.set_unavailable("broken", true);

    let mut requests = HashMap::new();
    requests.insert("docs".to_string(), vec!["a".to_string()]);
    requests.insert("broken".to_string(), vec!["a".to_string()]);

    let err = adapter.bulk_get_snapshot(&requests).await.unwrap_err();
    assert!(matches!(err, AdapterError::Engine(EngineError::Connection(_))));
    assert_eq!(adapter.metrics().engine_errors, 1);
}

#[tokio::test]
async fn test_bulk_get_rejects_oplog_name() {
    let (_, adapter) = setup();
    let mut requests = HashMap::new();
    requests.insert("docs_ops".to_string(), vec!["a".to_string()]);

    assert!(matches!(
        adapter.bulk_get_snapshot(&requests).await,
        Err(AdapterError::InvalidCollectionName(_))
    ));
}

// =============================================================================
// Versions and oplog
// =============================================================================

#[tokio::test]
async fn test_version_of_unknown_document_is_zero() {
    let (_, adapter) = setup();
    assert_eq!(adapter.get_version("docs", "new").await.unwrap(), 0);
}

#[tokio::test]
async fn test_version_falls_back_to_snapshot() {
    let (_, adapter) = setup();
    let env = DocEnvelope::new("d", "json0", 12, json!({}));
    adapter.write_snapshot("docs", "d", &env).await.unwrap();
    assert_eq!(adapter.get_version("docs", "d").await.unwrap(), 12);
}

#[tokio::test]
async fn test_version_follows_oplog() {
    let (_, adapter) = setup();
    for v in 0..3 {
        adapter
            .write_op("docs", "d", &op(json!({"v": v, "op": []})))
            .await
            .unwrap();
    }
    assert_eq!(adapter.get_version("docs", "d").await.unwrap(), 3);
    assert_eq!(adapter.metrics().ops_written, 3);
}

/// Rewriting the same version lands on the same row.
#[tokio::test]
async fn test_write_op_idempotent() {
    let (engine, adapter) = setup();
    let first = op(json!({"v": 0, "create": {"type": "json0"}}));
    adapter.write_op("docs", "d", &first).await.unwrap();
    adapter.write_op("docs", "d", &first).await.unwrap();

    assert_eq!(engine.row_count("docs_ops"), 1);
    assert_eq!(adapter.get_ops("docs", "d", 0, None).await.unwrap(), vec![first]);
}

#[tokio::test]
async fn test_get_ops_half_open_range() {
    let (_, adapter) = setup();
    for v in 0..8 {
        adapter
            .write_op("docs", "d", &op(json!({"v": v, "seq": v * 10})))
            .await
            .unwrap();
    }

    let ops = adapter.get_ops("docs", "d", 2, Some(5)).await.unwrap();
    assert_eq!(
        ops,
        vec![
            op(json!({"v": 2, "seq": 20})),
            op(json!({"v": 3, "seq": 30})),
            op(json!({"v": 4, "seq": 40})),
        ]
    );
}

/// The oplog table and its indexes are bootstrapped once per collection.
#[tokio::test]
async fn test_oplog_bootstrap_once() {
    let (engine, adapter) = setup();
    for v in 0..4 {
        adapter
            .write_op("docs", "d", &op(json!({"v": v})))
            .await
            .unwrap();
    }
    adapter.get_ops("docs", "d", 0, None).await.unwrap();

    assert_eq!(engine.index_create_calls(), 2);
    assert_eq!(engine.indexes("docs_ops"), vec!["name".to_string(), "v".to_string()]);
}

/// A pre-existing oplog table from another process is not an error.
#[tokio::test]
async fn test_oplog_bootstrap_tolerates_existing_table() {
    use aerolive::Engine;

    let (engine, adapter) = setup();
    engine.table_create("docs_ops").await.unwrap();
    engine.index_create("docs_ops", "name").await.unwrap();

    adapter
        .write_op("docs", "d", &op(json!({"v": 0})))
        .await
        .unwrap();
    assert_eq!(adapter.get_version("docs", "d").await.unwrap(), 1);
}
