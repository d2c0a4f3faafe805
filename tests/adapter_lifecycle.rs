//! Lifecycle and Validation Tests
//!
//! - Close succeeds once, then every call fails
//! - Oplog and reserved collection names are refused before any I/O
//! - Configuration loads from JSON files with defaults

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use aerolive::{
    AdapterConfig, AdapterError, DocEnvelope, LiveDbAdapter, MemoryEngine, QueryOptions,
    ReadStrategy,
};
use serde_json::json;

fn setup(config: AdapterConfig) -> (Arc<MemoryEngine>, LiveDbAdapter) {
    let engine = Arc::new(MemoryEngine::new());
    let adapter = LiveDbAdapter::new(engine.clone(), config).unwrap();
    (engine, adapter)
}

// =============================================================================
// Close
// =============================================================================

#[tokio::test]
async fn test_close_twice() {
    let (_, adapter) = setup(AdapterConfig::default());
    assert!(adapter.close().is_ok());

    let err = adapter.close().unwrap_err();
    assert_eq!(err, AdapterError::AdapterClosed);
    assert_eq!(err.to_string(), "db already closed");
}

/// Every data call fails after close, without touching the engine.
#[tokio::test]
async fn test_calls_after_close() {
    let (engine, adapter) = setup(AdapterConfig::default());
    adapter.close().unwrap();

    let env = DocEnvelope::new("d", "json0", 1, json!({}));
    let op = json!({"v": 0}).as_object().cloned().unwrap();

    assert_eq!(
        adapter.get_snapshot("docs", "d").await,
        Err(AdapterError::AdapterClosed)
    );
    assert_eq!(
        adapter.write_snapshot("docs", "d", &env).await,
        Err(AdapterError::AdapterClosed)
    );
    assert_eq!(
        adapter.write_op("docs", "d", &op).await,
        Err(AdapterError::AdapterClosed)
    );
    assert_eq!(
        adapter.get_version("docs", "d").await,
        Err(AdapterError::AdapterClosed)
    );
    assert!(matches!(
        adapter
            .query("docs", &json!({}), &QueryOptions::default())
            .await,
        Err(AdapterError::AdapterClosed)
    ));
    assert!(matches!(
        adapter.bulk_get_snapshot(&Default::default()).await,
        Err(AdapterError::AdapterClosed)
    ));

    assert_eq!(engine.table_create_calls(), 0);
}

// =============================================================================
// Collection names
// =============================================================================

#[tokio::test]
async fn test_invalid_collection_names() {
    let (engine, adapter) = setup(AdapterConfig::default());

    for name in ["foo_ops", "system"] {
        assert_eq!(
            adapter.get_snapshot(name, "d").await,
            Err(AdapterError::InvalidCollectionName(name.to_string()))
        );
        assert!(matches!(
            adapter.get_ops(name, "d", 0, None).await,
            Err(AdapterError::InvalidCollectionName(_))
        ));
    }
    assert_eq!(engine.table_create_calls(), 0);
}

#[tokio::test]
async fn test_custom_suffix_and_reserved_names() {
    let config = AdapterConfig {
        oplog_suffix: "__oplog".to_string(),
        reserved_collections: vec!["admin".to_string()],
        ..Default::default()
    };
    let (engine, adapter) = setup(config);

    // the default names are ordinary collections here
    assert_eq!(adapter.get_snapshot("system", "d").await, Ok(None));
    assert_eq!(adapter.get_snapshot("x_ops", "d").await, Ok(None));

    assert!(adapter.get_snapshot("admin", "d").await.is_err());
    assert!(adapter.get_snapshot("x__oplog", "d").await.is_err());

    let op = json!({"v": 0}).as_object().cloned().unwrap();
    adapter.write_op("docs", "d", &op).await.unwrap();
    assert_eq!(adapter.oplog_collection_name("docs"), "docs__oplog");
    assert_eq!(engine.row_count("docs__oplog"), 1);
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"allow_all_queries": true, "poll_settle_delay_ms": 10}}"#
    )
    .unwrap();

    let config = AdapterConfig::from_json_file(file.path()).unwrap();
    assert!(config.js_queries_allowed());
    assert!(config.aggregate_queries_allowed());

    let replica = Arc::new(MemoryEngine::new());
    let (_, adapter) = setup(config);
    let adapter = adapter.with_poll_replica(replica);
    match adapter.read_strategy() {
        ReadStrategy::PollReplica { settle_delay, .. } => {
            assert_eq!(*settle_delay, Duration::from_millis(10));
        }
        ReadStrategy::Direct => panic!("expected a poll replica"),
    }
}

#[test]
fn test_config_rejects_bad_json() {
    assert!(matches!(
        AdapterConfig::from_json_str("{not json"),
        Err(AdapterError::Config(_))
    ));
    assert!(matches!(
        AdapterConfig::from_json_str(r#"{"poll_settle_delay_ms": "soon"}"#),
        Err(AdapterError::Config(_))
    ));
}
