//! Adapter configuration
//!
//! Loaded from JSON (file or string) or built in code; immutable once the
//! adapter is constructed.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, AdapterResult};
use crate::observability::Severity;

/// Adapter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Allow `$where` and `$mapReduce` queries (default: false)
    #[serde(default)]
    pub allow_js_queries: bool,

    /// Allow `$aggregate` queries (default: false)
    #[serde(default)]
    pub allow_aggregate_queries: bool,

    /// Shorthand for both flags above (default: false)
    #[serde(default)]
    pub allow_all_queries: bool,

    /// Delay before re-issuing a poll-mode query against the replica
    /// (default: 300)
    #[serde(default = "default_poll_settle_delay_ms")]
    pub poll_settle_delay_ms: u64,

    /// Suffix naming a collection's oplog table (default: "_ops")
    #[serde(default = "default_oplog_suffix")]
    pub oplog_suffix: String,

    /// Collection names callers may not use (default: ["system"])
    #[serde(default = "default_reserved_collections")]
    pub reserved_collections: Vec<String>,

    /// Minimum severity written by the logger (default: "info")
    ///
    /// The logger threshold is process-wide; the most recently constructed
    /// adapter sets it.
    #[serde(default)]
    pub log_level: Severity,
}

fn default_poll_settle_delay_ms() -> u64 {
    300
}

fn default_oplog_suffix() -> String {
    "_ops".to_string()
}

fn default_reserved_collections() -> Vec<String> {
    vec!["system".to_string()]
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            allow_js_queries: false,
            allow_aggregate_queries: false,
            allow_all_queries: false,
            poll_settle_delay_ms: default_poll_settle_delay_ms(),
            oplog_suffix: default_oplog_suffix(),
            reserved_collections: default_reserved_collections(),
            log_level: Severity::default(),
        }
    }
}

impl AdapterConfig {
    /// Config with every feature gate open
    pub fn allow_all() -> Self {
        Self {
            allow_all_queries: true,
            ..Default::default()
        }
    }

    /// Parses a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> AdapterResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AdapterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> AdapterResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AdapterError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Rejects configurations the adapter cannot run with
    pub fn validate(&self) -> AdapterResult<()> {
        if self.oplog_suffix.is_empty() {
            return Err(AdapterError::Config(
                "oplog_suffix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn js_queries_allowed(&self) -> bool {
        self.allow_all_queries || self.allow_js_queries
    }

    pub fn aggregate_queries_allowed(&self) -> bool {
        self.allow_all_queries || self.allow_aggregate_queries
    }

    pub fn poll_settle_delay(&self) -> Duration {
        Duration::from_millis(self.poll_settle_delay_ms)
    }

    /// Name of the oplog table backing `collection`
    pub fn oplog_table(&self, collection: &str) -> String {
        format!("{}{}", collection, self.oplog_suffix)
    }

    /// Rejects oplog table names and reserved names
    pub fn is_valid_collection_name(&self, collection: &str) -> bool {
        !collection.ends_with(&self.oplog_suffix)
            && !self.reserved_collections.iter().any(|r| r == collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert!(!config.js_queries_allowed());
        assert!(!config.aggregate_queries_allowed());
        assert_eq!(config.poll_settle_delay(), Duration::from_millis(300));
        assert_eq!(config.oplog_table("docs"), "docs_ops");
        assert_eq!(config.log_level, Severity::Info);
    }

    #[test]
    fn test_log_level_from_json() {
        let config = AdapterConfig::from_json_str(r#"{"log_level": "warn"}"#).unwrap();
        assert_eq!(config.log_level, Severity::Warn);
        assert!(matches!(
            AdapterConfig::from_json_str(r#"{"log_level": "verbose"}"#),
            Err(AdapterError::Config(_))
        ));
    }

    #[test]
    fn test_allow_all_opens_both_gates() {
        let config = AdapterConfig::allow_all();
        assert!(config.js_queries_allowed());
        assert!(config.aggregate_queries_allowed());
    }

    #[test]
    fn test_collection_name_rules() {
        let config = AdapterConfig::default();
        assert!(config.is_valid_collection_name("docs"));
        assert!(config.is_valid_collection_name("ops_log"));
        assert!(!config.is_valid_collection_name("docs_ops"));
        assert!(!config.is_valid_collection_name("system"));
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            AdapterConfig::from_json_str(r#"{"allow_aggregate_queries": true}"#).unwrap();
        assert!(config.aggregate_queries_allowed());
        assert!(!config.js_queries_allowed());
        assert_eq!(config.oplog_suffix, "_ops");
    }

    #[test]
    fn test_from_json_rejects_empty_suffix() {
        assert!(matches!(
            AdapterConfig::from_json_str(r#"{"oplog_suffix": ""}"#),
            Err(AdapterError::Config(_))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"poll_settle_delay_ms": 25, "reserved_collections": ["system", "admin"]}}"#
        )
        .unwrap();

        let config = AdapterConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.poll_settle_delay(), Duration::from_millis(25));
        assert!(!config.is_valid_collection_name("admin"));
    }

    #[test]
    fn test_from_json_file_missing() {
        assert!(matches!(
            AdapterConfig::from_json_file("/nonexistent/aerolive.json"),
            Err(AdapterError::Config(_))
        ));
    }
}
