//! Target-engine errors
//!
//! These pass through the adapter unchanged.

use thiserror::Error;

/// Result type for engine calls
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by a table engine or polling replica
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Table creation raced or was repeated
    #[error("Table `{0}` already exists")]
    TableExists(String),

    /// Index creation raced or was repeated
    #[error("Index `{index}` already exists on table `{table}`")]
    IndexExists { table: String, index: String },

    /// Table has not been created
    #[error("Table `{0}` does not exist")]
    TableNotFound(String),

    /// Insert conflicted with an existing primary key under `Conflict::Error`
    #[error("Duplicate primary key `{0}`")]
    DuplicateKey(String),

    /// Query failed to evaluate
    #[error("Query error: {0}")]
    Query(String),

    /// Transport or availability failure
    #[error("Connection error: {0}")]
    Connection(String),
}

impl EngineError {
    /// Returns true for the "already exists" class that bootstrap tolerates
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            EngineError::TableExists(_) | EngineError::IndexExists { .. }
        )
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::TableExists(_) => "AERO_ENGINE_TABLE_EXISTS",
            EngineError::IndexExists { .. } => "AERO_ENGINE_INDEX_EXISTS",
            EngineError::TableNotFound(_) => "AERO_ENGINE_TABLE_NOT_FOUND",
            EngineError::DuplicateKey(_) => "AERO_ENGINE_DUPLICATE_KEY",
            EngineError::Query(_) => "AERO_ENGINE_QUERY",
            EngineError::Connection(_) => "AERO_ENGINE_CONNECTION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_class() {
        assert!(EngineError::TableExists("t".into()).is_already_exists());
        assert!(EngineError::IndexExists {
            table: "t".into(),
            index: "v".into()
        }
        .is_already_exists());
        assert!(!EngineError::TableNotFound("t".into()).is_already_exists());
        assert!(!EngineError::Connection("down".into()).is_already_exists());
    }
}
