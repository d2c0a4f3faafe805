//! Adapter error types
//!
//! Validation failures (closed adapter, bad collection name, disabled query
//! type) and translation failures are reported before any I/O. Engine
//! failures pass through unchanged inside `Engine`. Missing documents are
//! never errors.

use thiserror::Error;

use crate::codec::CodecError;
use crate::engine::EngineError;
use crate::query::QueryError;

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors returned by the adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    // ==================
    // Validation
    // ==================
    /// Operation attempted after `close`
    #[error("db already closed")]
    AdapterClosed,

    /// Collection name is reserved
    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    /// Feature-gated query attempted without its flag
    #[error("{0}")]
    DisabledQueryType(String),

    /// Configuration rejected
    #[error("Configuration error: {0}")]
    Config(String),

    // ==================
    // Translation
    // ==================
    /// Query operator outside the supported subset
    #[error("Unsupported query operator: {0}")]
    UnsupportedOperator(String),

    /// Malformed directive
    #[error("Query translation failed: {0}")]
    TranslationError(String),

    // ==================
    // Codec
    // ==================
    /// Object payload field collides with a reserved row key
    #[error("Payload field '{0}' collides with a reserved row key")]
    ReservedField(String),

    /// Stored row cannot be decoded
    #[error("Malformed row: {0}")]
    MalformedRow(String),

    // ==================
    // Engine
    // ==================
    /// Target engine or polling replica failure
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl AdapterError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::AdapterClosed => "AERO_ADAPTER_CLOSED",
            AdapterError::InvalidCollectionName(_) => "AERO_INVALID_COLLECTION",
            AdapterError::DisabledQueryType(_) => "AERO_QUERY_DISABLED",
            AdapterError::Config(_) => "AERO_CONFIG_INVALID",
            AdapterError::UnsupportedOperator(_) => "AERO_UNSUPPORTED_OPERATOR",
            AdapterError::TranslationError(_) => "AERO_TRANSLATION_FAILED",
            AdapterError::ReservedField(_) => "AERO_RESERVED_FIELD",
            AdapterError::MalformedRow(_) => "AERO_MALFORMED_ROW",
            AdapterError::Engine(e) => e.code(),
        }
    }

    /// Returns true if the error originated in the target engine
    pub fn is_engine(&self) -> bool {
        matches!(self, AdapterError::Engine(_))
    }
}

impl From<QueryError> for AdapterError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::UnsupportedOperator(op) => AdapterError::UnsupportedOperator(op),
            QueryError::TranslationError(reason) => AdapterError::TranslationError(reason),
        }
    }
}

impl From<CodecError> for AdapterError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::ReservedField(field) => AdapterError::ReservedField(field),
            CodecError::MalformedRow(reason) => AdapterError::MalformedRow(reason),
        }
    }
}
