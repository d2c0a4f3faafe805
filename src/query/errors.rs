//! Query translation errors
//!
//! Error codes:
//! - AERO_UNSUPPORTED_OPERATOR
//! - AERO_TRANSLATION_FAILED

use thiserror::Error;

/// Result type for query normalization and compilation
pub type QueryResult<T> = Result<T, QueryError>;

/// The query uses a dialect feature outside the supported subset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Operator the target engine has no equivalent for
    #[error("unsupported query operator: {0}")]
    UnsupportedOperator(String),

    /// Directive present but malformed
    #[error("query translation failed: {0}")]
    TranslationError(String),
}

impl QueryError {
    pub(crate) fn unsupported(op: impl Into<String>) -> Self {
        QueryError::UnsupportedOperator(op.into())
    }

    pub(crate) fn translation(reason: impl Into<String>) -> Self {
        QueryError::TranslationError(reason.into())
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::UnsupportedOperator(_) => "AERO_UNSUPPORTED_OPERATOR",
            QueryError::TranslationError(_) => "AERO_TRANSLATION_FAILED",
        }
    }
}
