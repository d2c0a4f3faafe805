//! Codec errors
//!
//! Error codes:
//! - AERO_RESERVED_FIELD
//! - AERO_MALFORMED_ROW

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while packing or unpacking storage rows
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// An object payload carries a field that collides with a reserved row key
    #[error("payload field '{0}' collides with a reserved row key")]
    ReservedField(String),

    /// A stored row does not have the shape written by `pack`
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

impl CodecError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::ReservedField(_) => "AERO_RESERVED_FIELD",
            CodecError::MalformedRow(_) => "AERO_MALFORMED_ROW",
        }
    }
}
