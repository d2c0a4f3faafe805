use serde::Serialize;
use serde_json::Value;

use crate::codec::DocEnvelope;

/// Outcome of a query
///
/// Special forms leave `results` empty and put their value in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub results: Vec<DocEnvelope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl QueryResult {
    pub fn documents(results: Vec<DocEnvelope>) -> Self {
        Self {
            results,
            extra: None,
        }
    }

    pub fn extra(extra: Value) -> Self {
        Self {
            results: Vec::new(),
            extra: Some(extra),
        }
    }
}
