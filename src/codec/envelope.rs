//! Engine-facing document envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document snapshot as the collaboration engine sees it
///
/// `data: None` means "no payload" and is distinct from a payload that is
/// falsy (`0`, `""`, `false`). A JSON `null` payload is the same as no
/// payload: `new` and deserialization both store it as `None`, and storage
/// keeps it as `_data: null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocEnvelope {
    /// Opaque payload
    #[serde(default)]
    pub data: Option<Value>,

    /// OT type name, `None` once the document has been deleted
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,

    /// Snapshot version
    pub v: u64,

    /// Opaque metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m: Option<Value>,

    /// Document name within its collection
    #[serde(rename = "docName", default)]
    pub doc_name: String,
}

impl DocEnvelope {
    /// Creates an envelope with a typed payload and no metadata
    ///
    /// A `null` payload becomes `data: None`.
    pub fn new(
        doc_name: impl Into<String>,
        doc_type: impl Into<String>,
        v: u64,
        data: Value,
    ) -> Self {
        Self {
            data: match data {
                Value::Null => None,
                data => Some(data),
            },
            doc_type: Some(doc_type.into()),
            v,
            m: None,
            doc_name: doc_name.into(),
        }
    }

    /// Creates a soft-deleted envelope: no type, no payload, version kept
    pub fn deleted(doc_name: impl Into<String>, v: u64) -> Self {
        Self {
            data: None,
            doc_type: None,
            v,
            m: None,
            doc_name: doc_name.into(),
        }
    }

    /// Attaches metadata
    pub fn with_meta(mut self, m: Value) -> Self {
        self.m = Some(m);
        self
    }

    /// Returns true if the document has been soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.doc_type.is_none()
    }
}
