//! Snapshot row packing
//!
//! `unpack(Some(pack(name, e))) == Some(e)` holds for every envelope named
//! `name` whose payload is defined. An absent payload and a `null` payload
//! both come back as `None`.

use serde_json::{Map, Value};

use super::envelope::DocEnvelope;
use super::errors::{CodecError, CodecResult};

/// A flat storage row
pub type Row = Map<String, Value>;

/// Primary key column
pub const ID_KEY: &str = "id";
/// OT type column
pub const TYPE_KEY: &str = "_type";
/// Version column
pub const VERSION_KEY: &str = "_v";
/// Metadata column
pub const META_KEY: &str = "_m";
/// Column holding non-object payloads
pub const DATA_KEY: &str = "_data";

/// All keys the codec owns inside a snapshot row
pub const RESERVED_KEYS: [&str; 5] = [ID_KEY, TYPE_KEY, VERSION_KEY, META_KEY, DATA_KEY];

/// Returns true if `key` is owned by the codec
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Encodes an envelope into a storage row keyed by `doc_name`
///
/// Object payloads whose fields collide with a reserved key are rejected
/// with `CodecError::ReservedField`.
pub fn pack(doc_name: &str, envelope: &DocEnvelope) -> CodecResult<Row> {
    let mut row = match &envelope.data {
        Some(Value::Object(fields)) => {
            if let Some(key) = fields.keys().find(|k| is_reserved_key(k)) {
                return Err(CodecError::ReservedField(key.clone()));
            }
            fields.clone()
        }
        other => {
            let mut row = Row::new();
            row.insert(DATA_KEY.to_string(), other.clone().unwrap_or(Value::Null));
            row
        }
    };

    row.insert(
        TYPE_KEY.to_string(),
        envelope
            .doc_type
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    row.insert(VERSION_KEY.to_string(), Value::from(envelope.v));
    if let Some(m) = &envelope.m {
        row.insert(META_KEY.to_string(), m.clone());
    }
    row.insert(ID_KEY.to_string(), Value::String(doc_name.to_string()));
    Ok(row)
}

/// Decodes a storage row; `None` means the document does not exist
pub fn unpack(row: Option<Row>) -> CodecResult<Option<DocEnvelope>> {
    let mut row = match row {
        Some(row) => row,
        None => return Ok(None),
    };

    let doc_name = match row.remove(ID_KEY) {
        Some(Value::String(name)) => name,
        other => {
            return Err(CodecError::MalformedRow(format!(
                "'{}' must be a string, found {:?}",
                ID_KEY, other
            )))
        }
    };

    let doc_type = match row.remove(TYPE_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::String(t)) => Some(t),
        Some(other) => {
            return Err(CodecError::MalformedRow(format!(
                "'{}' must be a string or null, found {}",
                TYPE_KEY, other
            )))
        }
    };

    let v = match row.remove(VERSION_KEY) {
        Some(v) => v.as_u64().ok_or_else(|| {
            CodecError::MalformedRow(format!(
                "'{}' must be a non-negative integer, found {}",
                VERSION_KEY, v
            ))
        })?,
        None => {
            return Err(CodecError::MalformedRow(format!(
                "row '{}' has no '{}'",
                doc_name, VERSION_KEY
            )))
        }
    };

    let m = match row.remove(META_KEY) {
        None | Some(Value::Null) => None,
        Some(m) => Some(m),
    };

    // An explicit _data column wins; any other fields left on such a row are dropped.
    let data = match row.remove(DATA_KEY) {
        Some(Value::Null) => None,
        Some(data) => Some(data),
        None => Some(Value::Object(row)),
    };

    Ok(Some(DocEnvelope {
        data,
        doc_type,
        v,
        m,
        doc_name,
    }))
}

/// Column list for a projected read: the requested fields plus every
/// reserved key, so the envelope can still be rebuilt
pub fn projection_from_fields(fields: &[String]) -> Vec<String> {
    let mut plucked: Vec<String> = fields
        .iter()
        .filter(|f| !is_reserved_key(f))
        .cloned()
        .collect();
    plucked.extend(RESERVED_KEYS.iter().map(|k| k.to_string()));
    plucked
}
