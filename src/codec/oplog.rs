//! Oplog row packing

use serde_json::Value;

use super::row::{Row, ID_KEY};

/// Column holding the owning document name on an oplog row
pub const OP_NAME_KEY: &str = "name";

/// Deterministic oplog row id for `(doc_name, v)`
pub fn op_row_id(doc_name: &str, v: u64) -> String {
    format!("{} v{}", doc_name, v)
}

/// Reads the operation's version, if it carries a usable one
pub fn op_version(op: &Row) -> Option<u64> {
    op.get("v").and_then(Value::as_u64)
}

/// Builds the oplog row for an operation at version `v`
///
/// Operation fields named `id` or `name` are overwritten by the storage keys.
pub fn pack_op(doc_name: &str, v: u64, op: &Row) -> Row {
    let mut row = op.clone();
    row.insert(ID_KEY.to_string(), Value::String(op_row_id(doc_name, v)));
    row.insert(OP_NAME_KEY.to_string(), Value::String(doc_name.to_string()));
    row
}

/// Strips the storage-only keys from an oplog row
pub fn unpack_op(mut row: Row) -> Row {
    row.remove(ID_KEY);
    row.remove(OP_NAME_KEY);
    row
}
