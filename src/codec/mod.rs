//! Document codec subsystem for aerolive
//!
//! Converts between the collaboration engine's document envelope and the
//! flat rows stored in the target table engine.
//!
//! # Row Layout
//!
//! - `id`: document name (primary key)
//! - `_type`: OT type name, `null` for soft-deleted documents
//! - `_v`: snapshot version
//! - `_m`: optional metadata
//! - Object payloads are promoted field-by-field into the row; every other
//!   payload (scalar, array, absent) is stored under `_data`.
//!
//! Oplog rows carry `id = "<docName> v<version>"` and `name = <docName>` on
//! top of the operation's own fields.
//!
//! The codec performs no I/O.

mod envelope;
mod errors;
mod oplog;
mod row;

pub use envelope::DocEnvelope;
pub use errors::{CodecError, CodecResult};
pub use oplog::{op_row_id, op_version, pack_op, unpack_op, OP_NAME_KEY};
pub use row::{
    is_reserved_key, pack, projection_from_fields, unpack, Row, DATA_KEY, ID_KEY, META_KEY,
    RESERVED_KEYS, TYPE_KEY, VERSION_KEY,
};
