//! Snapshot subsystem for aerolive
//!
//! One row per document in the collection's own table, keyed by document
//! name. Reads never fail for a missing document; writes replace the stored
//! row wholesale (last writer wins, no version check).
//!
//! The snapshot table is created on first use per collection; see
//! [`crate::bootstrap`].

mod store;

pub use store::SnapshotStore;
