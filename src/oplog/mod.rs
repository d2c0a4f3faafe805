//! Oplog subsystem for aerolive
//!
//! Append-only per-document operation log, stored in a sibling table named
//! `<collection><suffix>`. Rows are keyed `"<docName> v<version>"`, so a
//! retried write of the same version lands on the same row.
//!
//! # Bootstrap
//!
//! The first access per collection creates the oplog table and its `name`
//! and `v` indexes. Creation failures are tolerated; see
//! [`crate::bootstrap`].

mod store;

pub use store::OplogStore;
