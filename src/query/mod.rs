//! Query subsystem for aerolive
//!
//! Turns the collaboration engine's operator-tagged query dialect into a
//! [`QueryPlan`]: a literal-equality filter plus an ordered list of closed
//! [`Step`]s that the target engine applies after the filter.
//!
//! # Pipeline (strict order)
//!
//! 1. Normalize: split directive keys from selector keys, box selectors
//!    under `$query`, inject the soft-delete selector
//! 2. Compile selectors: literals into the filter, comparison operators
//!    into `Filter` steps
//! 3. Recognize the special form (distinct, aggregate, count) or, for
//!    plain finds, the cursor modifiers
//!
//! Compilation is pure; no I/O happens here.
//!
//! # Supported operators
//!
//! `$ne $eq $gt $gte $lt $lte`, compiled to `ne eq gt ge lt le`.

mod compiler;
mod errors;
mod normalize;
mod plan;

pub use compiler::compile;
pub use errors::{QueryError, QueryResult};
pub use normalize::{
    is_cursor_operator, is_directive, is_meta_operator, needs_poll_mode, normalize,
    NormalizedQuery, CURSOR_OPERATORS, META_OPERATORS, POLL_MODE_DIRECTIVES,
};
pub use plan::{Comparator, OrderKey, Predicate, QueryForm, QueryPlan, RowShape, Step};
