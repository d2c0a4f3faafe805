//! Query normalization
//!
//! A normalized query keeps directive keys at the top level and every
//! selector under `$query`. Deleted documents keep a `null` type, so a
//! `_type != null` selector is added unless the caller supplied one.

use serde_json::{json, Map, Value};

use super::errors::{QueryError, QueryResult};

/// Directive keys that never act as selectors
pub const META_OPERATORS: [&str; 18] = [
    "$comment",
    "$explain",
    "$hint",
    "$maxScan",
    "$max",
    "$min",
    "$orderby",
    "$returnKey",
    "$showDiskLoc",
    "$snapshot",
    "$count",
    "$aggregate",
    "$distinct",
    "$field",
    "$mapReduce",
    "$map",
    "$reduce",
    "$scope",
];

/// Cursor modifiers
pub const CURSOR_OPERATORS: [&str; 2] = ["$limit", "$skip"];

/// Directives whose results cannot be maintained incrementally
pub const POLL_MODE_DIRECTIVES: [&str; 4] = ["$orderby", "$limit", "$skip", "$count"];

const QUERY_KEY: &str = "$query";
const TYPE_SELECTOR: &str = "_type";

pub fn is_meta_operator(key: &str) -> bool {
    META_OPERATORS.contains(&key)
}

pub fn is_cursor_operator(key: &str) -> bool {
    CURSOR_OPERATORS.contains(&key)
}

/// Returns true for keys that stay at the top level during normalization
pub fn is_directive(key: &str) -> bool {
    is_meta_operator(key) || is_cursor_operator(key)
}

/// True iff the query uses `$orderby`, `$limit`, `$skip` or `$count`
///
/// Works on raw and normalized queries alike, since directives sit at the
/// top level in both.
pub fn needs_poll_mode(query: &Value) -> bool {
    match query.as_object() {
        Some(obj) => POLL_MODE_DIRECTIVES.iter().any(|k| obj.contains_key(*k)),
        None => false,
    }
}

/// A query split into selectors and directives
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuery {
    /// Contents of `$query`
    pub selector: Map<String, Value>,
    /// Every other top-level key
    pub directives: Map<String, Value>,
}

impl NormalizedQuery {
    /// Returns a directive if it is present and not `null`
    pub fn directive(&self, key: &str) -> Option<&Value> {
        self.directives.get(key).filter(|v| !v.is_null())
    }

    /// Returns true if the directive is present and not `null` or `false`
    pub fn has_directive(&self, key: &str) -> bool {
        !matches!(self.directive(key), None | Some(Value::Bool(false)))
    }

    /// Renders the `{ "$query": {...}, <directives> }` form
    pub fn to_value(&self) -> Value {
        let mut out = self.directives.clone();
        out.insert(QUERY_KEY.to_string(), Value::Object(self.selector.clone()));
        Value::Object(out)
    }
}

/// Normalizes an engine-style query without touching the caller's value
pub fn normalize(input: &Value) -> QueryResult<NormalizedQuery> {
    let obj = input
        .as_object()
        .ok_or_else(|| QueryError::translation("query must be an object"))?;

    let mut query = match obj.get(QUERY_KEY) {
        Some(boxed) => {
            let selector = boxed
                .as_object()
                .cloned()
                .ok_or_else(|| QueryError::translation("$query must be an object"))?;
            let mut directives = obj.clone();
            directives.remove(QUERY_KEY);
            NormalizedQuery {
                selector,
                directives,
            }
        }
        None => {
            let mut query = NormalizedQuery {
                selector: Map::new(),
                directives: Map::new(),
            };
            for (key, value) in obj {
                if is_directive(key) {
                    query.directives.insert(key.clone(), value.clone());
                } else {
                    query.selector.insert(key.clone(), value.clone());
                }
            }
            query
        }
    };

    let has_type = matches!(query.selector.get(TYPE_SELECTOR), Some(v) if !v.is_null());
    if !has_type {
        query
            .selector
            .insert(TYPE_SELECTOR.to_string(), json!({"$ne": null}));
    }

    Ok(query)
}
