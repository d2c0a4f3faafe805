//! In-process map-reduce over query rows

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::codec::Row;

/// Emits `(key, value)` pairs for one row
pub type MapFn = dyn Fn(&Row) -> Vec<(Value, Value)> + Send + Sync;

/// Folds every value emitted under one key
pub type ReduceFn = dyn Fn(&Value, &[Value]) -> Value + Send + Sync;

/// Caller-supplied map and reduce steps
#[derive(Clone)]
pub struct MapReduce {
    map: Arc<MapFn>,
    reduce: Arc<ReduceFn>,
}

impl MapReduce {
    pub fn new<M, R>(map: M, reduce: R) -> Self
    where
        M: Fn(&Row) -> Vec<(Value, Value)> + Send + Sync + 'static,
        R: Fn(&Value, &[Value]) -> Value + Send + Sync + 'static,
    {
        Self {
            map: Arc::new(map),
            reduce: Arc::new(reduce),
        }
    }

    /// Maps every row, groups by key, reduces each group once
    ///
    /// Keys compare by their JSON text; groups come out in the order their
    /// key was first emitted. Output is `[{_id: key, value: reduced}, ...]`.
    pub fn run(&self, rows: &[Row]) -> Value {
        let mut order: Vec<(Value, Vec<Value>)> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();

        for row in rows {
            for (key, value) in (self.map)(row) {
                let text = key.to_string();
                match slots.get(&text) {
                    Some(&slot) => order[slot].1.push(value),
                    None => {
                        slots.insert(text, order.len());
                        order.push((key, vec![value]));
                    }
                }
            }
        }

        Value::Array(
            order
                .into_iter()
                .map(|(key, values)| {
                    let value = (self.reduce)(&key, &values);
                    json!({"_id": key, "value": value})
                })
                .collect(),
        )
    }
}

impl fmt::Debug for MapReduce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapReduce").finish_non_exhaustive()
    }
}
