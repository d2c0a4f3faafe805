//! In-process step executor
//!
//! Evaluates a [`TableQuery`] over rows already in memory. Used by
//! [`MemoryEngine`](super::MemoryEngine) and by any engine that fetches rows
//! and evaluates the plan locally.

use std::cmp::Ordering;

use serde_json::{json, Map, Value};

use super::compare::{compare_values, values_equal};
use super::errors::{EngineError, EngineResult};
use super::{QueryOutput, Row, TableQuery};
use crate::query::{Comparator, OrderKey, Predicate, RowShape, Step};

/// Intermediate result between steps
#[derive(Debug, Clone, PartialEq)]
enum Stream {
    Seq(Vec<Value>),
    Grouped(Vec<(Value, Vec<Value>)>),
    Scalar(Value),
}

impl Stream {
    fn name(&self) -> &'static str {
        match self {
            Stream::Seq(_) => "sequence",
            Stream::Grouped(_) => "grouped data",
            Stream::Scalar(_) => "scalar",
        }
    }

    fn finish(self) -> QueryOutput {
        match self {
            Stream::Seq(items) if items.iter().all(Value::is_object) => QueryOutput::Rows(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(row) => Some(row),
                        _ => None,
                    })
                    .collect(),
            ),
            Stream::Seq(items) => QueryOutput::Value(Value::Array(items)),
            Stream::Grouped(groups) => QueryOutput::Value(Value::Array(
                groups
                    .into_iter()
                    .map(|(group, reduction)| json!({"group": group, "reduction": reduction}))
                    .collect(),
            )),
            Stream::Scalar(value) => QueryOutput::Value(value),
        }
    }
}

/// Evaluates filters and steps in order
pub struct StepExecutor;

impl StepExecutor {
    /// Runs `query` over `rows`
    pub fn execute<I>(rows: I, query: &TableQuery) -> EngineResult<QueryOutput>
    where
        I: IntoIterator<Item = Row>,
    {
        let seq = rows
            .into_iter()
            .filter(|row| Self::matches_filter(row, &query.filter))
            .map(Value::Object)
            .collect();

        let mut stream = Stream::Seq(seq);
        for step in &query.steps {
            stream = Self::apply(stream, step)?;
        }
        Ok(stream.finish())
    }

    /// Literal filter: every key present and deeply equal
    pub fn matches_filter(row: &Row, filter: &Row) -> bool {
        filter
            .iter()
            .all(|(key, expected)| matches!(row.get(key), Some(actual) if values_equal(actual, expected)))
    }

    /// Evaluates a predicate; rows missing the field never match
    pub fn matches_predicate(row: &Value, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Compare {
                field,
                cmp,
                operand,
            } => {
                let actual = match row.get(field) {
                    Some(v) => v,
                    None => return false,
                };
                let ord = compare_values(actual, operand);
                match cmp {
                    Comparator::Ne => ord != Ordering::Equal,
                    Comparator::Eq => ord == Ordering::Equal,
                    Comparator::Gt => ord == Ordering::Greater,
                    Comparator::Ge => ord != Ordering::Less,
                    Comparator::Lt => ord == Ordering::Less,
                    Comparator::Le => ord != Ordering::Greater,
                }
            }
            Predicate::Contains { field, values } => match row.get(field) {
                Some(actual) => values.iter().any(|v| values_equal(v, actual)),
                None => false,
            },
        }
    }

    fn apply(stream: Stream, step: &Step) -> EngineResult<Stream> {
        match (stream, step) {
            (Stream::Seq(items), Step::Filter(predicate)) => Ok(Stream::Seq(
                items
                    .into_iter()
                    .filter(|item| Self::matches_predicate(item, predicate))
                    .collect(),
            )),
            (Stream::Seq(mut items), Step::OrderBy(keys)) => {
                items.sort_by(|a, b| Self::order(a, b, keys));
                Ok(Stream::Seq(items))
            }
            (Stream::Seq(items), Step::Skip(n)) => Ok(Stream::Seq(
                items.into_iter().skip(*n as usize).collect(),
            )),
            (Stream::Seq(items), Step::Limit(n)) => Ok(Stream::Seq(
                items.into_iter().take(*n as usize).collect(),
            )),
            (Stream::Seq(items), Step::Pluck(fields)) => Ok(Stream::Seq(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(obj) => Value::Object(
                            obj.into_iter()
                                .filter(|(k, _)| fields.iter().any(|f| f == k))
                                .collect(),
                        ),
                        other => other,
                    })
                    .collect(),
            )),
            (Stream::Seq(items), Step::GetField(field)) => Ok(Stream::Seq(
                items
                    .iter()
                    .filter_map(|item| item.get(field).cloned())
                    .collect(),
            )),
            (Stream::Seq(mut items), Step::Distinct) => {
                items.sort_by(compare_values);
                items.dedup_by(|a, b| values_equal(a, b));
                Ok(Stream::Seq(items))
            }
            (Stream::Seq(items), Step::Group(key)) => {
                let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
                for item in items {
                    let group = match item.get(key) {
                        Some(g) => g.clone(),
                        None => continue,
                    };
                    match groups.iter_mut().find(|(g, _)| values_equal(g, &group)) {
                        Some((_, members)) => members.push(item),
                        None => groups.push((group, vec![item])),
                    }
                }
                groups.sort_by(|a, b| compare_values(&a.0, &b.0));
                Ok(Stream::Grouped(groups))
            }
            (Stream::Grouped(groups), Step::Ungroup) => Ok(Stream::Seq(
                groups
                    .into_iter()
                    .map(|(group, reduction)| json!({"group": group, "reduction": reduction}))
                    .collect(),
            )),
            (Stream::Seq(items), Step::MapRows(RowShape::GroupCount { key })) => items
                .into_iter()
                .map(|item| Self::group_count(&item, key))
                .collect::<EngineResult<Vec<Value>>>()
                .map(Stream::Seq),
            (Stream::Seq(items), Step::Count) => Ok(Stream::Scalar(Value::from(items.len()))),
            (stream, step) => Err(EngineError::Query(format!(
                "cannot apply {} to {}",
                step,
                stream.name()
            ))),
        }
    }

    fn order(a: &Value, b: &Value, keys: &[OrderKey]) -> Ordering {
        for key in keys {
            let ord = match (a.get(&key.field), b.get(&key.field)) {
                (Some(x), Some(y)) => compare_values(x, y),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn group_count(item: &Value, key: &str) -> EngineResult<Value> {
        let reduction = item
            .get("reduction")
            .and_then(Value::as_array)
            .ok_or_else(|| EngineError::Query("map expects ungrouped rows".to_string()))?;
        let id = reduction
            .first()
            .and_then(|row| row.get(key))
            .cloned()
            .unwrap_or(Value::Null);
        let mut out = Map::new();
        out.insert("_id".to_string(), id);
        out.insert("count".to_string(), Value::from(reduction.len()));
        Ok(Value::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: Vec<Value>) -> Vec<Row> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn compare(field: &str, cmp: Comparator, operand: Value) -> Step {
        Step::Filter(Predicate::Compare {
            field: field.into(),
            cmp,
            operand,
        })
    }

    #[test]
    fn test_literal_filter_deep_equality() {
        let data = rows(vec![
            json!({"id": "a", "pos": {"x": 1}}),
            json!({"id": "b", "pos": {"x": 2}}),
            json!({"id": "c"}),
        ]);
        let mut filter = Row::new();
        filter.insert("pos".into(), json!({"x": 1}));

        let out = StepExecutor::execute(data, &TableQuery::filtered(filter)).unwrap();
        let ids: Vec<Value> = out.into_rows().unwrap().into_iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a")]);
    }

    #[test]
    fn test_compare_steps() {
        let data = rows(vec![json!({"x": 3}), json!({"x": 9}), json!({"y": 1})]);
        let query = TableQuery::all().then(compare("x", Comparator::Gt, json!(5)));
        let out = StepExecutor::execute(data.clone(), &query).unwrap();
        assert_eq!(out.into_rows().unwrap(), rows(vec![json!({"x": 9})]));

        // missing field never matches, even for ne
        let query = TableQuery::all().then(compare("x", Comparator::Ne, json!(3)));
        let out = StepExecutor::execute(data, &query).unwrap();
        assert_eq!(out.into_rows().unwrap(), rows(vec![json!({"x": 9})]));
    }

    #[test]
    fn test_ne_null_excludes_deleted() {
        let data = rows(vec![
            json!({"id": "live", "_type": "json0"}),
            json!({"id": "gone", "_type": null}),
        ]);
        let query = TableQuery::all().then(compare("_type", Comparator::Ne, Value::Null));
        let out = StepExecutor::execute(data, &query).unwrap().into_rows().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], "live");
    }

    #[test]
    fn test_contains() {
        let data = rows(vec![json!({"id": "a"}), json!({"id": "b"}), json!({"id": "c"})]);
        let query = TableQuery::all().then(Step::Filter(Predicate::Contains {
            field: "id".into(),
            values: vec![json!("a"), json!("c")],
        }));
        let out = StepExecutor::execute(data, &query).unwrap().into_rows().unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_order_skip_limit() {
        let data = rows(vec![json!({"v": 2}), json!({"v": 0}), json!({"v": 3}), json!({"v": 1})]);
        let query = TableQuery::all()
            .then(Step::OrderBy(vec![OrderKey::desc("v")]))
            .then(Step::Skip(1))
            .then(Step::Limit(2));
        let out = StepExecutor::execute(data, &query).unwrap().into_rows().unwrap();
        assert_eq!(out, rows(vec![json!({"v": 2}), json!({"v": 1})]));
    }

    #[test]
    fn test_distinct_values() {
        let data = rows(vec![
            json!({"c": "red"}),
            json!({"c": "blue"}),
            json!({"c": "red"}),
            json!({"other": 1}),
        ]);
        let query = TableQuery::all()
            .then(Step::GetField("c".into()))
            .then(Step::Distinct);
        let out = StepExecutor::execute(data, &query).unwrap();
        assert_eq!(out, QueryOutput::Value(json!(["blue", "red"])));
    }

    #[test]
    fn test_group_count() {
        let data = rows(vec![
            json!({"id": "1", "y": "a"}),
            json!({"id": "2", "y": "b"}),
            json!({"id": "3", "y": "a"}),
        ]);
        let query = TableQuery::all()
            .then(Step::Group("y".into()))
            .then(Step::Ungroup)
            .then(Step::MapRows(RowShape::GroupCount { key: "y".into() }));
        let out = StepExecutor::execute(data, &query).unwrap();
        assert_eq!(
            out.into_value(),
            json!([{"_id": "a", "count": 2}, {"_id": "b", "count": 1}])
        );
    }

    #[test]
    fn test_count() {
        let data = rows(vec![json!({"a": 1}), json!({"a": 2})]);
        let out = StepExecutor::execute(data, &TableQuery::all().then(Step::Count)).unwrap();
        assert_eq!(out, QueryOutput::Value(json!(2)));
    }

    #[test]
    fn test_pluck() {
        let data = rows(vec![json!({"a": 1, "b": 2, "c": 3})]);
        let query = TableQuery::all().then(Step::Pluck(vec!["a".into(), "c".into()]));
        let out = StepExecutor::execute(data, &query).unwrap().into_rows().unwrap();
        assert_eq!(out, rows(vec![json!({"a": 1, "c": 3})]));
    }

    #[test]
    fn test_invalid_step_sequence() {
        let data = rows(vec![json!({"a": 1})]);
        let query = TableQuery::all().then(Step::Count).then(Step::Distinct);
        assert!(matches!(
            StepExecutor::execute(data, &query),
            Err(EngineError::Query(_))
        ));
    }
}
