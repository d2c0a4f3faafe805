//! Query compilation
//!
//! Selector values are either literals (deep equality, folded into the
//! filter object) or single-key operator objects (compiled into `Filter`
//! steps). Special forms are checked after the selector pass in priority
//! order: distinct, aggregate, count. Plain finds pick up the cursor
//! modifiers instead.
//!
//! Only the `$group` stage of `$aggregate` is translated. Other stages are
//! accepted and ignored, and no ordering across stages is implied.

use serde_json::{Map, Value};

use super::errors::{QueryError, QueryResult};
use super::normalize::NormalizedQuery;
use super::plan::{Comparator, OrderKey, Predicate, QueryForm, QueryPlan, RowShape, Step};

const LEGACY_ID_KEY: &str = "_id";
const STORAGE_ID_KEY: &str = "id";
const FIELD_REFERENCE: char = '$';

/// Compiles a normalized query into a plan
pub fn compile(query: &NormalizedQuery) -> QueryResult<QueryPlan> {
    let mut plan = QueryPlan::find(Map::new());

    for (key, value) in &query.selector {
        if key.starts_with('$') {
            // $where, $and, $or, ...
            return Err(QueryError::unsupported(key.as_str()));
        }
        let field = storage_field(key);
        match operator_of(value)? {
            Some((op, operand)) => {
                let cmp = Comparator::from_operator(op)?;
                plan.steps.push(Step::Filter(Predicate::Compare {
                    field,
                    cmp,
                    operand: operand.clone(),
                }));
            }
            None => {
                plan.filter.insert(field, value.clone());
            }
        }
    }

    if query.directive("$distinct").is_some() {
        let field = query
            .directive("$field")
            .ok_or_else(|| QueryError::translation("$distinct requires $field"))?
            .as_str()
            .ok_or_else(|| QueryError::translation("$field must be a string"))?;
        plan.steps.push(Step::GetField(field.to_string()));
        plan.steps.push(Step::Distinct);
        plan.form = QueryForm::Distinct;
    } else if let Some(stages) = query.directive("$aggregate") {
        let combined = combine_stages(stages)?;
        if let Some(group) = combined.get("$group") {
            let key = group_key(group)?;
            plan.steps.push(Step::Group(key.clone()));
            plan.steps.push(Step::Ungroup);
            plan.steps.push(Step::MapRows(RowShape::GroupCount { key }));
        }
        plan.form = QueryForm::Aggregate;
    } else if query.has_directive("$count") {
        plan.steps.push(Step::Count);
        plan.form = QueryForm::Count;
    } else {
        push_cursor_steps(query, &mut plan.steps)?;
    }

    Ok(plan)
}

fn storage_field(key: &str) -> String {
    if key == LEGACY_ID_KEY {
        STORAGE_ID_KEY.to_string()
    } else {
        key.to_string()
    }
}

/// Splits an operator object into `(operator, operand)`; `None` for literals
fn operator_of(value: &Value) -> QueryResult<Option<(&str, &Value)>> {
    let obj = match value {
        Value::Object(obj) => obj,
        _ => return Ok(None),
    };
    if !obj.keys().any(|k| k.starts_with('$')) {
        return Ok(None);
    }
    if obj.len() != 1 {
        let ops: Vec<&str> = obj.keys().map(String::as_str).collect();
        return Err(QueryError::unsupported(ops.join(",")));
    }
    Ok(obj.iter().next().map(|(k, v)| (k.as_str(), v)))
}

/// Merges a stage list into one map; later stages win on identical keys
fn combine_stages(stages: &Value) -> QueryResult<Map<String, Value>> {
    let stages = stages
        .as_array()
        .ok_or_else(|| QueryError::translation("$aggregate must be a list of stages"))?;
    let mut combined = Map::new();
    for stage in stages {
        let stage = stage
            .as_object()
            .ok_or_else(|| QueryError::translation("$aggregate stage must be an object"))?;
        for (key, value) in stage {
            combined.insert(key.clone(), value.clone());
        }
    }
    Ok(combined)
}

fn group_key(group: &Value) -> QueryResult<String> {
    let selector = group
        .get("_id")
        .and_then(Value::as_str)
        .ok_or_else(|| QueryError::translation("$group requires a string _id"))?;
    match selector.strip_prefix(FIELD_REFERENCE) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(QueryError::translation(format!(
            "$group _id '{}' is not a field reference",
            selector
        ))),
    }
}

fn push_cursor_steps(query: &NormalizedQuery, steps: &mut Vec<Step>) -> QueryResult<()> {
    if let Some(orderby) = query.directive("$orderby") {
        let keys = orderby
            .as_object()
            .ok_or_else(|| QueryError::translation("$orderby must be an object"))?;
        let mut order = Vec::with_capacity(keys.len());
        for (field, direction) in keys {
            let field = storage_field(field);
            match direction.as_i64() {
                Some(1) => order.push(OrderKey::asc(field)),
                Some(-1) => order.push(OrderKey::desc(field)),
                _ => {
                    return Err(QueryError::translation(format!(
                        "$orderby direction for '{}' must be 1 or -1",
                        field
                    )))
                }
            }
        }
        if !order.is_empty() {
            steps.push(Step::OrderBy(order));
        }
    }
    if let Some(skip) = query.directive("$skip") {
        steps.push(Step::Skip(count_of("$skip", skip)?));
    }
    if let Some(limit) = query.directive("$limit") {
        steps.push(Step::Limit(count_of("$limit", limit)?));
    }
    Ok(())
}

fn count_of(directive: &str, value: &Value) -> QueryResult<u64> {
    value.as_u64().ok_or_else(|| {
        QueryError::translation(format!(
            "{} must be a non-negative integer, found {}",
            directive, value
        ))
    })
}
