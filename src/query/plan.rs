//! Compiled query plans
//!
//! Steps form a closed set; the engine interprets each variant explicitly.

use std::fmt;

use serde_json::{Map, Value};

use super::errors::{QueryError, QueryResult};

/// Target-engine comparison calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Ne,
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparator {
    /// Maps a dialect operator onto its comparator
    ///
    /// `$gte`/`$lte` become `ge`/`le`: the target engine's names, not a typo.
    pub fn from_operator(op: &str) -> QueryResult<Self> {
        match op {
            "$ne" => Ok(Comparator::Ne),
            "$eq" => Ok(Comparator::Eq),
            "$gt" => Ok(Comparator::Gt),
            "$gte" => Ok(Comparator::Ge),
            "$lt" => Ok(Comparator::Lt),
            "$lte" => Ok(Comparator::Le),
            other => Err(QueryError::unsupported(other)),
        }
    }

    /// Target-engine method name
    pub fn name(&self) -> &'static str {
        match self {
            Comparator::Ne => "ne",
            Comparator::Eq => "eq",
            Comparator::Gt => "gt",
            Comparator::Ge => "ge",
            Comparator::Lt => "lt",
            Comparator::Le => "le",
        }
    }
}

/// Row predicate applied by a `Filter` step
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `row(field).<cmp>(operand)`
    Compare {
        field: String,
        cmp: Comparator,
        operand: Value,
    },
    /// `expr(values).contains(row(field))`
    Contains { field: String, values: Vec<Value> },
}

/// One ordering key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub field: String,
    pub descending: bool,
}

impl OrderKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Row reshaping applied by a `MapRows` step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowShape {
    /// `{group, reduction}` → `{_id: reduction[0][key], count: len(reduction)}`
    GroupCount { key: String },
}

/// Follow-on method applied after the base filter
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Filter(Predicate),
    OrderBy(Vec<OrderKey>),
    Skip(u64),
    Limit(u64),
    Pluck(Vec<String>),
    GetField(String),
    Distinct,
    Group(String),
    Ungroup,
    MapRows(RowShape),
    Count,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Filter(Predicate::Compare {
                field,
                cmp,
                operand,
            }) => write!(f, "filter(row({:?}).{}({}))", field, cmp.name(), operand),
            Step::Filter(Predicate::Contains { field, values }) => write!(
                f,
                "filter(expr({}).contains(row({:?})))",
                Value::Array(values.clone()),
                field
            ),
            Step::OrderBy(keys) => {
                let keys: Vec<String> = keys
                    .iter()
                    .map(|k| {
                        if k.descending {
                            format!("desc({:?})", k.field)
                        } else {
                            format!("asc({:?})", k.field)
                        }
                    })
                    .collect();
                write!(f, "orderBy({})", keys.join(", "))
            }
            Step::Skip(n) => write!(f, "skip({})", n),
            Step::Limit(n) => write!(f, "limit({})", n),
            Step::Pluck(fields) => write!(f, "pluck({:?})", fields),
            Step::GetField(field) => write!(f, "getField({:?})", field),
            Step::Distinct => write!(f, "distinct()"),
            Step::Group(key) => write!(f, "group({:?})", key),
            Step::Ungroup => write!(f, "ungroup()"),
            Step::MapRows(RowShape::GroupCount { key }) => {
                write!(f, "map({{_id: nth(0)({:?}), count: count()}})", key)
            }
            Step::Count => write!(f, "count()"),
        }
    }
}

/// Which result shape a plan produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryForm {
    /// Row list, decoded into envelopes
    Find,
    /// Distinct field values, returned out of band
    Distinct,
    /// Grouped counts, returned out of band
    Aggregate,
    /// Scalar count, returned out of band
    Count,
}

impl QueryForm {
    /// Returns true if the result goes into `extra` rather than the row list
    pub fn is_extra(&self) -> bool {
        !matches!(self, QueryForm::Find)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryForm::Find => "find",
            QueryForm::Distinct => "distinct",
            QueryForm::Aggregate => "aggregate",
            QueryForm::Count => "count",
        }
    }
}

/// A compiled query: literal filter first, then steps in order
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub filter: Map<String, Value>,
    pub steps: Vec<Step>,
    pub form: QueryForm,
}

impl QueryPlan {
    /// A plan with only a literal filter
    pub fn find(filter: Map<String, Value>) -> Self {
        Self {
            filter,
            steps: Vec::new(),
            form: QueryForm::Find,
        }
    }

    /// Appends a step
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Renders the chained form run against `table`
    pub fn explain(&self, table: &str) -> String {
        let mut out = format!(
            "table({:?}).filter({})",
            table,
            Value::Object(self.filter.clone())
        );
        for step in &self.steps {
            out.push('.');
            out.push_str(&step.to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_comparator_table_exact() {
        let table = [
            ("$ne", "ne"),
            ("$eq", "eq"),
            ("$gt", "gt"),
            ("$gte", "ge"),
            ("$lt", "lt"),
            ("$lte", "le"),
        ];
        for (op, name) in table {
            assert_eq!(Comparator::from_operator(op).unwrap().name(), name);
        }
    }

    #[test]
    fn test_unknown_comparator() {
        assert_eq!(
            Comparator::from_operator("$regex"),
            Err(QueryError::UnsupportedOperator("$regex".into()))
        );
    }

    #[test]
    fn test_explain_chain() {
        let mut filter = Map::new();
        filter.insert("kind".into(), json!("post"));
        let plan = QueryPlan::find(filter)
            .with_step(Step::Filter(Predicate::Compare {
                field: "x".into(),
                cmp: Comparator::Ge,
                operand: json!(5),
            }))
            .with_step(Step::Count);

        assert_eq!(
            plan.explain("posts"),
            r#"table("posts").filter({"kind":"post"}).filter(row("x").ge(5)).count()"#
        );
    }
}
