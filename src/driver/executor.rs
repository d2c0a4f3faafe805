//! Query dispatch over one table

use serde_json::Value;

use super::map_reduce::MapReduce;
use super::result::QueryResult;
use crate::codec::{self, DocEnvelope, ID_KEY};
use crate::engine::{values_equal, Engine, TableQuery};
use crate::error::{AdapterError, AdapterResult};
use crate::observability::{Event, Logger};
use crate::query::{compile, NormalizedQuery, QueryPlan, Step};

const MAP_REDUCE_DIRECTIVE: &str = "$mapReduce";
const LEGACY_ID_KEY: &str = "_id";

/// Stateless query executor
pub struct QueryDriver;

impl QueryDriver {
    /// Runs a normalized query against `table`
    pub async fn execute(
        engine: &dyn Engine,
        table: &str,
        query: &NormalizedQuery,
        fields: Option<&[String]>,
        map_reduce: Option<&MapReduce>,
    ) -> AdapterResult<QueryResult> {
        let plan = compile(query)?;

        if plan.form.is_extra() {
            log_plan(table, &plan);
            let output = engine.run(table, &TableQuery::from(plan)).await?;
            return Ok(QueryResult::extra(output.into_value()));
        }

        if query.has_directive(MAP_REDUCE_DIRECTIVE) {
            let map_reduce = map_reduce.ok_or_else(|| {
                AdapterError::TranslationError(
                    "$mapReduce requires map and reduce functions".to_string(),
                )
            })?;
            let plan = selector_only(plan);
            log_plan(table, &plan);
            let rows = engine
                .run(table, &TableQuery::from(plan))
                .await?
                .into_rows()?;
            return Ok(QueryResult::extra(map_reduce.run(&rows)));
        }

        let plan = match fields {
            Some(fields) => plan.with_step(Step::Pluck(codec::projection_from_fields(fields))),
            None => plan,
        };
        log_plan(table, &plan);
        let rows = engine
            .run(table, &TableQuery::from(plan))
            .await?
            .into_rows()?;
        Ok(QueryResult::documents(decode_all(rows)?))
    }

    /// Returns `doc_name` if it matches the query's selectors
    ///
    /// Directives are ignored. A literal identifier selector naming another
    /// document short-circuits to `None` without touching the engine.
    pub async fn find_one(
        engine: &dyn Engine,
        table: &str,
        doc_name: &str,
        query: &NormalizedQuery,
        fields: Option<&[String]>,
    ) -> AdapterResult<Option<DocEnvelope>> {
        let mut selector = query.selector.clone();
        let wanted = Value::String(doc_name.to_string());
        for key in [LEGACY_ID_KEY, ID_KEY] {
            let literal = match selector.get(key) {
                Some(Value::Object(obj)) if obj.keys().any(|k| k.starts_with('$')) => continue,
                Some(value) => value.clone(),
                None => continue,
            };
            if !values_equal(&literal, &wanted) {
                return Ok(None);
            }
            selector.remove(key);
        }

        let single = NormalizedQuery {
            selector,
            directives: Default::default(),
        };
        let mut plan = compile(&single)?;
        plan.filter.insert(ID_KEY.to_string(), wanted);
        if let Some(fields) = fields {
            plan = plan.with_step(Step::Pluck(codec::projection_from_fields(fields)));
        }
        plan = plan.with_step(Step::Limit(1));

        log_plan(table, &plan);
        let row = engine
            .run(table, &TableQuery::from(plan))
            .await?
            .into_rows()?
            .into_iter()
            .next();
        Ok(codec::unpack(row)?)
    }
}

/// Drops everything but selector filters
fn selector_only(mut plan: QueryPlan) -> QueryPlan {
    plan.steps.retain(|step| matches!(step, Step::Filter(_)));
    plan
}

fn decode_all(rows: Vec<codec::Row>) -> AdapterResult<Vec<DocEnvelope>> {
    let mut docs = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(doc) = codec::unpack(Some(row))? {
            docs.push(doc);
        }
    }
    Ok(docs)
}

fn log_plan(table: &str, plan: &QueryPlan) {
    let explain = plan.explain(table);
    Logger::trace(
        Event::QueryCompiled,
        &[
            ("form", plan.form.as_str()),
            ("plan", explain.as_str()),
            ("table", table),
        ],
    );
}
