//! In-process table engine
//!
//! Keeps tables in memory, enforces create-before-use, and reports duplicate
//! table/index creation the way a networked engine does. Call counters make
//! the adapter's bootstrap behavior observable in tests.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::future::ready;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use serde_json::Value;

use super::errors::{EngineError, EngineResult};
use super::steps::StepExecutor;
use super::{Conflict, Engine, EngineFuture, QueryOutput, Row, TableQuery, WriteSummary};
use crate::codec::ID_KEY;

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<String, Row>,
    indexes: BTreeSet<String>,
}

/// Table engine backed by process memory
#[derive(Debug, Default)]
pub struct MemoryEngine {
    tables: RwLock<HashMap<String, Table>>,
    unavailable: RwLock<HashSet<String>>,
    table_creates: AtomicUsize,
    index_creates: AtomicUsize,
}

fn poisoned<T>(_: PoisonError<T>) -> EngineError {
    EngineError::Connection("engine state lock poisoned".to_string())
}

impl MemoryEngine {
    /// Creates an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call touching `table` fail with a connection error
    pub fn set_unavailable(&self, table: &str, unavailable: bool) {
        if let Ok(mut set) = self.unavailable.write() {
            if unavailable {
                set.insert(table.to_string());
            } else {
                set.remove(table);
            }
        }
    }

    /// Number of `table_create` calls received, including failed ones
    pub fn table_create_calls(&self) -> usize {
        self.table_creates.load(Ordering::SeqCst)
    }

    /// Number of `index_create` calls received, including failed ones
    pub fn index_create_calls(&self) -> usize {
        self.index_creates.load(Ordering::SeqCst)
    }

    /// Returns true if the table exists
    pub fn has_table(&self, table: &str) -> bool {
        self.tables
            .read()
            .map(|t| t.contains_key(table))
            .unwrap_or(false)
    }

    /// Secondary indexes defined on a table
    pub fn indexes(&self, table: &str) -> Vec<String> {
        self.tables
            .read()
            .ok()
            .and_then(|t| t.get(table).map(|t| t.indexes.iter().cloned().collect()))
            .unwrap_or_default()
    }

    /// Number of rows stored in a table
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .ok()
            .and_then(|t| t.get(table).map(|t| t.rows.len()))
            .unwrap_or(0)
    }

    fn check_available(&self, table: &str) -> EngineResult<()> {
        let set = self.unavailable.read().map_err(poisoned)?;
        if set.contains(table) {
            return Err(EngineError::Connection(format!(
                "table `{}` is unavailable",
                table
            )));
        }
        Ok(())
    }

    fn create_table(&self, table: &str) -> EngineResult<()> {
        self.table_creates.fetch_add(1, Ordering::SeqCst);
        self.check_available(table)?;
        let mut tables = self.tables.write().map_err(poisoned)?;
        if tables.contains_key(table) {
            return Err(EngineError::TableExists(table.to_string()));
        }
        tables.insert(table.to_string(), Table::default());
        Ok(())
    }

    fn create_index(&self, table: &str, field: &str) -> EngineResult<()> {
        self.index_creates.fetch_add(1, Ordering::SeqCst);
        self.check_available(table)?;
        let mut tables = self.tables.write().map_err(poisoned)?;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| EngineError::TableNotFound(table.to_string()))?;
        if !t.indexes.insert(field.to_string()) {
            return Err(EngineError::IndexExists {
                table: table.to_string(),
                index: field.to_string(),
            });
        }
        Ok(())
    }

    fn get_row(&self, table: &str, id: &str) -> EngineResult<Option<Row>> {
        self.check_available(table)?;
        let tables = self.tables.read().map_err(poisoned)?;
        let t = tables
            .get(table)
            .ok_or_else(|| EngineError::TableNotFound(table.to_string()))?;
        Ok(t.rows.get(id).cloned())
    }

    fn insert_row(&self, table: &str, row: Row, conflict: Conflict) -> EngineResult<WriteSummary> {
        self.check_available(table)?;
        let id = match row.get(ID_KEY) {
            Some(Value::String(id)) => id.clone(),
            _ => {
                return Err(EngineError::Query(
                    "inserted row has no string primary key".to_string(),
                ))
            }
        };

        let mut tables = self.tables.write().map_err(poisoned)?;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| EngineError::TableNotFound(table.to_string()))?;

        let mut summary = WriteSummary::default();
        match t.rows.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(row);
                summary.inserted = 1;
            }
            Entry::Occupied(slot) if conflict == Conflict::Error => {
                return Err(EngineError::DuplicateKey(slot.key().clone()));
            }
            Entry::Occupied(mut slot) => {
                let next = match conflict {
                    Conflict::Update => {
                        let mut merged = slot.get().clone();
                        merged.extend(row);
                        merged
                    }
                    _ => row,
                };
                if *slot.get() == next {
                    summary.unchanged = 1;
                } else {
                    slot.insert(next);
                    summary.replaced = 1;
                }
            }
        }
        Ok(summary)
    }

    fn run_query(&self, table: &str, query: &TableQuery) -> EngineResult<QueryOutput> {
        self.check_available(table)?;
        let rows: Vec<Row> = {
            let tables = self.tables.read().map_err(poisoned)?;
            let t = tables
                .get(table)
                .ok_or_else(|| EngineError::TableNotFound(table.to_string()))?;
            t.rows.values().cloned().collect()
        };
        StepExecutor::execute(rows, query)
    }
}

impl Engine for MemoryEngine {
    fn table_create<'a>(&'a self, table: &'a str) -> EngineFuture<'a, ()> {
        Box::pin(ready(self.create_table(table)))
    }

    fn index_create<'a>(&'a self, table: &'a str, field: &'a str) -> EngineFuture<'a, ()> {
        Box::pin(ready(self.create_index(table, field)))
    }

    fn get<'a>(&'a self, table: &'a str, id: &'a str) -> EngineFuture<'a, Option<Row>> {
        Box::pin(ready(self.get_row(table, id)))
    }

    fn insert<'a>(
        &'a self,
        table: &'a str,
        row: Row,
        conflict: Conflict,
    ) -> EngineFuture<'a, WriteSummary> {
        Box::pin(ready(self.insert_row(table, row, conflict)))
    }

    fn run<'a>(&'a self, table: &'a str, query: &'a TableQuery) -> EngineFuture<'a, QueryOutput> {
        Box::pin(ready(self.run_query(table, query)))
    }
}
