//! Lazy per-collection table and index bootstrap
//!
//! Each adapter owns its caches. The first caller for a name runs the
//! creation calls; concurrent first callers wait on the same cell instead of
//! issuing their own. Creation is best-effort: "already exists" failures are
//! expected (another process may have won), other failures are logged and
//! the name is still marked so later calls surface the real engine error.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use crate::engine::{Engine, EngineError};
use crate::observability::{Event, Logger};

/// Secondary indexes every oplog table carries
pub const OPLOG_INDEXES: [&str; 2] = ["name", "v"];

/// Set of names whose bootstrap has run
#[derive(Debug, Default)]
pub struct BootstrapCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
}

impl BootstrapCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `init` once per name; every caller returns after it finished
    pub async fn ensure<F, Fut>(&self, name: &str, init: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(cells.entry(name.to_string()).or_default())
        };
        cell.get_or_init(init).await;
    }

    /// Returns true once bootstrap for `name` has completed
    pub fn is_ensured(&self, name: &str) -> bool {
        let cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells.get(name).map(|c| c.initialized()).unwrap_or(false)
    }
}

/// Logs a creation failure unless it is the tolerated "already exists" class
///
/// `existing` names the event logged when the object was already there.
/// Returns the event logged, if any.
fn tolerate(
    result: Result<(), EngineError>,
    existing: Event,
    table: &str,
    what: &str,
) -> Option<Event> {
    match result {
        Ok(()) => None,
        Err(e) if e.is_already_exists() => {
            Logger::trace(
                existing,
                &[("table", table), ("step", what), ("status", "exists")],
            );
            Some(existing)
        }
        Err(e) => {
            let error = e.to_string();
            Logger::warn(
                Event::OpIndexBootstrapWarn,
                &[("table", table), ("step", what), ("error", error.as_str())],
            );
            Some(Event::OpIndexBootstrapWarn)
        }
    }
}

/// Creates the snapshot table for a collection on first use
pub async fn ensure_table(engine: &dyn Engine, cache: &BootstrapCache, table: &str) {
    cache
        .ensure(table, || async {
            tolerate(
                engine.table_create(table).await,
                Event::TableEnsured,
                table,
                "table_create",
            );
            Logger::trace(Event::TableEnsured, &[("table", table)]);
        })
        .await;
}

/// Creates the oplog table and its `name`/`v` indexes on first use
pub async fn ensure_oplog(
    engine: &dyn Engine,
    cache: &BootstrapCache,
    collection: &str,
    op_table: &str,
) {
    cache
        .ensure(collection, || async {
            tolerate(
                engine.table_create(op_table).await,
                Event::TableEnsured,
                op_table,
                "table_create",
            );
            for index in OPLOG_INDEXES {
                tolerate(
                    engine.index_create(op_table, index).await,
                    Event::OpIndexBootstrap,
                    op_table,
                    index,
                );
            }
            Logger::info(
                Event::OpIndexBootstrap,
                &[("collection", collection), ("table", op_table)],
            );
        })
        .await;
}
