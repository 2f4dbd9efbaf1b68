use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{DataBackend, Rows};
use crate::error::{BoardflowError, Result};
use crate::request::{AggregateRequest, DistinctRequest, RawRequest};

/// In-memory backend serving canned rows, used by tests and demos.
///
/// Does not execute aggregations; whatever rows are registered for a table
/// are returned (capped to the request limit) as if the backend had grouped
/// them. `set_failing` injects transport failures.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Rows>>,
    distinct: Mutex<HashMap<(String, String), Vec<Value>>>,
    failing: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_table(&self, name: impl Into<String>, rows: Rows) {
        self.tables.lock().unwrap().insert(name.into(), rows);
    }

    pub fn insert_distinct(
        &self,
        table: impl Into<String>,
        field: impl Into<String>,
        values: Vec<Value>,
    ) {
        self.distinct
            .lock()
            .unwrap()
            .insert((table.into(), field.into()), values);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn rows_for(&self, table: &str, limit: u32) -> Result<Rows> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BoardflowError::Transport("injected failure".to_string()));
        }
        let tables = self.tables.lock().unwrap();
        let rows = tables
            .get(table)
            .ok_or_else(|| BoardflowError::Transport(format!("unknown table {table}")))?;
        Ok(rows.iter().take(limit as usize).cloned().collect())
    }
}

#[async_trait]
impl DataBackend for MemoryBackend {
    async fn aggregate_data(&self, request: &AggregateRequest) -> Result<Rows> {
        self.rows_for(&request.table_name, request.limit)
    }

    async fn raw_data(&self, request: &RawRequest) -> Result<Rows> {
        self.rows_for(&request.table_name, request.limit)
    }

    async fn distinct_values(&self, request: &DistinctRequest) -> Result<Vec<Value>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BoardflowError::Transport("injected failure".to_string()));
        }
        let distinct = self.distinct.lock().unwrap();
        let values = distinct
            .get(&(request.table_name.clone(), request.field.clone()))
            .ok_or_else(|| {
                BoardflowError::Transport(format!(
                    "no distinct values for {}.{}",
                    request.table_name, request.field
                ))
            })?;
        Ok(values.iter().take(request.limit as usize).cloned().collect())
    }
}
