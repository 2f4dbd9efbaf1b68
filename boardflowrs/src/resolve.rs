//! Table-name resolution.
//!
//! A widget's data lives in an ETL output table. A widget can name the
//! table directly (multi-source dashboards) or reference an ETL pipeline,
//! in which case the most recently finished completed run decides the
//! `schema.table` to query.

use async_trait::async_trait;

use crate::error::{BoardflowError, Result};
use crate::models::Widget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One ETL run record, as read from the run history.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EtlRun {
    pub etl_id: String,
    pub status: RunStatus,
    pub destination_schema: String,
    pub destination_table_name: String,
    /// ISO-8601 timestamp; lexicographic order is chronological.
    pub finished_at: Option<String>,
}

/// Resolves the table a widget queries.
#[async_trait]
pub trait TableResolver: Send + Sync {
    async fn table_name(&self, widget: &Widget) -> Result<String>;
}

/// Resolver over an in-memory run history.
#[derive(Debug, Default, Clone)]
pub struct EtlRunResolver {
    runs: Vec<EtlRun>,
}

impl EtlRunResolver {
    pub fn new(runs: Vec<EtlRun>) -> Self {
        Self { runs }
    }

    pub fn push(&mut self, run: EtlRun) {
        self.runs.push(run);
    }

    fn latest_completed(&self, etl_id: &str) -> Option<&EtlRun> {
        self.runs
            .iter()
            .filter(|r| r.etl_id == etl_id && r.status == RunStatus::Completed)
            .max_by(|a, b| a.finished_at.cmp(&b.finished_at))
    }
}

#[async_trait]
impl TableResolver for EtlRunResolver {
    async fn table_name(&self, widget: &Widget) -> Result<String> {
        let source = widget.source.as_ref().ok_or_else(|| {
            BoardflowError::Resolution(format!("widget {} has no data source", widget.id))
        })?;

        // An explicitly configured table wins over ETL resolution.
        if let Some(table) = source.table.as_deref().filter(|t| !t.is_empty()) {
            return Ok(table.to_string());
        }

        let etl_id = source.etl_id.as_deref().filter(|e| !e.is_empty()).ok_or_else(|| {
            BoardflowError::Resolution(format!("widget {} has no table or ETL id", widget.id))
        })?;
        let run = self.latest_completed(etl_id).ok_or_else(|| {
            BoardflowError::Resolution(format!("no completed run for ETL {etl_id}"))
        })?;
        Ok(format!(
            "{}.{}",
            run.destination_schema, run.destination_table_name
        ))
    }
}
