//! Per-widget fetch-and-process cycle.
//!
//! Each widget's refresh is an independent asynchronous unit: resolve the
//! table, assemble the request, call the backend, post-process, apply. A
//! failure in one widget's cycle never aborts or corrupts its siblings;
//! `refresh_all` fires one refresh per widget and reports per-widget
//! outcomes.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::backends::{DataBackend, Rows};
use crate::config::BoardflowConfig;
use crate::error::{BoardflowError, Result};
use crate::models::{SortDirection, Widget};
use crate::request::{assemble, DataRequest, DistinctRequest, DistinctTransform};
use crate::resolve::TableResolver;
use crate::results::{process, ProcessedResult};
use crate::store::DashboardStore;

pub type SharedStore = Arc<Mutex<DashboardStore>>;

/// Refresh one widget's data.
///
/// The store lock is held only to snapshot state and to apply the outcome;
/// the backend roundtrip runs unlocked so sibling refreshes proceed
/// concurrently. A response arriving after the widget was reconfigured or
/// removed is discarded by the generation check in the store.
pub async fn refresh_widget(
    store: &SharedStore,
    backend: &dyn DataBackend,
    resolver: &dyn TableResolver,
    config: &BoardflowConfig,
    widget_id: &str,
) -> Result<()> {
    let (widget, global_filters, generation) = {
        let mut store = store.lock().await;
        let generation = store.begin_fetch(widget_id).ok_or_else(|| {
            BoardflowError::Validation(format!("unknown widget {widget_id}"))
        })?;
        let widget = store
            .get(widget_id)
            .cloned()
            .ok_or_else(|| BoardflowError::Validation(format!("unknown widget {widget_id}")))?;
        (widget, store.global_filters.clone(), generation)
    };

    let outcome = fetch_and_process(&widget, &global_filters, backend, resolver, config).await;

    let mut guard = store.lock().await;
    match outcome {
        Ok((rows, processed)) => {
            if processed.empty {
                tracing::warn!(widget = widget_id, "query returned no rows");
            }
            guard.apply_fetch(widget_id, generation, rows, processed.series);
            Ok(())
        }
        Err(err) => {
            // Loading state clears; last-known-good data stays in place.
            guard.fail_fetch(widget_id, generation);
            tracing::warn!(widget = widget_id, error = %err, "widget refresh failed");
            Err(err)
        }
    }
}

async fn fetch_and_process(
    widget: &Widget,
    global_filters: &[crate::models::Filter],
    backend: &dyn DataBackend,
    resolver: &dyn TableResolver,
    config: &BoardflowConfig,
) -> Result<(Rows, ProcessedResult)> {
    let agg_config = widget.aggregation_config.clone().unwrap_or_default();
    let table = resolver.table_name(widget).await?;
    let request = assemble(
        &agg_config,
        global_filters,
        widget.exclude_global_filters,
        &table,
        &config.query,
    );
    let rows = match &request {
        DataRequest::Aggregate(req) => backend.aggregate_data(req).await?,
        DataRequest::Raw(req) => backend.raw_data(req).await?,
    };
    let processed = process(
        &rows,
        Some(&agg_config),
        widget.kind,
        None,
        None,
        config.display.table_row_limit,
    )?;
    Ok((rows, processed))
}

/// Refresh every widget that can hold data. Refreshes run concurrently and
/// independently; the result carries one outcome per widget id, so partial
/// completion is visible to the caller rather than an error.
pub async fn refresh_all(
    store: &SharedStore,
    backend: &dyn DataBackend,
    resolver: &dyn TableResolver,
    config: &BoardflowConfig,
) -> Vec<(String, Result<()>)> {
    let ids: Vec<String> = {
        let guard = store.lock().await;
        guard
            .widgets()
            .iter()
            .filter(|w| w.source.is_some() || w.aggregation_config.is_some())
            .map(|w| w.id.clone())
            .collect()
    };

    let refreshes = ids.iter().map(|id| async {
        let outcome = refresh_widget(store, backend, resolver, config, id).await;
        (id.clone(), outcome)
    });
    join_all(refreshes).await
}

/// Fetch distinct values of a field, for filter-value dropdowns.
pub async fn field_values(
    backend: &dyn DataBackend,
    config: &BoardflowConfig,
    table_name: &str,
    field: &str,
    transform: Option<DistinctTransform>,
) -> Result<Vec<Value>> {
    backend
        .distinct_values(&DistinctRequest {
            table_name: table_name.to_string(),
            field: field.to_string(),
            limit: config.query.distinct_limit,
            order: SortDirection::Asc,
            transform,
        })
        .await
}
