//! Request assembly.
//!
//! Combines an aggregation config with the dashboard's global filter pool
//! into the body for the aggregate-data endpoint, or falls back to a raw-row
//! request when aggregation is disabled.

use serde::Serialize;

use crate::config::QueryConfig;
use crate::filters::{normalize_pool, NormalizedFilter};
use crate::metrics::{compile_metrics, MetricRequest};
use crate::models::{
    AggregationConfig, ComparePeriod, Cumulative, Filter, OrderBy, SortDirection,
};

/// Body for `POST /api/dashboard/aggregate-data`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec<String>>,
    pub metrics: Vec<MetricRequest>,
    pub filters: Vec<NormalizedFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    pub limit: u32,
    pub cumulative: Cumulative,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_period: Option<ComparePeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_dimension: Option<String>,
}

/// Body for `POST /api/dashboard/raw-data`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    pub table_name: String,
    pub filters: Vec<NormalizedFilter>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
}

/// Body for `POST /api/dashboard/distinct-values`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistinctRequest {
    pub table_name: String,
    pub field: String,
    pub limit: u32,
    pub order: SortDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<DistinctTransform>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DistinctTransform {
    /// Extract the year from a date field before deduplicating.
    #[serde(rename = "YEAR")]
    Year,
}

/// The request a widget's fetch cycle sends.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DataRequest {
    Aggregate(AggregateRequest),
    Raw(RawRequest),
}

/// Build the request for one widget. Pure given its inputs; resolving
/// `table_name` is the table-resolution collaborator's job.
pub fn assemble(
    config: &AggregationConfig,
    global_filters: &[Filter],
    exclude_global: bool,
    table_name: &str,
    defaults: &QueryConfig,
) -> DataRequest {
    let filters = normalize_pool(&config.filters, global_filters, exclude_global);

    if !config.enabled || config.metrics.is_empty() {
        let limit = defaults.clamp_limit(config.limit.unwrap_or(defaults.default_raw_limit));
        tracing::debug!(table = table_name, filters = filters.len(), limit, "assembled raw request");
        return DataRequest::Raw(RawRequest {
            table_name: table_name.to_string(),
            filters,
            limit,
            order_by: config.order_by.clone(),
        });
    }

    let date_dimension = config
        .date_dimension
        .as_deref()
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    // Year-to-date and period comparison are meaningless without a date
    // column; omit them rather than sending a malformed request.
    let mut cumulative = config.cumulative;
    let mut compare_period = config.compare_period;
    if date_dimension.is_none() {
        if cumulative == Cumulative::Ytd {
            tracing::warn!("ytd cumulative requested without a date dimension; downgrading to none");
            cumulative = Cumulative::None;
        }
        if compare_period.is_some() {
            tracing::warn!("compare period requested without a date dimension; omitting");
            compare_period = None;
        }
    }

    let dimension_list: Vec<String> = [&config.dimension, &config.dimension2]
        .into_iter()
        .filter_map(|d| d.as_deref())
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect();

    let limit = defaults.clamp_limit(config.limit.unwrap_or(defaults.default_aggregate_limit));
    let metrics = compile_metrics(&config.metrics);
    tracing::debug!(
        table = table_name,
        dimensions = dimension_list.len(),
        metrics = metrics.len(),
        filters = filters.len(),
        limit,
        "assembled aggregate request"
    );

    DataRequest::Aggregate(AggregateRequest {
        table_name: table_name.to_string(),
        dimension: config.dimension.clone().filter(|d| !d.is_empty()),
        dimensions: if dimension_list.is_empty() {
            None
        } else {
            Some(dimension_list)
        },
        metrics,
        filters,
        order_by: config.order_by.clone(),
        limit,
        cumulative,
        compare_period,
        date_dimension,
    })
}
