//! Result post-processing.
//!
//! Takes tabular rows from the aggregation backend and derives a
//! chart-ready structure: per-column type inference, label/value field
//! resolution, client-side unit conversion and rounding, and series shaping
//! per widget kind. Row-level coercion failures degrade to 0 so a chart
//! always renders; a missing label or value field for a chart kind that
//! needs one is a hard error.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BoardflowError, Result};
use crate::models::{AggregationConfig, ChartKind, ConversionType, MetricSpec};

static DATE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());
static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"T\d{2}:\d{2}:\d{2}").unwrap());

/// Default series palette, assigned round-robin to datasets.
pub static PALETTE: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
        "#9c755f", "#bab0ab",
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    Date,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Bar,
    Line,
}

/// One chart dataset: a labeled numeric series with a palette color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SeriesKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// Chart-ready shape for one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WidgetSeries {
    Chart(ChartSeries),
    Scalar { value: f64 },
    Table { rows: Vec<Map<String, Value>> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedResult {
    pub series: WidgetSeries,
    pub columns: Vec<ColumnMeta>,
    /// Zero-row results short-circuit to an empty series; the caller
    /// surfaces this as a non-fatal warning.
    pub empty: bool,
}

/// Turn tabular rows into a chart-ready structure for one widget.
///
/// `label_field`/`value_fields` override the resolution heuristics when the
/// caller knows better (e.g. explicit chart configuration).
pub fn process(
    rows: &[Map<String, Value>],
    config: Option<&AggregationConfig>,
    kind: ChartKind,
    label_field: Option<&str>,
    value_fields: Option<&[String]>,
    table_row_limit: usize,
) -> Result<ProcessedResult> {
    if rows.is_empty() {
        return Ok(ProcessedResult {
            series: WidgetSeries::Chart(ChartSeries::default()),
            columns: Vec::new(),
            empty: true,
        });
    }

    let columns = infer_columns(&rows[0]);
    let (label, values) = resolve_fields(&columns, config, label_field, value_fields);
    let metric_by_alias = metric_lookup(config);

    let series = match kind {
        ChartKind::Table => WidgetSeries::Table {
            rows: rows.iter().take(table_row_limit).cloned().collect(),
        },
        ChartKind::Kpi => {
            let field = values.first().ok_or_else(|| {
                BoardflowError::Validation("kpi widget has no value field".to_string())
            })?;
            let total = rows
                .iter()
                .map(|row| converted_value(row, field, &metric_by_alias))
                .sum();
            WidgetSeries::Scalar { value: total }
        }
        _ => {
            let label = label.ok_or_else(|| {
                BoardflowError::Validation("chart widget has no label field".to_string())
            })?;
            if values.is_empty() {
                return Err(BoardflowError::Validation(
                    "chart widget has no value fields".to_string(),
                ));
            }
            WidgetSeries::Chart(shape_chart(rows, &label, &values, kind, &metric_by_alias))
        }
    };

    Ok(ProcessedResult {
        series,
        columns,
        empty: false,
    })
}

/// Classify each column by sampling the first row.
pub fn infer_columns(first_row: &Map<String, Value>) -> Vec<ColumnMeta> {
    first_row
        .iter()
        .map(|(name, value)| ColumnMeta {
            name: name.clone(),
            column_type: infer_type(value),
        })
        .collect()
}

fn infer_type(value: &Value) -> ColumnType {
    match value {
        Value::Number(_) => ColumnType::Number,
        Value::Bool(_) => ColumnType::Boolean,
        Value::String(s) => {
            if DATE_PREFIX_RE.is_match(s) || TIMESTAMP_RE.is_match(s) {
                ColumnType::Date
            } else {
                ColumnType::String
            }
        }
        _ => ColumnType::Unknown,
    }
}

/// Resolve the label column and the value columns, in order of priority:
/// explicit caller overrides, aggregation config, column-type heuristics.
fn resolve_fields(
    columns: &[ColumnMeta],
    config: Option<&AggregationConfig>,
    label_field: Option<&str>,
    value_fields: Option<&[String]>,
) -> (Option<String>, Vec<String>) {
    if let (Some(label), Some(values)) = (label_field, value_fields) {
        return (Some(label.to_string()), values.to_vec());
    }

    if let Some(config) = config.filter(|c| c.enabled && !c.metrics.is_empty()) {
        let label = label_field
            .map(str::to_string)
            .or_else(|| config.dimension.clone());
        let values = value_fields
            .map(|v| v.to_vec())
            .unwrap_or_else(|| config.metrics.iter().map(|m| m.wire_alias()).collect());
        return (label, values);
    }

    let label = label_field
        .map(str::to_string)
        .or_else(|| {
            columns
                .iter()
                .find(|c| c.column_type == ColumnType::String)
                .map(|c| c.name.clone())
        })
        .or_else(|| columns.first().map(|c| c.name.clone()));

    let values = value_fields.map(|v| v.to_vec()).unwrap_or_else(|| {
        let numeric: Vec<String> = columns
            .iter()
            .filter(|c| c.column_type == ColumnType::Number)
            .filter(|c| Some(&c.name) != label.as_ref())
            .map(|c| c.name.clone())
            .collect();
        if !numeric.is_empty() {
            return numeric;
        }
        // No numeric columns at all: fall back to a single non-label column.
        columns
            .iter()
            .filter(|c| Some(&c.name) != label.as_ref())
            .take(1)
            .map(|c| c.name.clone())
            .collect()
    });

    (label, values)
}

fn metric_lookup(config: Option<&AggregationConfig>) -> HashMap<String, MetricSpec> {
    config
        .map(|c| {
            c.metrics
                .iter()
                .map(|m| (m.wire_alias(), m.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn shape_chart(
    rows: &[Map<String, Value>],
    label: &str,
    values: &[String],
    kind: ChartKind,
    metrics: &HashMap<String, MetricSpec>,
) -> ChartSeries {
    let labels = rows
        .iter()
        .map(|row| display_label(row.get(label).unwrap_or(&Value::Null)))
        .collect();

    let fields: Vec<&String> = if kind == ChartKind::Combo {
        // Combo pairs the first field as bars and the second (or the first
        // again) as a line.
        let bar = &values[0];
        let line = values.get(1).unwrap_or(bar);
        vec![bar, line]
    } else {
        values.iter().collect()
    };

    let datasets = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let series_kind = match kind {
                ChartKind::Combo if i == 0 => Some(SeriesKind::Bar),
                ChartKind::Combo => Some(SeriesKind::Line),
                _ => None,
            };
            Dataset {
                label: (*field).clone(),
                data: rows
                    .iter()
                    .map(|row| converted_value(row, field, metrics))
                    .collect(),
                color: PALETTE[i % PALETTE.len()].to_string(),
                kind: series_kind,
            }
        })
        .collect();

    ChartSeries { labels, datasets }
}

fn display_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Extract one numeric cell, applying the owning metric's unit conversion
/// and precision rounding when the column matches a metric alias.
fn converted_value(
    row: &Map<String, Value>,
    field: &str,
    metrics: &HashMap<String, MetricSpec>,
) -> f64 {
    let raw = coerce_number(row.get(field).unwrap_or(&Value::Null));
    match metrics.get(field) {
        Some(metric) => apply_conversion(raw, metric),
        None => raw,
    }
}

fn apply_conversion(raw: f64, metric: &MetricSpec) -> f64 {
    let factor = metric.conversion_factor.unwrap_or(1.0);
    let converted = match metric.conversion_type {
        ConversionType::Multiply => raw * factor,
        // A zero divisor would poison the chart with infinities; leave the
        // value unchanged instead.
        ConversionType::Divide if factor != 0.0 => raw / factor,
        _ => raw,
    };
    match metric.precision {
        Some(p) => {
            let scale = 10f64.powi(p as i32);
            (converted * scale).round() / scale
        }
        None => converted,
    }
}

/// Coerce a raw cell to a number; anything unparseable degrades to 0.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}
