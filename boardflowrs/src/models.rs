use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::results::WidgetSeries;

/// Aggregation functions accepted by the aggregate-data endpoint.
///
/// `COUNT(DISTINCT` is deliberately unterminated: the backend appends the
/// closing syntax. It must be sent verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggFunc {
    #[serde(rename = "SUM")]
    Sum,
    #[serde(rename = "AVG")]
    Avg,
    #[serde(rename = "COUNT")]
    Count,
    #[serde(rename = "MIN")]
    Min,
    #[serde(rename = "MAX")]
    Max,
    #[serde(rename = "COUNT(DISTINCT")]
    CountDistinct,
    #[serde(rename = "FORMULA")]
    Formula,
}

impl AggFunc {
    /// Wire token, also used when deriving a default alias.
    pub fn token(&self) -> &'static str {
        match self {
            AggFunc::Sum => "SUM",
            AggFunc::Avg => "AVG",
            AggFunc::Count => "COUNT",
            AggFunc::Min => "MIN",
            AggFunc::Max => "MAX",
            AggFunc::CountDistinct => "COUNT(DISTINCT",
            AggFunc::Formula => "FORMULA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "ILIKE")]
    ILike,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "BETWEEN")]
    Between,
    #[serde(rename = "MONTH")]
    Month,
    #[serde(rename = "YEAR")]
    Year,
    #[serde(rename = "DAY")]
    Day,
    #[serde(rename = "IS")]
    Is,
    #[serde(rename = "IS NOT")]
    IsNot,
}

/// A raw filter as authored in the UI or read from a persisted document.
///
/// `value` stays an untyped json value here; the normalizer converts it into
/// the canonical per-operator shape (see `filters::normalize`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default)]
    pub id: String,
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub convert_to_number: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            field: field.into(),
            operator,
            value,
            convert_to_number: false,
            input_type: None,
        }
    }
}

/// Row-level predicate restricting which rows a metric aggregates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCondition {
    pub field: String,
    pub operator: FilterOperator,
    pub value: Value,
}

/// Client-side unit conversion applied after the backend responds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionType {
    #[default]
    None,
    Multiply,
    Divide,
}

/// Numeric-cast strategy hinted to the backend for text-typed columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericCast {
    #[default]
    None,
    Numeric,
    Sanitize,
}

/// Backend-side type-coercion hint attached to wire filters and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastHint {
    Numeric,
    Sanitize,
}

/// A metric as edited in the UI.
///
/// Carries both the wire fields and the presentation-only fields
/// (conversion, precision, string coercion). `metrics::compile_metrics`
/// is the explicit step that strips the latter before transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub field: String,
    pub func: AggFunc,
    #[serde(default)]
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<MetricCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default)]
    pub conversion_type: ConversionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_string_as_numeric: bool,
    #[serde(default)]
    pub numeric_cast: NumericCast,
}

impl MetricSpec {
    pub fn new(func: AggFunc, field: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            field: field.into(),
            func,
            alias: String::new(),
            condition: None,
            formula: None,
            conversion_type: ConversionType::None,
            conversion_factor: None,
            precision: None,
            allow_string_as_numeric: false,
            numeric_cast: NumericCast::None,
        }
    }

    pub fn formula(expr: impl Into<String>) -> Self {
        let mut metric = Self::new(AggFunc::Formula, "");
        metric.formula = Some(expr.into());
        metric
    }

    /// The alias this metric's result column carries on the wire: the
    /// explicit alias when set, otherwise derived deterministically.
    pub fn wire_alias(&self) -> String {
        if !self.alias.is_empty() {
            return self.alias.clone();
        }
        match self.func {
            AggFunc::Formula => "formula".to_string(),
            func => format!("{}_{}", func.token(), self.field),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Post-aggregation transform computed by the backend over an ordered
/// metric series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cumulative {
    #[default]
    None,
    RunningSum,
    Ytd,
}

/// Backend-computed prior-period value and variance per metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparePeriod {
    PreviousYear,
    PreviousMonth,
}

/// Aggregation settings for one data-bearing widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregationConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_dimension: Option<String>,
    pub metrics: Vec<MetricSpec>,
    pub filters: Vec<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    pub cumulative: Cumulative,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_period: Option<ComparePeriod>,
}

/// Visual kinds a widget can render as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    Kpi,
    Pie,
    Doughnut,
    Bar,
    HorizontalBar,
    Line,
    Combo,
    Table,
}

/// Where a widget's data comes from: either an ETL pipeline (resolved to
/// that pipeline's latest completed output table) or an explicit table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etl_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

/// One tile on a dashboard.
///
/// `rows` holds the last fetched tabular data and `series` the chart-ready
/// shape derived from it; both are populated asynchronously by the fetch
/// cycle. `generation` and `is_loading` are transient fetch state and never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ChartKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub grid_order: usize,
    #[serde(default = "default_grid_span")]
    pub grid_span: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_config: Option<AggregationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<WidgetSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exclude_global_filters: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Map<String, Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<WidgetSeries>,
    #[serde(skip)]
    pub is_loading: bool,
    #[serde(skip)]
    pub generation: u64,
}

fn default_grid_span() -> u8 {
    1
}

impl Widget {
    pub fn new(kind: ChartKind, title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            grid_order: 0,
            grid_span: 1,
            min_height: None,
            aggregation_config: None,
            source: None,
            color: None,
            exclude_global_filters: false,
            rows: None,
            series: None,
            is_loading: false,
            generation: 0,
        }
    }

    pub fn with_config(mut self, config: AggregationConfig) -> Self {
        self.aggregation_config = Some(config);
        self
    }

    pub fn with_source(mut self, source: WidgetSource) -> Self {
        self.source = Some(source);
        self
    }
}

/// A named, reusable metric template independent of any one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMetric {
    pub id: String,
    pub name: String,
    pub metric: MetricSpec,
}

impl SavedMetric {
    pub fn new(name: impl Into<String>, metric: MetricSpec) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            metric,
        }
    }

    /// Clone the template for use in a widget, with a fresh metric id.
    pub fn instantiate(&self) -> MetricSpec {
        let mut metric = self.metric.clone();
        metric.id = uuid::Uuid::new_v4().to_string();
        metric
    }
}
