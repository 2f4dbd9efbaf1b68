//! Metric compilation.
//!
//! Turns UI-side metric specs into request-ready descriptors, stripping the
//! presentation-only fields (conversion, precision, string coercion) that
//! only the result post-processor consumes. Formula text is passed through
//! verbatim; only the `metric_<n>` placeholder syntax is checked here, index
//! bounds are the backend's problem.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::models::{AggFunc, CastHint, FilterOperator, MetricSpec, NumericCast};

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"metric_(\d+)").unwrap());
static PLACEHOLDER_LIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bmetric_[A-Za-z0-9_]*").unwrap());

/// A metric descriptor as sent to the aggregate-data endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRequest {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub func: Option<AggFunc>,
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast: Option<CastHint>,
}

/// Wire form of a metric's row-level condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionRequest {
    pub field: String,
    pub operator: FilterOperator,
    pub value: Value,
}

/// Compile an ordered metrics list. Order is significant: it defines the
/// `metric_0, metric_1, ...` positions formulas refer to.
pub fn compile_metrics(metrics: &[MetricSpec]) -> Vec<MetricRequest> {
    let mut seen = HashSet::new();
    let mut compiled = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let request = compile_metric(metric);
        if !seen.insert(request.alias.clone()) {
            // Last write wins in the result map; surface it instead of
            // silently overwriting.
            tracing::warn!(alias = %request.alias, "duplicate metric alias; later metric shadows earlier result column");
        }
        compiled.push(request);
    }
    compiled
}

fn compile_metric(metric: &MetricSpec) -> MetricRequest {
    if metric.func == AggFunc::Formula {
        let formula = metric.formula.clone().unwrap_or_default();
        for token in malformed_placeholders(&formula) {
            tracing::warn!(formula = %formula, token = %token, "formula placeholder is not metric_<n>");
        }
        return MetricRequest {
            field: String::new(),
            func: None,
            alias: metric.wire_alias(),
            condition: None,
            formula: Some(formula),
            cast: None,
        };
    }

    let cast = match metric.numeric_cast {
        NumericCast::Sanitize => Some(CastHint::Sanitize),
        NumericCast::Numeric => Some(CastHint::Numeric),
        NumericCast::None => None,
    };
    MetricRequest {
        field: metric.field.clone(),
        func: Some(metric.func),
        alias: metric.wire_alias(),
        condition: metric.condition.as_ref().map(|c| ConditionRequest {
            field: c.field.clone(),
            operator: c.operator,
            value: c.value.clone(),
        }),
        formula: None,
        cast,
    }
}

/// Positional indices referenced by a formula, in order of appearance.
pub fn formula_placeholders(formula: &str) -> Vec<usize> {
    PLACEHOLDER_RE
        .captures_iter(formula)
        .filter_map(|c| c[1].parse().ok())
        .collect()
}

fn malformed_placeholders(formula: &str) -> Vec<String> {
    static FULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^metric_\d+$").unwrap());
    PLACEHOLDER_LIKE_RE
        .find_iter(formula)
        .filter(|m| !FULL.is_match(m.as_str()))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Rewrite `metric_<n>` references through `remap` (old index to new index).
///
/// References `remap` cannot resolve are left untouched and returned as
/// dangling, so the caller can warn without losing the user's formula text.
pub fn rewrite_placeholders(
    formula: &str,
    remap: impl Fn(usize) -> Option<usize>,
) -> (String, Vec<usize>) {
    let mut dangling = Vec::new();
    let rewritten = PLACEHOLDER_RE.replace_all(formula, |caps: &regex::Captures<'_>| {
        let old: usize = caps[1].parse().unwrap_or(usize::MAX);
        match remap(old) {
            Some(new) => format!("metric_{new}"),
            None => {
                dangling.push(old);
                caps[0].to_string()
            }
        }
    });
    (rewritten.into_owned(), dangling)
}
