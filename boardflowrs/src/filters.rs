//! Filter normalization.
//!
//! Rewrites raw filter values into the canonical shape each operator family
//! expects on the wire. Invalid values drop the single filter, never the
//! whole request.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::models::{CastHint, Filter, FilterOperator};

static DAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static SPANISH_MONTHS: Lazy<HashMap<&'static str, i64>> = Lazy::new(|| {
    HashMap::from([
        ("ENERO", 1),
        ("FEBRERO", 2),
        ("MARZO", 3),
        ("ABRIL", 4),
        ("MAYO", 5),
        ("JUNIO", 6),
        ("JULIO", 7),
        ("AGOSTO", 8),
        ("SEPTIEMBRE", 9),
        // Alternate spelling in common use.
        ("SETIEMBRE", 9),
        ("OCTUBRE", 10),
        ("NOVIEMBRE", 11),
        ("DICIEMBRE", 12),
    ])
});

/// Canonical per-operator value shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Scalar(Value),
    List(Vec<Value>),
    Range(Value, Value),
}

impl FilterValue {
    /// The raw json this value round-trips to in a `Filter`.
    pub fn to_json(&self) -> Value {
        match self {
            FilterValue::Null => Value::Null,
            FilterValue::Scalar(v) => v.clone(),
            FilterValue::List(items) => Value::Array(items.clone()),
            FilterValue::Range(lo, hi) => Value::Array(vec![lo.clone(), hi.clone()]),
        }
    }
}

/// A filter ready for transmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedFilter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast: Option<CastHint>,
}

impl From<&NormalizedFilter> for Filter {
    fn from(nf: &NormalizedFilter) -> Self {
        let mut filter = Filter::new(nf.field.clone(), nf.operator, nf.value.to_json());
        filter.convert_to_number = nf.cast == Some(CastHint::Numeric);
        filter
    }
}

/// Normalize one filter; `None` means the filter is dropped.
pub fn normalize(filter: &Filter) -> Option<NormalizedFilter> {
    let value = match filter.operator {
        FilterOperator::Month => normalize_month(&filter.value)?,
        FilterOperator::Year => normalize_year(&filter.value)?,
        FilterOperator::Day => normalize_day(&filter.value)?,
        FilterOperator::Is | FilterOperator::IsNot => FilterValue::Null,
        FilterOperator::In => normalize_in(&filter.value)?,
        FilterOperator::Between => normalize_between(&filter.value)?,
        FilterOperator::Like | FilterOperator::ILike => normalize_like(&filter.value)?,
        _ => normalize_scalar(&filter.value)?,
    };
    let cast = match filter.operator {
        FilterOperator::Month
        | FilterOperator::Year
        | FilterOperator::Day
        | FilterOperator::Is
        | FilterOperator::IsNot => None,
        _ if filter.convert_to_number => Some(CastHint::Numeric),
        _ => None,
    };
    Some(NormalizedFilter {
        field: filter.field.clone(),
        operator: filter.operator,
        value,
        cast,
    })
}

/// Normalize a combined filter pool: widget-local filters first, then the
/// dashboard-wide pool unless the widget opts out. Duplicates on the same
/// field are kept; the backend ANDs them. Invalid filters drop one by one.
pub fn normalize_pool(
    local: &[Filter],
    global: &[Filter],
    exclude_global: bool,
) -> Vec<NormalizedFilter> {
    let global: &[Filter] = if exclude_global { &[] } else { global };
    local
        .iter()
        .chain(global.iter())
        .filter_map(|f| {
            let normalized = normalize(f);
            if normalized.is_none() {
                tracing::debug!(field = %f.field, operator = ?f.operator, "dropping invalid filter");
            }
            normalized
        })
        .collect()
}

fn normalize_month(value: &Value) -> Option<FilterValue> {
    let month = match value {
        Value::String(s) => {
            let name = s.trim().to_uppercase();
            match SPANISH_MONTHS.get(name.as_str()) {
                Some(m) => *m,
                None => name.parse::<i64>().ok()?,
            }
        }
        Value::Number(n) => n.as_i64()?,
        _ => return None,
    };
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(FilterValue::Scalar(Value::from(month)))
}

fn normalize_year(value: &Value) -> Option<FilterValue> {
    let year = match value {
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        Value::Number(n) => n.as_i64()?,
        _ => return None,
    };
    if !(1900..=2100).contains(&year) {
        return None;
    }
    Some(FilterValue::Scalar(Value::from(year)))
}

fn normalize_day(value: &Value) -> Option<FilterValue> {
    let s = value.as_str()?;
    if !DAY_RE.is_match(s) {
        return None;
    }
    Some(FilterValue::Scalar(value.clone()))
}

fn normalize_in(value: &Value) -> Option<FilterValue> {
    let items = match value {
        Value::Array(items) => items.clone(),
        Value::Null => return None,
        other => vec![other.clone()],
    };
    if items.is_empty() {
        return None;
    }
    Some(FilterValue::List(items))
}

fn normalize_between(value: &Value) -> Option<FilterValue> {
    match value {
        Value::Array(items) if items.len() == 2 => {
            Some(FilterValue::Range(items[0].clone(), items[1].clone()))
        }
        Value::Object(map) => {
            let lo = map.get("from")?;
            let hi = map.get("to")?;
            Some(FilterValue::Range(lo.clone(), hi.clone()))
        }
        _ => None,
    }
}

fn normalize_like(value: &Value) -> Option<FilterValue> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    // Already-wrapped values pass through unchanged so normalization stays
    // idempotent.
    let wrapped = if text.starts_with('%') && text.ends_with('%') && text.len() > 1 {
        text
    } else {
        format!("%{text}%")
    };
    Some(FilterValue::Scalar(Value::String(wrapped)))
}

fn normalize_scalar(value: &Value) -> Option<FilterValue> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        other => Some(FilterValue::Scalar(other.clone())),
    }
}
