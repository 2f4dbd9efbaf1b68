use boardflow::filters::{normalize, normalize_pool, FilterValue};
use boardflow::models::{CastHint, Filter, FilterOperator};
use serde_json::{json, Value};

fn filter(field: &str, operator: FilterOperator, value: Value) -> Filter {
    Filter::new(field, operator, value)
}

#[test]
fn month_names_map_to_numbers() {
    let normalized = normalize(&filter("month", FilterOperator::Month, json!("marzo"))).unwrap();
    assert_eq!(normalized.value, FilterValue::Scalar(json!(3)));

    // Alternate September spelling and surrounding whitespace both accepted.
    let normalized =
        normalize(&filter("month", FilterOperator::Month, json!(" Setiembre "))).unwrap();
    assert_eq!(normalized.value, FilterValue::Scalar(json!(9)));

    let normalized = normalize(&filter("month", FilterOperator::Month, json!("12"))).unwrap();
    assert_eq!(normalized.value, FilterValue::Scalar(json!(12)));
}

#[test]
fn month_out_of_range_dropped() {
    assert!(normalize(&filter("month", FilterOperator::Month, json!("13"))).is_none());
    assert!(normalize(&filter("month", FilterOperator::Month, json!(0))).is_none());
    assert!(normalize(&filter("month", FilterOperator::Month, json!("nope"))).is_none());
}

#[test]
fn year_bounds_enforced() {
    let normalized = normalize(&filter("year", FilterOperator::Year, json!("2024"))).unwrap();
    assert_eq!(normalized.value, FilterValue::Scalar(json!(2024)));

    assert!(normalize(&filter("year", FilterOperator::Year, json!(1899))).is_none());
    assert!(normalize(&filter("year", FilterOperator::Year, json!(2101))).is_none());
    assert!(normalize(&filter("year", FilterOperator::Year, json!("two thousand"))).is_none());
}

#[test]
fn day_requires_strict_iso_shape() {
    let normalized = normalize(&filter("day", FilterOperator::Day, json!("2024-01-05"))).unwrap();
    assert_eq!(normalized.value, FilterValue::Scalar(json!("2024-01-05")));

    assert!(normalize(&filter("day", FilterOperator::Day, json!("2024-1-5"))).is_none());
    assert!(normalize(&filter("day", FilterOperator::Day, json!("05/01/2024"))).is_none());
}

#[test]
fn like_wraps_wildcards_once() {
    let normalized = normalize(&filter("name", FilterOperator::Like, json!("acme"))).unwrap();
    assert_eq!(normalized.value, FilterValue::Scalar(json!("%acme%")));

    let rewrapped = normalize(&filter("name", FilterOperator::ILike, json!("%acme%"))).unwrap();
    assert_eq!(rewrapped.value, FilterValue::Scalar(json!("%acme%")));

    assert!(normalize(&filter("name", FilterOperator::Like, json!(""))).is_none());
    assert!(normalize(&filter("name", FilterOperator::Like, json!("   "))).is_none());
}

#[test]
fn in_requires_a_non_empty_list() {
    let normalized =
        normalize(&filter("city", FilterOperator::In, json!(["Lima", "Cusco"]))).unwrap();
    assert_eq!(
        normalized.value,
        FilterValue::List(vec![json!("Lima"), json!("Cusco")])
    );

    // A lone scalar is promoted to a single-element list.
    let normalized = normalize(&filter("city", FilterOperator::In, json!("Lima"))).unwrap();
    assert_eq!(normalized.value, FilterValue::List(vec![json!("Lima")]));

    assert!(normalize(&filter("city", FilterOperator::In, json!([]))).is_none());
}

#[test]
fn between_accepts_pair_or_range_object() {
    let normalized =
        normalize(&filter("amount", FilterOperator::Between, json!([10, 20]))).unwrap();
    assert_eq!(normalized.value, FilterValue::Range(json!(10), json!(20)));

    let normalized = normalize(&filter(
        "amount",
        FilterOperator::Between,
        json!({"from": 10, "to": 20}),
    ))
    .unwrap();
    assert_eq!(normalized.value, FilterValue::Range(json!(10), json!(20)));

    assert!(normalize(&filter("amount", FilterOperator::Between, json!([10]))).is_none());
    assert!(normalize(&filter("amount", FilterOperator::Between, json!(10))).is_none());
}

#[test]
fn null_checks_ignore_the_value() {
    let normalized =
        normalize(&filter("closed_at", FilterOperator::Is, json!("whatever"))).unwrap();
    assert_eq!(normalized.value, FilterValue::Null);

    let normalized = normalize(&filter("closed_at", FilterOperator::IsNot, Value::Null)).unwrap();
    assert_eq!(normalized.value, FilterValue::Null);
}

#[test]
fn numeric_cast_hint_attached_for_comparison_operators() {
    let mut raw = filter("amount", FilterOperator::Gte, json!("100"));
    raw.convert_to_number = true;
    let normalized = normalize(&raw).unwrap();
    assert_eq!(normalized.cast, Some(CastHint::Numeric));

    // Temporal operators normalize their own values; no cast hint.
    let mut raw = filter("month", FilterOperator::Month, json!("3"));
    raw.convert_to_number = true;
    let normalized = normalize(&raw).unwrap();
    assert_eq!(normalized.cast, None);
}

#[test]
fn scalar_operators_reject_structured_values() {
    assert!(normalize(&filter("x", FilterOperator::Eq, json!([1, 2]))).is_none());
    assert!(normalize(&filter("x", FilterOperator::Eq, Value::Null)).is_none());
    assert!(normalize(&filter("x", FilterOperator::Lt, json!(5))).is_some());
}

#[test]
fn normalization_is_idempotent() {
    let samples = vec![
        filter("month", FilterOperator::Month, json!("octubre")),
        filter("year", FilterOperator::Year, json!("1999")),
        filter("day", FilterOperator::Day, json!("2023-12-31")),
        filter("name", FilterOperator::Like, json!("widget")),
        filter("city", FilterOperator::In, json!(["A", "B"])),
        filter("amount", FilterOperator::Between, json!([1, 2])),
        filter("closed", FilterOperator::Is, Value::Null),
        filter("total", FilterOperator::Gt, json!(10)),
    ];
    for raw in samples {
        let first = normalize(&raw).unwrap();
        let second = normalize(&Filter::from(&first)).unwrap();
        assert_eq!(first, second, "operator {:?}", raw.operator);
    }
}

#[test]
fn pool_keeps_local_first_and_honors_exclusion() {
    let local = vec![
        filter("status", FilterOperator::Eq, json!("open")),
        // Invalid: dropped without blocking the rest.
        filter("month", FilterOperator::Month, json!("99")),
    ];
    let global = vec![filter("status", FilterOperator::Eq, json!("active"))];

    let combined = normalize_pool(&local, &global, false);
    assert_eq!(combined.len(), 2);
    assert_eq!(combined[0].value, FilterValue::Scalar(json!("open")));
    // Same-field duplicates are both sent; the backend ANDs them.
    assert_eq!(combined[1].value, FilterValue::Scalar(json!("active")));

    let local_only = normalize_pool(&local, &global, true);
    assert_eq!(local_only.len(), 1);
    assert_eq!(local_only[0].value, FilterValue::Scalar(json!("open")));
}

#[test]
fn normalized_filter_serializes_flat_value() {
    let normalized =
        normalize(&filter("amount", FilterOperator::Between, json!([5, 9]))).unwrap();
    let wire = serde_json::to_value(&normalized).unwrap();
    assert_eq!(wire["field"], json!("amount"));
    assert_eq!(wire["operator"], json!("BETWEEN"));
    assert_eq!(wire["value"], json!([5, 9]));
    assert!(wire.get("cast").is_none());
}
