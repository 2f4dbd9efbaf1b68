use boardflow::models::{
    AggFunc, AggregationConfig, ChartKind, ConversionType, MetricSpec,
};
use boardflow::results::{
    coerce_number, infer_columns, process, ColumnType, SeriesKind, WidgetSeries,
};
use serde_json::{json, Map, Value};

fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn config_with(metrics: Vec<MetricSpec>) -> AggregationConfig {
    AggregationConfig {
        enabled: true,
        dimension: Some("city".to_string()),
        metrics,
        ..Default::default()
    }
}

fn total_metric() -> MetricSpec {
    let mut metric = MetricSpec::new(AggFunc::Sum, "amount");
    metric.alias = "total".to_string();
    metric
}

#[test]
fn column_types_inferred_from_first_row() {
    let columns = infer_columns(&row(&[
        ("name", json!("acme")),
        ("count", json!(3)),
        ("active", json!(true)),
        ("day", json!("2024-05-01")),
        ("at", json!("2024-05-01T12:30:00Z")),
        ("blob", Value::Null),
    ]));
    let types: Vec<ColumnType> = columns.iter().map(|c| c.column_type).collect();
    assert_eq!(
        types,
        vec![
            ColumnType::String,
            ColumnType::Number,
            ColumnType::Boolean,
            ColumnType::Date,
            ColumnType::Date,
            ColumnType::Unknown,
        ]
    );
}

#[test]
fn empty_rows_short_circuit_to_empty_series() {
    let result = process(&[], None, ChartKind::Bar, None, None, 100).unwrap();
    assert!(result.empty);
    assert!(result.columns.is_empty());
    let WidgetSeries::Chart(chart) = result.series else {
        panic!("expected chart series");
    };
    assert!(chart.labels.is_empty());
    assert!(chart.datasets.is_empty());

    // Shape of the config must not matter.
    let config = config_with(vec![total_metric()]);
    let result = process(&[], Some(&config), ChartKind::Kpi, None, None, 100).unwrap();
    assert!(result.empty);
}

#[test]
fn conversion_and_precision_applied_per_metric() {
    let mut metric = total_metric();
    metric.conversion_type = ConversionType::Divide;
    metric.conversion_factor = Some(1000.0);
    metric.precision = Some(2);
    let config = config_with(vec![metric]);

    let rows = vec![row(&[("city", json!("A")), ("total", json!(1234.567))])];
    let result = process(&rows, Some(&config), ChartKind::Bar, None, None, 100).unwrap();
    let WidgetSeries::Chart(chart) = result.series else {
        panic!("expected chart series");
    };
    assert_eq!(chart.datasets[0].data, vec![1.23]);
}

#[test]
fn divide_by_zero_leaves_value_unchanged() {
    let mut metric = total_metric();
    metric.conversion_type = ConversionType::Divide;
    metric.conversion_factor = Some(0.0);
    let config = config_with(vec![metric]);

    let rows = vec![row(&[("city", json!("A")), ("total", json!(1234.567))])];
    let result = process(&rows, Some(&config), ChartKind::Bar, None, None, 100).unwrap();
    let WidgetSeries::Chart(chart) = result.series else {
        panic!("expected chart series");
    };
    assert_eq!(chart.datasets[0].data, vec![1234.567]);
}

#[test]
fn kpi_sums_the_converted_value_field() {
    let mut metric = total_metric();
    metric.conversion_type = ConversionType::Multiply;
    metric.conversion_factor = Some(2.0);
    let config = config_with(vec![metric]);

    let rows = vec![
        row(&[("city", json!("A")), ("total", json!(10))]),
        row(&[("city", json!("B")), ("total", json!(5))]),
        // Non-numeric degrades to 0 instead of failing the widget.
        row(&[("city", json!("C")), ("total", json!("n/a"))]),
    ];
    let result = process(&rows, Some(&config), ChartKind::Kpi, None, None, 100).unwrap();
    let WidgetSeries::Scalar { value } = result.series else {
        panic!("expected scalar series");
    };
    assert_eq!(value, 30.0);
}

#[test]
fn combo_pairs_bar_and_line_series() {
    let mut count = MetricSpec::new(AggFunc::Count, "id");
    count.alias = "orders".to_string();
    let config = config_with(vec![total_metric(), count]);

    let rows = vec![row(&[
        ("city", json!("A")),
        ("total", json!(100)),
        ("orders", json!(4)),
    ])];
    let result = process(&rows, Some(&config), ChartKind::Combo, None, None, 100).unwrap();
    let WidgetSeries::Chart(chart) = result.series else {
        panic!("expected chart series");
    };
    assert_eq!(chart.datasets.len(), 2);
    assert_eq!(chart.datasets[0].kind, Some(SeriesKind::Bar));
    assert_eq!(chart.datasets[0].label, "total");
    assert_eq!(chart.datasets[1].kind, Some(SeriesKind::Line));
    assert_eq!(chart.datasets[1].label, "orders");
}

#[test]
fn combo_reuses_the_single_field_for_both_series() {
    let config = config_with(vec![total_metric()]);
    let rows = vec![row(&[("city", json!("A")), ("total", json!(100))])];
    let result = process(&rows, Some(&config), ChartKind::Combo, None, None, 100).unwrap();
    let WidgetSeries::Chart(chart) = result.series else {
        panic!("expected chart series");
    };
    assert_eq!(chart.datasets.len(), 2);
    assert_eq!(chart.datasets[0].label, "total");
    assert_eq!(chart.datasets[1].label, "total");
}

#[test]
fn table_rows_pass_through_capped() {
    let rows: Vec<_> = (0..5)
        .map(|i| row(&[("city", json!(format!("c{i}"))), ("total", json!(i))]))
        .collect();
    let result = process(&rows, None, ChartKind::Table, None, None, 2).unwrap();
    let WidgetSeries::Table { rows } = result.series else {
        panic!("expected table series");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["city"], json!("c0"));
}

#[test]
fn heuristics_pick_label_and_values_without_aggregation() {
    let rows = vec![row(&[
        ("id", json!(1)),
        ("region", json!("north")),
        ("units", json!(12)),
    ])];
    let result = process(&rows, None, ChartKind::Bar, None, None, 100).unwrap();
    let WidgetSeries::Chart(chart) = result.series else {
        panic!("expected chart series");
    };
    // First string column is the label; numeric columns are the values.
    assert_eq!(chart.labels, vec!["north".to_string()]);
    let labels: Vec<&str> = chart.datasets.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, vec!["id", "units"]);
}

#[test]
fn explicit_fields_override_heuristics() {
    let rows = vec![row(&[
        ("region", json!("north")),
        ("units", json!(12)),
        ("returns", json!(2)),
    ])];
    let values = vec!["returns".to_string()];
    let result = process(
        &rows,
        None,
        ChartKind::Bar,
        Some("region"),
        Some(&values),
        100,
    )
    .unwrap();
    let WidgetSeries::Chart(chart) = result.series else {
        panic!("expected chart series");
    };
    assert_eq!(chart.datasets.len(), 1);
    assert_eq!(chart.datasets[0].label, "returns");
    assert_eq!(chart.datasets[0].data, vec![2.0]);
}

#[test]
fn missing_label_field_is_an_error() {
    let config = AggregationConfig {
        enabled: true,
        dimension: None,
        metrics: vec![total_metric()],
        ..Default::default()
    };
    let rows = vec![row(&[("total", json!(1))])];
    let result = process(&rows, Some(&config), ChartKind::Bar, None, None, 100);
    assert!(result.is_err());
}

#[test]
fn coercion_failures_degrade_to_zero() {
    assert_eq!(coerce_number(&json!("12.5")), 12.5);
    assert_eq!(coerce_number(&json!(" 7 ")), 7.0);
    assert_eq!(coerce_number(&json!("garbage")), 0.0);
    assert_eq!(coerce_number(&Value::Null), 0.0);
    assert_eq!(coerce_number(&json!(true)), 1.0);
    assert_eq!(coerce_number(&json!([1])), 0.0);
}

#[test]
fn end_to_end_grouped_series() {
    let config = config_with(vec![total_metric()]);
    let rows = vec![
        row(&[("city", json!("A")), ("total", json!(300))]),
        row(&[("city", json!("B")), ("total", json!(100))]),
    ];
    let result = process(&rows, Some(&config), ChartKind::Bar, None, None, 100).unwrap();
    let WidgetSeries::Chart(chart) = result.series else {
        panic!("expected chart series");
    };
    assert_eq!(chart.labels, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(chart.datasets.len(), 1);
    assert_eq!(chart.datasets[0].label, "total");
    assert_eq!(chart.datasets[0].data, vec![300.0, 100.0]);
}
