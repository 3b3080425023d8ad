//! Column statistics over a materialized result set
//!
//! Nothing here touches the database. Full-table statistics are produced by
//! the provider from aggregate statements (see
//! [`QueryBuilder::build_aggregates`](crate::query_builder::QueryBuilder::build_aggregates))
//! and share the [`ColumnStats`] shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::query_builder::TOP_VALUES_LIMIT;
use crate::schema::{ColumnStats, DataSummary, NullCount, ResultSet, TypeCategory, ValueFrequency};

/// Which rows statistics describe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsScope {
    /// Only the rows of the current page
    #[default]
    Page,

    /// Every row matching the filters, computed in the database
    Table,
}

/// Compute per-column statistics for the rows of `result`
///
/// Returns one entry per column, in column order.
pub fn compute_stats(result: &ResultSet) -> Vec<ColumnStats> {
    result
        .columns
        .iter()
        .map(|column| {
            let values: Vec<&Value> = result
                .rows
                .iter()
                .map(|row| row.get(&column.name).unwrap_or(&Value::Null))
                .collect();
            column_stats(&column.name, column.category, &values)
        })
        .collect()
}

fn column_stats(name: &str, category: TypeCategory, values: &[&Value]) -> ColumnStats {
    let mut stats = ColumnStats::empty(name, category);
    stats.count = values.len() as u64;

    let present: Vec<&Value> = values.iter().copied().filter(|value| !value.is_null()).collect();
    stats.null_count = stats.count - present.len() as u64;

    let distinct: HashSet<String> = present.iter().map(|value| value_key(value)).collect();
    stats.distinct_count = distinct.len() as u64;

    if category.is_numeric() {
        let numbers: Vec<f64> = present.iter().filter_map(|value| as_number(value)).collect();
        fill_numeric(&mut stats, numbers);
    } else {
        stats.top_values = top_values(&present, TOP_VALUES_LIMIT);
    }

    if category.is_text() {
        let lengths: Vec<u64> = present
            .iter()
            .filter_map(|value| value.as_str())
            .map(|text| text.chars().count() as u64)
            .collect();

        if !lengths.is_empty() {
            stats.min_length = lengths.iter().min().copied();
            stats.max_length = lengths.iter().max().copied();
            stats.mean_length = Some(lengths.iter().sum::<u64>() as f64 / lengths.len() as f64);
        }
    }

    stats
}

/// Canonical text used to compare values for equality
fn value_key(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Numeric value of a cell; exact numerics arrive as text
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|number| number.is_finite()),
        _ => None,
    }
}

fn fill_numeric(stats: &mut ColumnStats, mut numbers: Vec<f64>) {
    if numbers.is_empty() {
        return;
    }

    let count = numbers.len() as f64;
    let mean = numbers.iter().sum::<f64>() / count;

    numbers.sort_by(f64::total_cmp);
    let middle = numbers.len() / 2;
    let median = if numbers.len() % 2 == 0 {
        (numbers[middle - 1] + numbers[middle]) / 2.0
    } else {
        numbers[middle]
    };

    stats.min = numbers.first().copied();
    stats.max = numbers.last().copied();
    stats.mean = Some(mean);
    stats.median = Some(median);
    stats.std_dev = if numbers.len() > 1 {
        let variance = numbers
            .iter()
            .map(|number| (number - mean).powi(2))
            .sum::<f64>()
            / (count - 1.0);
        Some(variance.sqrt())
    } else {
        None
    };
}

/// Most frequent values, ties broken by first appearance
fn top_values(values: &[&Value], limit: usize) -> Vec<ValueFrequency> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut frequencies: Vec<ValueFrequency> = Vec::new();

    for value in values {
        let key = value_key(value);
        match positions.get(&key) {
            Some(&position) => frequencies[position].count += 1,
            None => {
                positions.insert(key, frequencies.len());
                frequencies.push(ValueFrequency {
                    value: (*value).clone(),
                    count: 1,
                });
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts
    frequencies.sort_by(|left, right| right.count.cmp(&left.count));
    frequencies.truncate(limit);
    frequencies
}

/// Describe the shape of a result set
pub fn summarize(result: &ResultSet) -> DataSummary {
    let mut summary = DataSummary {
        row_count: result.rows.len() as u64,
        column_count: result.columns.len() as u64,
        null_counts: Vec::with_capacity(result.columns.len()),
        numeric_columns: Vec::new(),
        text_columns: Vec::new(),
        temporal_columns: Vec::new(),
        boolean_columns: Vec::new(),
        other_columns: Vec::new(),
    };

    for column in &result.columns {
        let nulls = result
            .rows
            .iter()
            .filter(|row| row.get(&column.name).map_or(true, Value::is_null))
            .count() as u64;
        summary.null_counts.push(NullCount {
            column: column.name.clone(),
            nulls,
        });

        let bucket = match column.category {
            TypeCategory::Numeric => &mut summary.numeric_columns,
            TypeCategory::Text => &mut summary.text_columns,
            TypeCategory::Temporal => &mut summary.temporal_columns,
            TypeCategory::Boolean => &mut summary.boolean_columns,
            TypeCategory::Other => &mut summary.other_columns,
        };
        bucket.push(column.name.clone());
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{QuerySpec, ResultColumn, Row};
    use serde_json::json;

    fn result_set(columns: &[(&str, TypeCategory)], rows: Vec<Value>) -> ResultSet {
        ResultSet {
            columns: columns
                .iter()
                .map(|(name, category)| ResultColumn {
                    name: name.to_string(),
                    category: *category,
                })
                .collect(),
            total: rows.len() as u64,
            rows: rows
                .into_iter()
                .map(|row| match row {
                    Value::Object(map) => map,
                    _ => Row::new(),
                })
                .collect(),
            spec: QuerySpec::new("t"),
        }
    }

    #[test]
    fn test_numeric_stats() {
        let result = result_set(
            &[("amount", TypeCategory::Numeric)],
            vec![
                json!({"amount": 10}),
                json!({"amount": "2.50"}),
                json!({"amount": null}),
                json!({"amount": 7.5}),
                json!({"amount": 10}),
            ],
        );

        let stats = compute_stats(&result);
        let amount = &stats[0];
        assert_eq!(amount.count, 5);
        assert_eq!(amount.null_count, 1);
        assert_eq!(amount.distinct_count, 3);
        assert_eq!(amount.min, Some(2.5));
        assert_eq!(amount.max, Some(10.0));
        assert_eq!(amount.mean, Some(7.5));
        assert_eq!(amount.median, Some(8.75));
        assert!(amount.std_dev.unwrap() > 3.5 && amount.std_dev.unwrap() < 3.6);
        assert!(amount.top_values.is_empty());
    }

    #[test]
    fn test_all_null_numeric_reports_absent_values() {
        let result = result_set(
            &[("amount", TypeCategory::Numeric)],
            vec![json!({"amount": null}), json!({"amount": null})],
        );

        let stats = compute_stats(&result);
        let amount = &stats[0];
        assert_eq!(amount.null_count, 2);
        assert_eq!(amount.distinct_count, 0);
        assert_eq!(amount.min, None);
        assert_eq!(amount.max, None);
        assert_eq!(amount.mean, None);

        let serialized = serde_json::to_value(amount).unwrap();
        assert!(serialized.get("min").is_none());
        assert!(serialized.get("mean").is_none());
    }

    #[test]
    fn test_top_values_ties_keep_first_seen_order() {
        let rows = ["b", "a", "c", "a", "b", "d", "e", "f", "c"]
            .iter()
            .map(|status| json!({ "status": status }))
            .chain(std::iter::once(json!({ "status": null })))
            .collect();
        let result = result_set(&[("status", TypeCategory::Text)], rows);

        let stats = compute_stats(&result);
        let top: Vec<(&str, u64)> = stats[0]
            .top_values
            .iter()
            .map(|frequency| (frequency.value.as_str().unwrap(), frequency.count))
            .collect();

        assert_eq!(top, vec![("b", 2), ("a", 2), ("c", 2), ("d", 1), ("e", 1)]);
        assert_eq!(stats[0].distinct_count, 6);
        assert_eq!(stats[0].null_count, 1);
        assert_eq!(stats[0].min_length, Some(1));
        assert_eq!(stats[0].mean_length, Some(1.0));
    }

    #[test]
    fn test_boolean_and_missing_keys() {
        let result = result_set(
            &[("shipped", TypeCategory::Boolean)],
            vec![json!({"shipped": true}), json!({"shipped": false}), json!({}), json!({"shipped": true})],
        );

        let stats = compute_stats(&result);
        assert_eq!(stats[0].null_count, 1);
        assert_eq!(stats[0].top_values[0].value, json!(true));
        assert_eq!(stats[0].top_values[0].count, 2);
        assert_eq!(stats[0].min_length, None);
    }

    #[test]
    fn test_empty_result_set() {
        let result = result_set(&[("id", TypeCategory::Numeric), ("note", TypeCategory::Text)], vec![]);
        let stats = compute_stats(&result);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].count, 0);
        assert_eq!(stats[0].mean, None);
        assert!(stats[1].top_values.is_empty());
    }

    #[test]
    fn test_summarize_groups_by_category() {
        let result = result_set(
            &[
                ("id", TypeCategory::Numeric),
                ("note", TypeCategory::Text),
                ("at", TypeCategory::Temporal),
                ("doc", TypeCategory::Other),
            ],
            vec![json!({"id": 1, "note": null, "at": "2024-01-01", "doc": null})],
        );

        let summary = summarize(&result);
        assert_eq!(summary.row_count, 1);
        assert_eq!(summary.column_count, 4);
        assert_eq!(summary.numeric_columns, vec!["id"]);
        assert_eq!(summary.other_columns, vec!["doc"]);
        assert_eq!(summary.null_counts[1].nulls, 1);
        assert_eq!(summary.null_counts[0].nulls, 0);
    }

    #[test]
    fn test_scope_deserializes_lowercase() {
        let scope: StatsScope = serde_json::from_value(json!("table")).unwrap();
        assert_eq!(scope, StatsScope::Table);
        assert_eq!(StatsScope::default(), StatsScope::Page);
    }
}
