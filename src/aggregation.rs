// 📊 Group-by Aggregation
// Collapse rows by a dimension label with a sum, mean or row count.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One bar/slice of a chart: a dimension label and its reduced measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedMeasure {
    pub label: String,
    pub value: f64,
}

impl GroupedMeasure {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        GroupedMeasure {
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reducer {
    /// Counts, employees, quantities
    Sum,
    /// Rates and indices
    Mean,
    /// Number of rows per label
    Count,
}

/// Group `rows` by `key` and reduce `measure`. Labels come out in ascending
/// order.
pub fn group_by<'a, T, I, K, M>(rows: I, key: K, measure: M, reducer: Reducer) -> Vec<GroupedMeasure>
where
    T: 'a,
    I: IntoIterator<Item = &'a T>,
    K: Fn(&T) -> &str,
    M: Fn(&T) -> f64,
{
    let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = groups.entry(key(row).to_string()).or_insert((0.0, 0));
        entry.0 += measure(row);
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(label, (sum, count))| {
            let value = match reducer {
                Reducer::Sum => sum,
                Reducer::Mean => sum / count as f64,
                Reducer::Count => count as f64,
            };
            GroupedMeasure { label, value }
        })
        .collect()
}

/// Count rows per label
pub fn count_by<'a, T, I, K>(rows: I, key: K) -> Vec<GroupedMeasure>
where
    T: 'a,
    I: IntoIterator<Item = &'a T>,
    K: Fn(&T) -> &str,
{
    group_by(rows, key, |_| 0.0, Reducer::Count)
}

/// Reorder groups along a fixed axis; labels not in `order` follow in their
/// current order
pub fn order_by_sequence(groups: Vec<GroupedMeasure>, order: &[String]) -> Vec<GroupedMeasure> {
    let position = |label: &str| order.iter().position(|o| o == label).unwrap_or(order.len());
    let mut indexed: Vec<(usize, usize, GroupedMeasure)> = groups
        .into_iter()
        .enumerate()
        .map(|(i, g)| (position(&g.label), i, g))
        .collect();
    indexed.sort_by_key(|(pos, i, _)| (*pos, *i));
    indexed.into_iter().map(|(_, _, g)| g).collect()
}

/// Largest value first; equal values keep their current (label) order
pub fn sort_by_value_desc(mut groups: Vec<GroupedMeasure>) -> Vec<GroupedMeasure> {
    groups.sort_by(|a, b| b.value.total_cmp(&a.value));
    groups
}

/// Value of the group with exactly this label, 0 when absent
pub fn value_of(groups: &[GroupedMeasure], label: &str) -> f64 {
    groups
        .iter()
        .find(|g| g.label == label)
        .map(|g| g.value)
        .unwrap_or(0.0)
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
