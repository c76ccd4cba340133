//! Cost aggregation and statistics.
//!
//! This module turns the per-item costs collected across ledger files into
//! the summary figures of a cost analysis report.

use crate::models::{CostSummary, ItemCost};
use std::collections::BTreeMap;

/// Compute count, total and average. `None` when there are no costs.
pub fn summarize(items: &[ItemCost]) -> Option<CostSummary> {
    if items.is_empty() {
        return None;
    }

    let item_count = items.len();
    let total: f64 = items.iter().map(|item| item.cost).sum();

    Some(CostSummary {
        item_count,
        total,
        average: total / item_count as f64,
    })
}

/// Group item costs by ledger file, keeping item order within each file.
pub fn group_by_file(items: &[ItemCost]) -> BTreeMap<String, Vec<ItemCost>> {
    let mut grouped: BTreeMap<String, Vec<ItemCost>> = BTreeMap::new();

    for item in items {
        grouped
            .entry(item.file_name.clone())
            .or_default()
            .push(item.clone());
    }

    grouped
}

/// Cheapest and most expensive item.
pub fn cost_range(items: &[ItemCost]) -> Option<(&ItemCost, &ItemCost)> {
    let min = items.iter().min_by(|a, b| a.cost.total_cmp(&b.cost))?;
    let max = items.iter().max_by(|a, b| a.cost.total_cmp(&b.cost))?;
    Some((min, max))
}

/// Round to whole currency units and add thousands separators.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
