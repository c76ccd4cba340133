//! Cost rollup over the record hierarchy.
//!
//! A top-level item costs the sum of all its descendants. When that sum is
//! zero, or the item has no descendants, the item's own cost line is used.

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::RecordStore;
use serde::Serialize;
use std::fmt;

/// Where a rolled-up cost came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    Descendants,
    OwnLine,
}

impl fmt::Display for CostSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostSource::Descendants => write!(f, "sum of sub-items"),
            CostSource::OwnLine => write!(f, "own line"),
        }
    }
}

/// A rolled-up cost and its source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rollup {
    pub cost: f64,
    pub source: CostSource,
}

/// Compute the total cost of `parent_id` within `store`.
///
/// Any descendant with a non-numeric cost fails the whole rollup. The
/// parent record is only required when the fallback applies.
pub fn rollup(parent_id: &str, store: &RecordStore) -> LedgerResult<Rollup> {
    let descendants = store.descendants(parent_id);

    let mut total = 0.0;
    for record in &descendants {
        total += record.cost_value()?;
    }

    if descendants.is_empty() || total == 0.0 {
        let parent = store
            .get(parent_id)
            .ok_or_else(|| LedgerError::MissingParentRecord(parent_id.to_string()))?;
        return Ok(Rollup {
            cost: parent.cost_value()?,
            source: CostSource::OwnLine,
        });
    }

    Ok(Rollup {
        cost: total,
        source: CostSource::Descendants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_sum_ignores_own_cost() {
        let store = RecordStore::parse("P:Parent;s;999\nP.1:a;s;10\nP.2:b;s;20");
        let result = rollup("P", &store).unwrap();
        assert_eq!(result.cost, 30.0);
        assert_eq!(result.source, CostSource::Descendants);
    }

    #[test]
    fn test_zero_children_fall_back_to_own_line() {
        let store = RecordStore::parse("P:Parent;s;500\nP.1:a;s;0\nP.2:b;s;0");
        let result = rollup("P", &store).unwrap();
        assert_eq!(result.cost, 500.0);
        assert_eq!(result.source, CostSource::OwnLine);
    }

    #[test]
    fn test_leaf_uses_own_line() {
        let store = RecordStore::parse("P:Parent;s;500\nQ:Other;s;1");
        assert_eq!(rollup("P", &store).unwrap().cost, 500.0);
    }

    #[test]
    fn test_scenario_bridge_with_sub_items() {
        let store = RecordStore::parse("1:Bridge A;spec;100\n1.1:Sub;spec;40\n1.2:Sub;spec;60");
        assert_eq!(rollup("1", &store).unwrap().cost, 100.0);
    }

    #[test]
    fn test_scenario_bridge_with_zero_sub_items() {
        let store = RecordStore::parse("1:Bridge A;spec;500\n1.1:Sub;spec;0\n1.2:Sub;spec;0");
        assert_eq!(rollup("1", &store).unwrap().cost, 500.0);
    }

    #[test]
    fn test_indirect_descendants_are_summed() {
        let store = RecordStore::parse("1:a;s;0\n1.1:b;s;10\n1.1.1:c;s;5");
        assert_eq!(rollup("1", &store).unwrap().cost, 15.0);
    }

    #[test]
    fn test_bad_child_cost_is_fatal() {
        let store = RecordStore::parse("1:a;s;100\n1.1:b;s;ten\n1.2:c;s;5");
        assert!(matches!(
            rollup("1", &store),
            Err(LedgerError::CostCoercion { ref id, .. }) if id == "1.1"
        ));
    }

    #[test]
    fn test_missing_parent_on_fallback() {
        let store = RecordStore::parse("1.1:b;s;0");
        assert!(matches!(
            rollup("1", &store),
            Err(LedgerError::MissingParentRecord(_))
        ));
    }

    #[test]
    fn test_missing_parent_not_needed_when_children_sum() {
        let store = RecordStore::parse("1.1:b;s;7");
        assert_eq!(rollup("1", &store).unwrap().cost, 7.0);
    }
}
