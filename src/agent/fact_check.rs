//! Grounding of port output against the record store.
//!
//! Model output is untrusted: a candidate survives only if its id exists in
//! the store and its name overlaps the recorded name.

use crate::ledger::RecordStore;
use crate::models::{Candidate, ValidatedItem};
use std::collections::HashSet;
use tracing::debug;

/// True when `id` names a record whose name contains `name` or is
/// contained in it.
pub fn matches_store(id: &str, name: &str, store: &RecordStore) -> bool {
    let (id, name) = (id.trim(), name.trim());
    if id.is_empty() || name.is_empty() {
        return false;
    }

    store
        .get(id)
        .is_some_and(|record| record.name.contains(name) || name.contains(record.name.as_str()))
}

/// Drop candidates that do not match the store, then keep the first
/// candidate per distinct name.
pub fn fact_check(candidates: &[Candidate], store: &RecordStore) -> Vec<Candidate> {
    let mut seen_names = HashSet::new();
    let checked: Vec<Candidate> = candidates
        .iter()
        .filter(|c| matches_store(&c.id, &c.name, store))
        .filter(|c| seen_names.insert(c.name.trim().to_string()))
        .map(|c| Candidate::new(c.id.trim(), c.name.trim()))
        .collect();

    debug!(
        "Fact check kept {} of {} candidates",
        checked.len(),
        candidates.len()
    );
    checked
}

/// Re-verify validated items against the store and drop repeated ids.
pub fn verify_validated(items: Vec<ValidatedItem>, store: &RecordStore) -> Vec<ValidatedItem> {
    let total = items.len();
    let mut seen_ids = HashSet::new();
    let verified: Vec<ValidatedItem> = items
        .into_iter()
        .filter(|item| matches_store(&item.id, &item.name, store))
        .map(|item| ValidatedItem::new(item.id.trim(), item.name.trim()))
        .filter(|item| seen_ids.insert(item.id.clone()))
        .collect();

    if verified.len() < total {
        debug!(
            "Dropped {} validated items not grounded in the ledger",
            total - verified.len()
        );
    }
    verified
}
