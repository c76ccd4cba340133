//! Record store parsed from one ledger file.
//!
//! Ledger lines have the shape `id:name;spec;cost`. Parsing never fails:
//! lines without a `:` are skipped and missing segments get placeholders.

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Record, NONE_SENTINEL, ZERO_COST};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Ordered, immutable collection of records from a single ledger file.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    /// First position of every id.
    index: HashMap<String, usize>,
}

impl RecordStore {
    /// Parse raw ledger text.
    pub fn parse(contents: &str) -> Self {
        let records = contents.lines().filter_map(parse_line).collect();
        Self::from_records(records)
    }

    /// Build a store from already-parsed records, keeping their order.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if index.contains_key(&record.id) {
                debug!("Duplicate record id {} ignored for lookups", record.id);
                continue;
            }
            index.insert(record.id.clone(), position);
        }
        Self { records, index }
    }

    /// Read and parse a ledger file.
    pub async fn load(path: &Path) -> LedgerResult<Self> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| LedgerError::FileParse {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;

        let store = Self::parse(&contents);
        info!(
            "Loaded {} records from {}",
            store.len(),
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string())
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Exact lookup by id.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.index.get(id).map(|&position| &self.records[position])
    }

    /// All direct and indirect descendants of `parent_id`, in file order.
    pub fn descendants(&self, parent_id: &str) -> Vec<&Record> {
        let prefix = format!("{}.", parent_id);
        self.records
            .iter()
            .filter(|record| record.id.starts_with(&prefix))
            .collect()
    }

    /// Records whose depth does not exceed `max_depth`, in file order.
    pub fn up_to_depth(&self, max_depth: usize) -> Vec<Record> {
        self.records
            .iter()
            .filter(|record| record.depth() <= max_depth)
            .cloned()
            .collect()
    }
}

fn parse_line(line: &str) -> Option<Record> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (id, rest) = line.split_once(':')?;
    let mut segments = rest.split(';').map(str::trim);

    let name = segments.next().unwrap_or(NONE_SENTINEL);
    let spec = segments.next().unwrap_or(NONE_SENTINEL);
    let cost = segments.next().unwrap_or(ZERO_COST);

    Some(Record {
        id: id.trim().to_string(),
        name: name.to_string(),
        spec: spec.to_string(),
        cost: cost.to_string(),
    })
}
