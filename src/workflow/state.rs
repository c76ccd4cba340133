//! Settings and mutable state threaded through a workflow run.

use crate::ledger::RecordStore;
use crate::models::{Candidate, FileFailure, ItemCost, Record, ValidatedItem};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Engine-wide settings, resolved from config and CLI.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub data_dir: PathBuf,
    pub extension: String,
    /// Ledger files processed at once by the cost analysis.
    pub concurrency: usize,
    /// Limit for each individual port call.
    pub port_timeout: Duration,
    /// Limit for answering one query end to end.
    pub deadline: Duration,
    /// Deepest record level shown to the candidate finder.
    pub max_candidate_depth: usize,
    pub show_progress: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            extension: "txt".to_string(),
            concurrency: 1,
            port_timeout: Duration::from_secs(300),
            deadline: Duration::from_secs(1800),
            max_candidate_depth: 4,
            show_progress: false,
        }
    }
}

/// Context owned by one workflow execution. Never shared between runs.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub query: String,
    pub keyword: String,
    pub available_files: Vec<String>,
    pub data_dir: PathBuf,
    /// Index of the next file the cost analysis loop will visit.
    pub cursor: usize,
    /// Loop iterations completed, one per visited file.
    pub iterations: usize,
    pub item_costs: Vec<ItemCost>,
    /// Files that contributed at least one item cost, in visit order.
    pub files_with_data: Vec<String>,
    pub failures: Vec<FileFailure>,
    pub store: Arc<RecordStore>,
    pub candidates: Vec<Candidate>,
    pub validated: Vec<ValidatedItem>,
    /// Records gathered by the extraction workflow.
    pub collected: Vec<Record>,
}

impl WorkflowState {
    pub fn new(
        query: impl Into<String>,
        keyword: impl Into<String>,
        available_files: Vec<String>,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            query: query.into(),
            keyword: keyword.into(),
            available_files,
            data_dir: data_dir.into(),
            cursor: 0,
            iterations: 0,
            item_costs: Vec::new(),
            files_with_data: Vec::new(),
            failures: Vec::new(),
            store: Arc::new(RecordStore::default()),
            candidates: Vec::new(),
            validated: Vec::new(),
            collected: Vec::new(),
        }
    }

    /// Clear the loop accumulators.
    pub fn reset_loop(&mut self) {
        self.cursor = 0;
        self.iterations = 0;
        self.item_costs.clear();
        self.files_with_data.clear();
        self.failures.clear();
    }

    pub fn mark_file_with_data(&mut self, file_name: &str) {
        if !self.files_with_data.iter().any(|f| f == file_name) {
            self.files_with_data.push(file_name.to_string());
        }
    }
}
