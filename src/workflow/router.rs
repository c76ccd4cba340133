//! Top-level routing of task labels to workflows.

/// Task label for single-project sub-item extraction.
pub const SUB_PROCESS_EXTRACTION: &str = "sub_process_extraction";

/// Task label for cross-project cost analysis.
pub const GENERAL_COST_ANALYSIS: &str = "general_cost_analysis";

/// Where a query goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Extraction,
    Aggregation,
    /// Unknown or `"error"` label: stop without running a workflow.
    Halt,
}

pub fn route(task: &str) -> Route {
    match task.trim() {
        SUB_PROCESS_EXTRACTION => Route::Extraction,
        GENERAL_COST_ANALYSIS => Route::Aggregation,
        _ => Route::Halt,
    }
}
