//! Single-project extraction: the sub-items of a named work package.
//!
//! Stages run strictly in order: load, classify, validate, collect.

use crate::error::{LedgerError, LedgerResult};
use crate::models::{ExtractionOutcome, TaskPlan};
use crate::workflow::stages::RunContext;
use crate::workflow::state::WorkflowState;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extraction stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Load,
    Classify,
    Validate,
    Collect,
    Done,
}

impl ExtractionStage {
    pub fn next(self) -> Self {
        match self {
            ExtractionStage::Load => ExtractionStage::Classify,
            ExtractionStage::Classify => ExtractionStage::Validate,
            ExtractionStage::Validate => ExtractionStage::Collect,
            ExtractionStage::Collect | ExtractionStage::Done => ExtractionStage::Done,
        }
    }
}

pub struct ExtractionWorkflow {
    ctx: RunContext,
}

impl ExtractionWorkflow {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        plan: &TaskPlan,
        query: &str,
        available_files: Vec<String>,
        data_dir: &Path,
    ) -> LedgerResult<ExtractionOutcome> {
        let file_name = ledger_file_parameter(plan)?;
        let keyword = plan
            .parameter("process_name")
            .ok_or(LedgerError::MissingRequiredParameter("process_name"))?;

        if !available_files.iter().any(|f| f == file_name) {
            warn!("{} is not among the discovered ledger files", file_name);
        }

        let mut state = WorkflowState::new(query, keyword, available_files, PathBuf::from(data_dir));
        let mut stage = ExtractionStage::Load;

        while stage != ExtractionStage::Done {
            debug!("Extraction stage {:?}", stage);
            self.step(stage, file_name, &mut state).await?;
            stage = stage.next();
        }

        Ok(outcome(file_name, state))
    }

    async fn step(
        &self,
        stage: ExtractionStage,
        file_name: &str,
        state: &mut WorkflowState,
    ) -> LedgerResult<()> {
        match stage {
            ExtractionStage::Load => {
                state.store = self.ctx.cache.load_or_empty(file_name).await;
            }
            ExtractionStage::Classify => {
                let candidates = self
                    .ctx
                    .classify(&state.query, &state.keyword, &state.store)
                    .await?;
                state.candidates = candidates;
            }
            ExtractionStage::Validate => {
                let validated = self
                    .ctx
                    .validate(&state.query, &state.keyword, &state.candidates, &state.store)
                    .await?;
                state.validated = validated;
            }
            ExtractionStage::Collect => {
                let mut collected = Vec::new();
                for item in &state.validated {
                    if let Some(own) = state.store.get(&item.id) {
                        collected.push(own.clone());
                    }
                    collected.extend(state.store.descendants(&item.id).into_iter().cloned());
                }
                info!(
                    "Collected {} records for {} validated items",
                    collected.len(),
                    state.validated.len()
                );
                state.collected = collected;
            }
            ExtractionStage::Done => {}
        }
        Ok(())
    }
}

/// The `file_name` parameter, which must be a bare file name.
fn ledger_file_parameter(plan: &TaskPlan) -> LedgerResult<&str> {
    let file_name = plan
        .parameter("file_name")
        .ok_or(LedgerError::MissingRequiredParameter("file_name"))?;

    let is_bare = Path::new(file_name)
        .file_name()
        .is_some_and(|name| name == file_name);
    if !is_bare {
        return Err(LedgerError::InvalidParameter {
            name: "file_name",
            reason: format!("{:?} is not a plain file name", file_name),
        });
    }
    Ok(file_name)
}

fn outcome(file_name: &str, state: WorkflowState) -> ExtractionOutcome {
    let file_name = file_name.to_string();
    let keyword = state.keyword;

    if state.validated.is_empty() {
        ExtractionOutcome::NoRelatedItems { keyword, file_name }
    } else if state.collected.is_empty() {
        // Validated ids always exist in the store they were checked against.
        ExtractionOutcome::NoSubItems { keyword, file_name }
    } else {
        ExtractionOutcome::Items {
            keyword,
            file_name,
            records: state.collected,
        }
    }
}
