//! Cross-project cost analysis.
//!
//! The outer loop visits every available ledger file exactly once. Each
//! file runs its own load/classify/validate/aggregate pipeline; up to
//! `concurrency` pipelines run at once, and their results are merged in
//! file order so reports read the same for every run.

use crate::analysis::{format_currency, rollup, summarize};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::RecordStore;
use crate::models::{AggregationOutcome, Candidate, FileFailure, ItemCost, TaskPlan, ValidatedItem};
use crate::workflow::stages::RunContext;
use crate::workflow::state::WorkflowState;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stages of the outer file loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStage {
    Start,
    /// Wait for the pipeline of the file at the cursor.
    ProcessFile,
    /// Merge that file's costs and advance the cursor.
    Accumulate,
    Finalize,
    Done,
}

impl LoopStage {
    pub fn next(self, cursor: usize, file_count: usize) -> Self {
        match self {
            LoopStage::Start if file_count == 0 => LoopStage::Finalize,
            LoopStage::Start => LoopStage::ProcessFile,
            LoopStage::ProcessFile => LoopStage::Accumulate,
            LoopStage::Accumulate if cursor >= file_count => LoopStage::Finalize,
            LoopStage::Accumulate => LoopStage::ProcessFile,
            LoopStage::Finalize | LoopStage::Done => LoopStage::Done,
        }
    }
}

/// Stages of the per-file pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStage {
    LoadFile,
    Classify,
    Validate,
    Aggregate,
    Done,
}

impl FileStage {
    pub fn next(self) -> Self {
        match self {
            FileStage::LoadFile => FileStage::Classify,
            FileStage::Classify => FileStage::Validate,
            FileStage::Validate => FileStage::Aggregate,
            FileStage::Aggregate | FileStage::Done => FileStage::Done,
        }
    }
}

/// Working data of one file's pipeline.
#[derive(Debug, Clone, Default)]
pub struct FileState {
    pub store: Arc<RecordStore>,
    pub candidates: Vec<Candidate>,
    pub validated: Vec<ValidatedItem>,
    pub item_costs: Vec<ItemCost>,
}

#[derive(Debug)]
pub struct FileOutcome {
    pub file_name: String,
    pub state: FileState,
    pub failure: Option<FileFailure>,
}

pub struct AggregationWorkflow {
    ctx: RunContext,
    concurrency: usize,
    show_progress: bool,
}

impl AggregationWorkflow {
    pub fn new(ctx: RunContext, concurrency: usize, show_progress: bool) -> Self {
        Self {
            ctx,
            concurrency: concurrency.max(1),
            show_progress,
        }
    }

    pub async fn run(
        &self,
        plan: &TaskPlan,
        query: &str,
        available_files: Vec<String>,
        data_dir: &Path,
    ) -> LedgerResult<AggregationOutcome> {
        let keyword = plan
            .parameter("process_name")
            .ok_or(LedgerError::MissingRequiredParameter("process_name"))?;

        let mut state = WorkflowState::new(query, keyword, available_files, PathBuf::from(data_dir));
        Ok(self.execute(&mut state).await)
    }

    /// Drive the file loop to completion over `state.available_files`.
    pub async fn execute(&self, state: &mut WorkflowState) -> AggregationOutcome {
        let ctx = self.ctx.clone();
        let query: Arc<str> = Arc::from(state.query.as_str());
        let keyword: Arc<str> = Arc::from(state.keyword.as_str());

        let pipelines = stream::iter(state.available_files.clone())
            .map(move |file_name| process_file(ctx.clone(), query.clone(), keyword.clone(), file_name))
            .buffered(self.concurrency);
        let mut pipelines = pin!(pipelines);

        let file_count = state.available_files.len();
        let progress = self.progress_bar(file_count);
        let mut current: Option<FileOutcome> = None;
        let mut stage = LoopStage::Start;

        while stage != LoopStage::Done {
            match stage {
                LoopStage::Start => {
                    state.reset_loop();
                    info!(
                        "Analysing {:?} across {} ledger files in {}",
                        state.keyword,
                        file_count,
                        state.data_dir.display()
                    );
                }
                LoopStage::ProcessFile => {
                    current = pipelines.next().await;
                }
                LoopStage::Accumulate => {
                    match current.take() {
                        Some(file) => accumulate(state, file),
                        None => warn!("No result for file {}", state.cursor + 1),
                    }
                    state.cursor += 1;
                    state.iterations += 1;
                    progress.inc(1);
                }
                LoopStage::Finalize => {
                    progress.finish_and_clear();
                    info!(
                        "Visited {} files, {} with data",
                        state.iterations,
                        state.files_with_data.len()
                    );
                }
                LoopStage::Done => {}
            }
            stage = stage.next(state.cursor, file_count);
        }

        finalize(state)
    }

    fn progress_bar(&self, file_count: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(file_count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ledgers")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}

/// Run the pipeline of one file. Failures are isolated to that file.
async fn process_file(
    ctx: RunContext,
    query: Arc<str>,
    keyword: Arc<str>,
    file_name: String,
) -> FileOutcome {
    let mut file = FileState::default();
    let mut stage = FileStage::LoadFile;

    while stage != FileStage::Done {
        if let Err(e) = step_file(&ctx, stage, &query, &keyword, &file_name, &mut file).await {
            warn!("Skipping {}: {}", file_name, e);
            let failure = Some(FileFailure::new(file_name.as_str(), &e));
            return FileOutcome {
                file_name,
                state: file,
                failure,
            };
        }
        stage = stage.next();
    }

    FileOutcome {
        file_name,
        state: file,
        failure: None,
    }
}

async fn step_file(
    ctx: &RunContext,
    stage: FileStage,
    query: &str,
    keyword: &str,
    file_name: &str,
    file: &mut FileState,
) -> LedgerResult<()> {
    debug!("{}: stage {:?}", file_name, stage);
    match stage {
        FileStage::LoadFile => {
            file.store = ctx.cache.load_or_empty(file_name).await;
        }
        FileStage::Classify => {
            file.candidates = ctx.classify(query, keyword, &file.store).await?;
        }
        FileStage::Validate => {
            file.validated = ctx
                .validate(query, keyword, &file.candidates, &file.store)
                .await?;
        }
        FileStage::Aggregate => {
            for item in &file.validated {
                match rollup(&item.id, &file.store) {
                    Ok(total) => {
                        info!(
                            "  {:?} ({}) in {}: {} [{}]",
                            item.name,
                            item.id,
                            file_name,
                            format_currency(total.cost),
                            total.source
                        );
                        file.item_costs.push(ItemCost {
                            file_name: file_name.to_string(),
                            id: item.id.clone(),
                            name: item.name.clone(),
                            cost: total.cost,
                        });
                    }
                    Err(e) => warn!("No cost for {} in {}: {}", item.id, file_name, e),
                }
            }
        }
        FileStage::Done => {}
    }
    Ok(())
}

fn accumulate(state: &mut WorkflowState, outcome: FileOutcome) {
    let FileOutcome {
        file_name,
        state: file,
        failure,
    } = outcome;

    debug!(
        "{}: {} candidates, {} validated, {} costs",
        file_name,
        file.candidates.len(),
        file.validated.len(),
        file.item_costs.len()
    );

    if let Some(failure) = failure {
        state.failures.push(failure);
    }
    if !file.item_costs.is_empty() {
        state.mark_file_with_data(&file_name);
    }

    state.item_costs.extend(file.item_costs);
    state.store = file.store;
    state.candidates = file.candidates;
    state.validated = file.validated;
}

fn finalize(state: &WorkflowState) -> AggregationOutcome {
    let keyword = state.keyword.clone();
    let files_scanned = state.available_files.len();
    let failures = state.failures.clone();

    match summarize(&state.item_costs) {
        None => AggregationOutcome::NoCostData {
            keyword,
            files_scanned,
            failures,
        },
        Some(summary) => AggregationOutcome::Summary {
            keyword,
            files_scanned,
            files_with_data: state.files_with_data.clone(),
            summary,
            items: state.item_costs.clone(),
            failures,
        },
    }
}
