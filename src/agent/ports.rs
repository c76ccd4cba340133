//! Capability ports backed by a language model.
//!
//! The workflows only see these traits, so they can run against the LLM
//! adapters in [`crate::agent::planners`] or against deterministic stubs.

use crate::error::LedgerResult;
use crate::models::{Candidate, Record, TaskPlan, ValidatedItem};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns a free-text question into a task label and parameters.
///
/// Malformed model output is reported as [`LedgerError::IntentParse`].
///
/// [`LedgerError::IntentParse`]: crate::error::LedgerError::IntentParse
#[async_trait]
pub trait IntentPlanner: Send + Sync {
    async fn plan(&self, query: &str, available_files: &[String]) -> LedgerResult<TaskPlan>;
}

/// Proposes top-level work items matching a keyword.
///
/// Never called with an empty record list.
#[async_trait]
pub trait CandidateFinder: Send + Sync {
    async fn find_candidates(
        &self,
        query: &str,
        keyword: &str,
        records: &[Record],
    ) -> LedgerResult<Vec<Candidate>>;
}

/// Keeps the candidates that are relevant to the question.
///
/// Only ever receives fact-checked, name-deduplicated candidates.
#[async_trait]
pub trait CandidateValidator: Send + Sync {
    async fn validate(
        &self,
        query: &str,
        keyword: &str,
        candidates: &[Candidate],
    ) -> LedgerResult<Vec<ValidatedItem>>;
}

/// The three ports a query engine needs.
#[derive(Clone)]
pub struct Ports {
    pub planner: Arc<dyn IntentPlanner>,
    pub finder: Arc<dyn CandidateFinder>,
    pub validator: Arc<dyn CandidateValidator>,
}

impl Ports {
    pub fn new(
        planner: Arc<dyn IntentPlanner>,
        finder: Arc<dyn CandidateFinder>,
        validator: Arc<dyn CandidateValidator>,
    ) -> Self {
        Self {
            planner,
            finder,
            validator,
        }
    }
}
