//! Deterministic port stubs for workflow tests.

use crate::agent::{CandidateFinder, CandidateValidator, IntentPlanner, Ports};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Candidate, Record, TaskPlan, ValidatedItem};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn ports_with(
    planner: Arc<dyn IntentPlanner>,
    finder: Arc<dyn CandidateFinder>,
    validator: Arc<dyn CandidateValidator>,
) -> Ports {
    Ports::new(planner, finder, validator)
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Normal,
    Malformed,
    Unreachable,
    Slow(Duration),
}

/// Returns a fixed plan, or an intent parse error when none is set.
#[derive(Default)]
pub struct StubPlanner {
    plan: Option<TaskPlan>,
    calls: AtomicUsize,
}

impl StubPlanner {
    pub fn returning(plan: TaskPlan) -> Self {
        Self {
            plan: Some(plan),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentPlanner for StubPlanner {
    async fn plan(&self, _query: &str, _available_files: &[String]) -> LedgerResult<TaskPlan> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.plan
            .clone()
            .ok_or_else(|| LedgerError::IntentParse("stub reply was not JSON".to_string()))
    }
}

/// Proposes every root record whose name contains the keyword.
pub struct StubFinder {
    mode: Mode,
    calls: AtomicUsize,
    last_record_count: AtomicUsize,
}

impl Default for StubFinder {
    fn default() -> Self {
        Self::with_mode(Mode::Normal)
    }
}

impl StubFinder {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            last_record_count: AtomicUsize::new(0),
        }
    }

    pub fn malformed() -> Self {
        Self::with_mode(Mode::Malformed)
    }

    pub fn unreachable() -> Self {
        Self::with_mode(Mode::Unreachable)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_record_count(&self) -> usize {
        self.last_record_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidateFinder for StubFinder {
    async fn find_candidates(
        &self,
        _query: &str,
        keyword: &str,
        records: &[Record],
    ) -> LedgerResult<Vec<Candidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_record_count.store(records.len(), Ordering::SeqCst);

        match self.mode {
            Mode::Malformed => Err(LedgerError::PortResponse {
                port: "candidate finder",
                reason: "stub".to_string(),
            }),
            Mode::Unreachable => Err(LedgerError::Port {
                port: "candidate finder",
                reason: "connection refused".to_string(),
            }),
            Mode::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Vec::new())
            }
            Mode::Normal => {
                let keyword = keyword.to_lowercase();
                Ok(records
                    .iter()
                    .filter(|r| r.depth() == 1 && r.name.to_lowercase().contains(&keyword))
                    .map(|r| Candidate::new(r.id.clone(), r.name.clone()))
                    .collect())
            }
        }
    }
}

/// Confirms every candidate it receives.
pub struct StubValidator {
    mode: Mode,
    calls: AtomicUsize,
    last_input: Mutex<Vec<Candidate>>,
}

impl Default for StubValidator {
    fn default() -> Self {
        Self::with_mode(Mode::Normal)
    }
}

impl StubValidator {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(Vec::new()),
        }
    }

    pub fn malformed() -> Self {
        Self::with_mode(Mode::Malformed)
    }

    pub fn slow(delay: Duration) -> Self {
        Self::with_mode(Mode::Slow(delay))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Vec<Candidate> {
        self.last_input.lock().unwrap().clone()
    }
}

#[async_trait]
impl CandidateValidator for StubValidator {
    async fn validate(
        &self,
        _query: &str,
        _keyword: &str,
        candidates: &[Candidate],
    ) -> LedgerResult<Vec<ValidatedItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap() = candidates.to_vec();

        match self.mode {
            Mode::Malformed => Err(LedgerError::PortResponse {
                port: "candidate validator",
                reason: "stub".to_string(),
            }),
            Mode::Unreachable => Err(LedgerError::Port {
                port: "candidate validator",
                reason: "connection refused".to_string(),
            }),
            Mode::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Vec::new())
            }
            Mode::Normal => Ok(candidates.iter().cloned().map(ValidatedItem::from).collect()),
        }
    }
}
