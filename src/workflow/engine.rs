//! Query engine: plan, route, and run one workflow per question.

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{LedgerScanner, StoreCache};
use crate::models::{QueryOutcome, QueryReport, TaskPlan};
use crate::agent::Ports;
use crate::workflow::aggregation::AggregationWorkflow;
use crate::workflow::extraction::ExtractionWorkflow;
use crate::workflow::router::{route, Route};
use crate::workflow::stages::{with_timeout, RunContext};
use crate::workflow::state::EngineSettings;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Answers questions against the ledgers of one data directory.
pub struct QueryEngine {
    ports: Ports,
    settings: EngineSettings,
    scanner: LedgerScanner,
}

impl QueryEngine {
    pub fn new(ports: Ports, settings: EngineSettings) -> Self {
        let scanner = LedgerScanner::new(settings.data_dir.clone(), settings.extension.clone());
        Self {
            ports,
            settings,
            scanner,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Answer one query. Never fails: every error becomes part of the report.
    pub async fn answer(&self, query: &str) -> QueryReport {
        let start_time = Instant::now();
        let query = query.trim();
        info!("Query: {}", query);

        let (task, outcome) =
            match tokio::time::timeout(self.settings.deadline, self.answer_inner(query)).await {
                Ok(answered) => answered,
                Err(_) => {
                    let e = LedgerError::Timeout {
                        operation: "query",
                        after: self.settings.deadline,
                    };
                    error!("{}", e);
                    (None, QueryOutcome::failed(&e))
                }
            };

        QueryReport {
            query: query.to_string(),
            generated_at: Utc::now(),
            task,
            outcome,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        }
    }

    async fn answer_inner(&self, query: &str) -> (Option<String>, QueryOutcome) {
        let files = self.scanner.list_ledger_files();
        let plan = self.plan(query, &files).await;
        let task = plan.task.clone();

        let outcome = match route(&task) {
            Route::Halt => {
                let message = plan
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("unsupported task {:?}", task));
                warn!("Halting: {}", message);
                QueryOutcome::Halted {
                    task: task.clone(),
                    message,
                }
            }
            Route::Extraction => self.run_extraction(&plan, query, files).await,
            Route::Aggregation => self.run_aggregation(&plan, query, files).await,
        };

        (Some(task), outcome)
    }

    /// Ask the planner for a task. Failures become an `"error"` plan.
    async fn plan(&self, query: &str, files: &[String]) -> TaskPlan {
        if files.is_empty() {
            return TaskPlan::error(format!(
                "no ledger files available in {}",
                self.scanner.data_dir().display()
            ));
        }

        let planned = with_timeout(
            "intent planner",
            self.settings.port_timeout,
            self.ports.planner.plan(query, files),
        )
        .await;

        match planned {
            Ok(plan) => {
                debug!("Plan: {:?}", plan);
                plan
            }
            Err(e) => {
                warn!("Intent step failed: {}", e);
                TaskPlan::error(e.to_string())
            }
        }
    }

    /// Fresh per-query context; the store cache lives only as long as it.
    fn run_context(&self) -> RunContext {
        RunContext {
            ports: self.ports.clone(),
            cache: Arc::new(StoreCache::new(self.settings.data_dir.clone())),
            port_timeout: self.settings.port_timeout,
            max_candidate_depth: self.settings.max_candidate_depth,
        }
    }

    async fn run_extraction(&self, plan: &TaskPlan, query: &str, files: Vec<String>) -> QueryOutcome {
        let ctx = self.run_context();
        let cache = ctx.cache.clone();

        let result = ExtractionWorkflow::new(ctx)
            .run(plan, query, files, &self.settings.data_dir)
            .await
            .map(QueryOutcome::Extraction);

        debug!("Parsed {} ledger files", cache.parses());
        finish(result)
    }

    async fn run_aggregation(&self, plan: &TaskPlan, query: &str, files: Vec<String>) -> QueryOutcome {
        let ctx = self.run_context();
        let cache = ctx.cache.clone();

        let workflow =
            AggregationWorkflow::new(ctx, self.settings.concurrency, self.settings.show_progress);
        let result = workflow
            .run(plan, query, files, &self.settings.data_dir)
            .await
            .map(QueryOutcome::CostAnalysis);

        debug!("Parsed {} ledger files", cache.parses());
        finish(result)
    }
}

fn finish(result: LedgerResult<QueryOutcome>) -> QueryOutcome {
    result.unwrap_or_else(|e| {
        error!("Query failed: {}", e);
        QueryOutcome::failed(&e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AggregationOutcome, ExtractionOutcome};
    use crate::workflow::router::{GENERAL_COST_ANALYSIS, SUB_PROCESS_EXTRACTION};
    use crate::workflow::testing::{ports_with, StubFinder, StubPlanner, StubValidator};
    use std::time::Duration;
    use tempfile::TempDir;

    fn engine(dir: &TempDir, planner: Arc<StubPlanner>, validator: StubValidator) -> QueryEngine {
        let settings = EngineSettings {
            data_dir: dir.path().to_path_buf(),
            port_timeout: Duration::from_secs(5),
            ..EngineSettings::default()
        };
        let ports = ports_with(planner, Arc::new(StubFinder::default()), Arc::new(validator));
        QueryEngine::new(ports, settings)
    }

    fn data_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("p1.txt"),
            "1:Gurim Bridge;PSC;0\n1.1:Piers;c;40\n1.2:Deck;s;60\n2:Earthwork;cut;30",
        )
        .unwrap();
        std::fs::write(dir.path().join("p2.txt"), "1:Namjeong Bridge;steel;300").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_extraction_query() {
        let dir = data_dir();
        let plan = TaskPlan::new(SUB_PROCESS_EXTRACTION)
            .with_parameter("file_name", "p1.txt")
            .with_parameter("process_name", "bridge");
        let engine = engine(&dir, Arc::new(StubPlanner::returning(plan)), StubValidator::default());

        let report = engine.answer("  bridge items in p1  ").await;

        assert_eq!(report.query, "bridge items in p1");
        assert_eq!(report.task.as_deref(), Some(SUB_PROCESS_EXTRACTION));
        match report.outcome {
            QueryOutcome::Extraction(ExtractionOutcome::Items { records, .. }) => {
                assert_eq!(records.len(), 3);
            }
            other => panic!("expected items, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cost_analysis_query() {
        let dir = data_dir();
        let plan = TaskPlan::new(GENERAL_COST_ANALYSIS).with_parameter("process_name", "bridge");
        let engine = engine(&dir, Arc::new(StubPlanner::returning(plan)), StubValidator::default());

        let report = engine.answer("average bridge cost").await;

        match report.outcome {
            QueryOutcome::CostAnalysis(AggregationOutcome::Summary { summary, files_with_data, .. }) => {
                assert_eq!(summary.item_count, 2);
                assert_eq!(summary.average, 200.0);
                assert_eq!(files_with_data.len(), 2);
            }
            other => panic!("expected summary, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_task_halts() {
        let dir = data_dir();
        let plan = TaskPlan::new("forecast_budget");
        let engine = engine(&dir, Arc::new(StubPlanner::returning(plan)), StubValidator::default());

        let report = engine.answer("forecast").await;
        assert!(matches!(report.outcome, QueryOutcome::Halted { ref task, .. } if task == "forecast_budget"));
    }

    #[tokio::test]
    async fn test_error_plan_halts_with_its_message() {
        let dir = data_dir();
        let planner = Arc::new(StubPlanner::returning(TaskPlan::error("question is off topic")));
        let engine = engine(&dir, planner.clone(), StubValidator::default());

        let report = engine.answer("weather tomorrow").await;

        assert_eq!(planner.calls(), 1);
        match report.outcome {
            QueryOutcome::Halted { task, message } => {
                assert_eq!(task, TaskPlan::ERROR_TASK);
                assert_eq!(message, "question is off topic");
            }
            other => panic!("expected halt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_intent_parse_error_halts_with_diagnostic() {
        let dir = data_dir();
        let engine = engine(&dir, Arc::new(StubPlanner::default()), StubValidator::default());

        let report = engine.answer("???").await;

        assert_eq!(report.task.as_deref(), Some(TaskPlan::ERROR_TASK));
        match report.outcome {
            QueryOutcome::Halted { message, .. } => assert!(message.contains("not JSON")),
            other => panic!("expected halt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_files_skips_planner() {
        let dir = TempDir::new().unwrap();
        let planner = Arc::new(StubPlanner::default());
        let engine = engine(&dir, planner.clone(), StubValidator::default());

        let report = engine.answer("average bridge cost").await;

        assert_eq!(planner.calls(), 0);
        match report.outcome {
            QueryOutcome::Halted { message, .. } => {
                assert!(message.contains("no ledger files available"))
            }
            other => panic!("expected halt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_parameter_fails_only_the_query() {
        let dir = data_dir();
        let plan = TaskPlan::new(SUB_PROCESS_EXTRACTION).with_parameter("process_name", "bridge");
        let engine = engine(&dir, Arc::new(StubPlanner::returning(plan)), StubValidator::default());

        let first = engine.answer("bridge items").await;
        let second = engine.answer("bridge items").await;

        for report in [first, second] {
            assert!(matches!(
                report.outcome,
                QueryOutcome::Failed { ref kind, .. } if kind == "missing_required_parameter"
            ));
        }
    }

    #[tokio::test]
    async fn test_deadline_fails_with_timeout() {
        let dir = data_dir();
        let plan = TaskPlan::new(GENERAL_COST_ANALYSIS).with_parameter("process_name", "bridge");
        let settings = EngineSettings {
            data_dir: dir.path().to_path_buf(),
            port_timeout: Duration::from_secs(60),
            deadline: Duration::from_millis(50),
            ..EngineSettings::default()
        };
        let ports = ports_with(
            Arc::new(StubPlanner::returning(plan)),
            Arc::new(StubFinder::default()),
            Arc::new(StubValidator::slow(Duration::from_secs(30))),
        );
        let engine = QueryEngine::new(ports, settings);

        let report = engine.answer("average bridge cost").await;

        assert!(report.task.is_none());
        assert!(matches!(
            report.outcome,
            QueryOutcome::Failed { ref kind, .. } if kind == "timeout"
        ));
    }
}
