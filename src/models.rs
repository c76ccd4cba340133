//! Data models for ledger analysis.
//!
//! This module contains the records parsed from ledger files, the
//! candidate/validated pairs exchanged with the ports, and the outcome
//! and report types produced for every query.

use crate::error::{LedgerError, LedgerResult};
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Placeholder used for a missing name or spec segment.
pub const NONE_SENTINEL: &str = "None";

/// Placeholder used for a missing cost segment.
pub const ZERO_COST: &str = "0";

/// One line of ledger data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Dot-separated hierarchical identifier, e.g. `3.2.1`.
    pub id: String,
    /// Work-item label.
    pub name: String,
    /// Free-text specification.
    pub spec: String,
    /// Total cost as written in the ledger; coerced on demand.
    pub cost: String,
}

impl Record {
    /// Number of id segments. Roots have depth 1.
    pub fn depth(&self) -> usize {
        self.id.split('.').count()
    }

    /// Coerce the cost field to a number.
    pub fn cost_value(&self) -> LedgerResult<f64> {
        let raw = self.cost.trim();
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(LedgerError::CostCoercion {
                id: self.id.clone(),
                raw: self.cost.clone(),
            }),
        }
    }
}

/// Accept a record id written as a JSON string or number. Models often
/// drop the quotes around ids like `3` or `1.2`.
fn record_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "record id must be a string or a number, got {}",
            other
        ))),
    }
}

/// A top-level work item proposed by the classifier port. Unverified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "record", alias = "id", default, deserialize_with = "record_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Candidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A candidate confirmed relevant by the validator port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedItem {
    #[serde(rename = "record", alias = "id", default, deserialize_with = "record_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl ValidatedItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl From<Candidate> for ValidatedItem {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name,
        }
    }
}

/// Task label and parameters produced by the intent planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub task: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

impl TaskPlan {
    /// Label used when the intent step fails.
    pub const ERROR_TASK: &'static str = "error";

    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.parameters
            .insert(key.to_string(), Value::String(value.into()));
        self
    }

    /// A plan that routes to halt and carries a diagnostic message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Self::ERROR_TASK).with_parameter("message", message)
    }

    /// String parameter, treating empty values and `"None"` as absent.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        let value = self.parameters.get(key)?.as_str()?.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(NONE_SENTINEL) {
            None
        } else {
            Some(value)
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.parameter("message")
    }
}

/// Cost attributed to one validated item of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCost {
    pub file_name: String,
    pub id: String,
    pub name: String,
    pub cost: f64,
}

/// A ledger file whose processing failed during aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file_name: String,
    pub kind: String,
    pub message: String,
}

impl FileFailure {
    pub fn new(file_name: impl Into<String>, error: &LedgerError) -> Self {
        Self {
            file_name: file_name.into(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Summary statistics over the accumulated item costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub item_count: usize,
    pub total: f64,
    pub average: f64,
}

/// Result of the single-project extraction workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// The validator confirmed nothing for the keyword.
    NoRelatedItems { keyword: String, file_name: String },
    /// Items were validated but no matching records were collected.
    ///
    /// Validated items are re-checked against the same store they are
    /// collected from, so the extraction workflow only produces this when
    /// the store no longer holds them.
    NoSubItems { keyword: String, file_name: String },
    /// Validated items with all their descendant records.
    Items {
        keyword: String,
        file_name: String,
        records: Vec<Record>,
    },
}

/// Result of the multi-project cost analysis workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AggregationOutcome {
    NoCostData {
        keyword: String,
        files_scanned: usize,
        failures: Vec<FileFailure>,
    },
    Summary {
        keyword: String,
        files_scanned: usize,
        files_with_data: Vec<String>,
        summary: CostSummary,
        items: Vec<ItemCost>,
        failures: Vec<FileFailure>,
    },
}

/// Terminal state of one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "result", rename_all = "snake_case")]
pub enum QueryOutcome {
    Extraction(ExtractionOutcome),
    CostAnalysis(AggregationOutcome),
    /// Unrecognised or error task label; no workflow ran.
    Halted { task: String, message: String },
    /// The query could not be completed.
    Failed { kind: String, message: String },
}

impl QueryOutcome {
    pub fn failed(error: &LedgerError) -> Self {
        QueryOutcome::Failed {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// The complete answer to one query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub query: String,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    pub outcome: QueryOutcome,
    pub duration_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, cost: &str) -> Record {
        Record {
            id: id.to_string(),
            name: "Item".to_string(),
            spec: NONE_SENTINEL.to_string(),
            cost: cost.to_string(),
        }
    }

    #[test]
    fn test_record_depth() {
        assert_eq!(record("3", "0").depth(), 1);
        assert_eq!(record("3.2.1", "0").depth(), 3);
    }

    #[test]
    fn test_cost_coercion() {
        assert_eq!(record("1", " 1500 ").cost_value().unwrap(), 1500.0);
        assert_eq!(record("1", "12.5").cost_value().unwrap(), 12.5);
        assert!(matches!(
            record("1.4", "abc").cost_value(),
            Err(LedgerError::CostCoercion { ref id, .. }) if id == "1.4"
        ));
        assert!(record("1", "").cost_value().is_err());
        assert!(record("1", "inf").cost_value().is_err());
    }

    #[test]
    fn test_candidate_deserializes_record_key() {
        let candidate: Candidate =
            serde_json::from_str(r#"{"record": "2.1", "name": "Bridge"}"#).unwrap();
        assert_eq!(candidate, Candidate::new("2.1", "Bridge"));

        let partial: Candidate = serde_json::from_str(r#"{"name": "Bridge"}"#).unwrap();
        assert!(partial.id.is_empty());
    }

    #[test]
    fn test_numeric_record_id() {
        let item: ValidatedItem =
            serde_json::from_str(r#"{"record": 1, "name": "Gurim Bridge"}"#).unwrap();
        assert_eq!(item, ValidatedItem::new("1", "Gurim Bridge"));

        let nested: Candidate = serde_json::from_str(r#"{"id": 2.1, "name": "Deck"}"#).unwrap();
        assert_eq!(nested.id, "2.1");

        assert!(serde_json::from_str::<Candidate>(r#"{"record": true, "name": "x"}"#).is_err());
    }

    #[test]
    fn test_task_plan_parameters() {
        let plan = TaskPlan::new("sub_process_extraction")
            .with_parameter("file_name", "None")
            .with_parameter("process_name", " bridge works ");
        assert_eq!(plan.parameter("file_name"), None);
        assert_eq!(plan.parameter("process_name"), Some("bridge works"));
        assert_eq!(plan.parameter("missing"), None);

        let error = TaskPlan::error("bad output");
        assert_eq!(error.task, TaskPlan::ERROR_TASK);
        assert_eq!(error.message(), Some("bad output"));
    }

    #[test]
    fn test_task_plan_ignores_non_string_values() {
        let plan: TaskPlan = serde_json::from_str(
            r#"{"task": "general_cost_analysis", "parameters": {"process_name": 7}}"#,
        )
        .unwrap();
        assert_eq!(plan.parameter("process_name"), None);
    }

    #[test]
    fn test_query_outcome_json_shape() {
        let outcome = QueryOutcome::Halted {
            task: "error".to_string(),
            message: "no files".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "halted");
        assert_eq!(json["result"]["message"], "no files");
    }
}
