//! LLM-backed implementations of the capability ports.

use crate::agent::llm::{parse_reply, OllamaClient};
use crate::agent::ports::{CandidateFinder, CandidateValidator, IntentPlanner};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Candidate, Record, TaskPlan, ValidatedItem};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

const PLANNER: &str = "intent planner";
const FINDER: &str = "candidate finder";
const VALIDATOR: &str = "candidate validator";

#[derive(Debug, Deserialize)]
struct MatchingRecords {
    #[serde(default)]
    matching_records: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ValidatedRecords {
    #[serde(default)]
    validated_records: Vec<Value>,
}

/// Decode each entry on its own so one unusable entry does not discard
/// the rest of the reply.
fn decode_entries<T: DeserializeOwned>(port: &'static str, entries: Vec<Value>) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("{}: dropping entry {}: {}", port, entry, e);
                None
            }
        })
        .collect()
}

/// Classifies a question as extraction or cost analysis.
pub struct LlmIntentPlanner {
    client: Arc<OllamaClient>,
}

impl LlmIntentPlanner {
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IntentPlanner for LlmIntentPlanner {
    async fn plan(&self, query: &str, available_files: &[String]) -> LedgerResult<TaskPlan> {
        info!("Analysing intent of {:?}", query);
        let prompt = format!(
            "[Available files]\n{}\n\n{}\n\n[Question]\n{}\n[Output]\n",
            available_files.join("\n"),
            INTENT_TASKS,
            query
        );

        let reply = self.client.chat(PLANNER, INTENT_SYSTEM_PROMPT, &prompt).await?;
        parse_plan(&reply)
    }
}

/// Parse an intent reply; malformed output is an intent parse error.
pub fn parse_plan(reply: &str) -> LedgerResult<TaskPlan> {
    parse_reply::<TaskPlan>(PLANNER, reply).map_err(|e| match e {
        LedgerError::PortResponse { reason, .. } => LedgerError::IntentParse(reason),
        other => other,
    })
}

/// Proposes candidate top-level work items from a record listing.
pub struct LlmCandidateFinder {
    client: Arc<OllamaClient>,
}

impl LlmCandidateFinder {
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandidateFinder for LlmCandidateFinder {
    async fn find_candidates(
        &self,
        query: &str,
        keyword: &str,
        records: &[Record],
    ) -> LedgerResult<Vec<Candidate>> {
        let prompt = format!(
            "[Original question]\n{}\n\n[Keyword]\n'{}'\n\n[Work items]\n{}\n\n\
             Find the work items most related to the keyword, following the intent of the \
             original question, and return them in the required JSON format.",
            query,
            keyword,
            render_record_list(records)
        );

        let reply = self.client.chat(FINDER, FINDER_SYSTEM_PROMPT, &prompt).await?;
        let candidates = parse_candidates(&reply)?;
        info!("Model proposed {} candidates", candidates.len());
        Ok(candidates)
    }
}

pub fn parse_candidates(reply: &str) -> LedgerResult<Vec<Candidate>> {
    parse_reply::<MatchingRecords>(FINDER, reply)
        .map(|r| decode_entries(FINDER, r.matching_records))
}

/// Keeps only the candidates directly related to the question.
pub struct LlmCandidateValidator {
    client: Arc<OllamaClient>,
}

impl LlmCandidateValidator {
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandidateValidator for LlmCandidateValidator {
    async fn validate(
        &self,
        query: &str,
        keyword: &str,
        candidates: &[Candidate],
    ) -> LedgerResult<Vec<ValidatedItem>> {
        let candidate_json =
            serde_json::to_string_pretty(candidates).map_err(|e| LedgerError::Port {
                port: VALIDATOR,
                reason: format!("failed to encode candidates: {}", e),
            })?;

        let prompt = format!(
            "[Original question]\n{}\n\n[Keyword]\n{}\n\n[Candidates]\n{}\n\n\
             Keep only the candidates directly related to the original question and return \
             them in the required JSON format.",
            query, keyword, candidate_json
        );

        let reply = self
            .client
            .chat(VALIDATOR, VALIDATOR_SYSTEM_PROMPT, &prompt)
            .await?;
        let validated = parse_validated(&reply)?;
        info!("Model confirmed {} items", validated.len());
        Ok(validated)
    }
}

pub fn parse_validated(reply: &str) -> LedgerResult<Vec<ValidatedItem>> {
    parse_reply::<ValidatedRecords>(VALIDATOR, reply)
        .map(|r| decode_entries(VALIDATOR, r.validated_records))
}

/// Two-column `record<TAB>name` listing handed to the finder.
pub fn render_record_list(records: &[Record]) -> String {
    let mut listing = String::from("record\tname\n");
    for record in records {
        listing.push_str(&record.id);
        listing.push('\t');
        listing.push_str(&record.name);
        listing.push('\n');
    }
    listing
}

/// System prompt for intent planning
const INTENT_SYSTEM_PROMPT: &str = r#"You are the coordinator of a construction cost analysis system.
Your only job is to classify the user's question into one of the task types and extract
the parameters the task needs, as JSON.

1. Pick the task type that matches the question.
2. If the question names a project, pick the exact, complete file name from the list of
   available files. If no project is named, use "None".
3. If the user names only an object ("bridge", "tunnel"), turn it into a work category
   ("bridge works", "tunnel works") for `process_name`.
4. Output JSON only."#;

const INTENT_TASKS: &str = r#"[Task types]
1. `sub_process_extraction`: list the sub-items of one work package in one file.
   Required parameters: `file_name`, `process_name`
2. `general_cost_analysis`: typical cost of a work category across all files.
   Required parameters: `process_name`

[Output format]
{
  "task": "task type",
  "parameters": {
    "parameter name": "value"
  }
}"#;

/// System prompt for the candidate finder
const FINDER_SYSTEM_PROMPT: &str = r#"You are an honest and precise construction schedule analyst.
Answer only from the given work item list.
- Never invent a `record` or a name that is not in the list.
- Skip items that are sub-items of another listed item, unless the item carries a proper
  name of its own (a named bridge or tunnel), which counts as a top-level item.
- Return JSON only, with no explanation:
{
  "matching_records": [
    {"record": "existing record value", "name": "its work item name"}
  ]
}"#;

/// System prompt for the candidate validator
const VALIDATOR_SYSTEM_PROMPT: &str = r#"You filter candidate work items for relevance.
- Include a candidate whose name clearly denotes the structure the question asks about.
- Exclude activities (demolition, maintenance, inspection, installation, repair), parts and
  facilities (bearings, drainage, expansion joints), cost concepts (materials, haulage) and
  temporary structures, even if they contain the keyword.
- If nothing is relevant return an empty list.
Return JSON only:
{
  "validated_records": [
    {"record": "relevant record value", "name": "its work item name"}
  ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan() {
        let reply = r#"{"task": "sub_process_extraction", "parameters": {"file_name": "p1.txt", "process_name": "bridge works"}}"#;
        let plan = parse_plan(reply).unwrap();
        assert_eq!(plan.task, "sub_process_extraction");
        assert_eq!(plan.parameter("file_name"), Some("p1.txt"));
    }

    #[test]
    fn test_parse_plan_malformed_is_intent_error() {
        assert!(matches!(
            parse_plan("I think you want a bridge"),
            Err(LedgerError::IntentParse(_))
        ));
    }

    #[test]
    fn test_parse_candidates() {
        let reply = r#"```json
{"matching_records": [{"record": "3", "name": "Gurim Bridge"}, {"record": "5", "name": "Namjeong Bridge"}]}
```"#;
        let candidates = parse_candidates(reply).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], Candidate::new("3", "Gurim Bridge"));
    }

    #[test]
    fn test_parse_validated_keeps_usable_entries() {
        let reply = r#"{"validated_records": [
            {"record": 1, "name": "Gurim Bridge"},
            {"record": ["2"], "name": "Bridge Demolition"},
            "3"
        ]}"#;
        assert_eq!(
            parse_validated(reply).unwrap(),
            vec![ValidatedItem::new("1", "Gurim Bridge")]
        );
    }

    #[test]
    fn test_parse_candidates_accepts_numeric_ids() {
        let reply = r#"{"matching_records": [{"record": 3, "name": "Gurim Bridge"}, {"record": "5", "name": "Namjeong Bridge"}]}"#;
        assert_eq!(
            parse_candidates(reply).unwrap(),
            vec![
                Candidate::new("3", "Gurim Bridge"),
                Candidate::new("5", "Namjeong Bridge")
            ]
        );
    }

    #[test]
    fn test_parse_validated_missing_key_is_empty() {
        assert!(parse_validated("{}").unwrap().is_empty());
        assert!(matches!(
            parse_validated(r#"{"validated_records": "none"}"#),
            Err(LedgerError::PortResponse { .. })
        ));
    }

    #[test]
    fn test_render_record_list() {
        let records = vec![Record {
            id: "1.2".to_string(),
            name: "Girder".to_string(),
            spec: "H".to_string(),
            cost: "10".to_string(),
        }];
        assert_eq!(render_record_list(&records), "record\tname\n1.2\tGirder\n");
    }
}
