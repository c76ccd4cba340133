//! Language-model capabilities used by the workflows.
//!
//! The ports are traits; the LLM adapters implement them over Ollama and
//! the fact-check keeps their output grounded in the ledger.

pub mod fact_check;
pub mod llm;
pub mod planners;
pub mod ports;

pub use llm::{LlmConfig, OllamaClient};
pub use planners::{LlmCandidateFinder, LlmCandidateValidator, LlmIntentPlanner};
pub use ports::{CandidateFinder, CandidateValidator, IntentPlanner, Ports};
