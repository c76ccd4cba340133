//! Error kinds raised while answering a ledger query.
//!
//! None of these terminate the process: every variant is recovered or
//! turned into a reportable result by the workflow that meets it.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the ledger store, the rollup engine, the ports and
/// the workflows.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("data directory not found: {}", .0.display())]
    DataDirectoryMissing(PathBuf),

    #[error("failed to read ledger file {}: {reason}", path.display())]
    FileParse { path: PathBuf, reason: String },

    #[error("record {id} has a non-numeric cost {raw:?}")]
    CostCoercion { id: String, raw: String },

    #[error("record {0} is not present in the ledger")]
    MissingParentRecord(String),

    #[error("could not parse intent: {0}")]
    IntentParse(String),

    #[error("{port} returned malformed output: {reason}")]
    PortResponse { port: &'static str, reason: String },

    #[error("{port} call failed: {reason}")]
    Port { port: &'static str, reason: String },

    #[error("missing required parameter: {0}")]
    MissingRequiredParameter(&'static str),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl LedgerError {
    /// Short machine-readable kind, used in JSON reports.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::DataDirectoryMissing(_) => "data_directory_missing",
            LedgerError::FileParse { .. } => "file_parse",
            LedgerError::CostCoercion { .. } => "cost_coercion",
            LedgerError::MissingParentRecord(_) => "missing_parent_record",
            LedgerError::IntentParse(_) => "intent_parse",
            LedgerError::PortResponse { .. } => "port_response",
            LedgerError::Port { .. } => "port",
            LedgerError::MissingRequiredParameter(_) => "missing_required_parameter",
            LedgerError::InvalidParameter { .. } => "invalid_parameter",
            LedgerError::Timeout { .. } => "timeout",
        }
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LedgerError::CostCoercion {
            id: "1.2".to_string(),
            raw: "n/a".to_string(),
        };
        assert_eq!(err.to_string(), "record 1.2 has a non-numeric cost \"n/a\"");
        assert_eq!(err.kind(), "cost_coercion");

        let err = LedgerError::Timeout {
            operation: "validator",
            after: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "validator timed out after 30s");
    }

    #[test]
    fn test_missing_parameter_message() {
        let err = LedgerError::MissingRequiredParameter("file_name");
        assert!(err.to_string().contains("file_name"));
        assert_eq!(err.kind(), "missing_required_parameter");
    }
}
