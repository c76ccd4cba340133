//! Classify and validate stages shared by both workflows.
//!
//! These wrap the port calls with the per-call timeout, the empty-input
//! short circuits, the fact check, and the fallback policy for malformed
//! port output.

use crate::agent::fact_check::{fact_check, verify_validated};
use crate::agent::Ports;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{RecordStore, StoreCache};
use crate::models::{Candidate, ValidatedItem};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Run `fut`, failing with [`LedgerError::Timeout`] after `after`.
pub async fn with_timeout<T, F>(operation: &'static str, after: Duration, fut: F) -> LedgerResult<T>
where
    F: Future<Output = LedgerResult<T>>,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| LedgerError::Timeout { operation, after })?
}

/// Everything a stage needs for one query run.
#[derive(Clone)]
pub struct RunContext {
    pub ports: Ports,
    pub cache: Arc<StoreCache>,
    pub port_timeout: Duration,
    pub max_candidate_depth: usize,
}

impl RunContext {
    /// Ask the finder for candidates. An empty store never reaches the port.
    pub async fn classify(
        &self,
        query: &str,
        keyword: &str,
        store: &RecordStore,
    ) -> LedgerResult<Vec<Candidate>> {
        if store.is_empty() {
            debug!("Empty ledger, skipping candidate search");
            return Ok(Vec::new());
        }

        let records = store.up_to_depth(self.max_candidate_depth);
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let found = with_timeout(
            "candidate finder",
            self.port_timeout,
            self.ports.finder.find_candidates(query, keyword, &records),
        )
        .await;

        match found {
            Ok(candidates) => Ok(candidates),
            Err(e @ LedgerError::PortResponse { .. }) => {
                warn!("{}; continuing without candidates", e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Fact-check candidates, ask the validator, and re-verify its answer.
    pub async fn validate(
        &self,
        query: &str,
        keyword: &str,
        candidates: &[Candidate],
        store: &RecordStore,
    ) -> LedgerResult<Vec<ValidatedItem>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let checked = fact_check(candidates, store);
        if checked.is_empty() {
            info!("No candidate survived the fact check");
            return Ok(Vec::new());
        }

        let answer = with_timeout(
            "candidate validator",
            self.port_timeout,
            self.ports.validator.validate(query, keyword, &checked),
        )
        .await;

        let validated = match answer {
            Ok(validated) => validated,
            Err(e @ LedgerError::PortResponse { .. }) => {
                warn!("{}; using the fact-checked candidates", e);
                checked.into_iter().map(ValidatedItem::from).collect()
            }
            Err(e) => return Err(e),
        };

        Ok(verify_validated(validated, store))
    }
}
