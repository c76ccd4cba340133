//! Run-scoped cache of parsed record stores.
//!
//! Each file name is parsed at most once per cache, even when several
//! tasks ask for it concurrently. Failed loads are not cached.

use crate::error::LedgerResult;
use crate::ledger::store::RecordStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::warn;

type Slot = Arc<OnceCell<Arc<RecordStore>>>;

/// Memoizing loader for the ledger files of one data directory.
#[derive(Debug)]
pub struct StoreCache {
    data_dir: PathBuf,
    slots: Mutex<HashMap<String, Slot>>,
    parses: AtomicUsize,
}

impl StoreCache {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            slots: Mutex::new(HashMap::new()),
            parses: AtomicUsize::new(0),
        }
    }

    /// Load a ledger file, parsing it only on the first request.
    pub async fn load(&self, file_name: &str) -> LedgerResult<Arc<RecordStore>> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.entry(file_name.to_string()).or_default().clone()
        };

        let store = slot
            .get_or_try_init(|| async {
                self.parses.fetch_add(1, Ordering::Relaxed);
                RecordStore::load(&self.data_dir.join(file_name))
                    .await
                    .map(Arc::new)
            })
            .await?;

        Ok(store.clone())
    }

    /// Load a ledger file; unreadable files become an empty store.
    pub async fn load_or_empty(&self, file_name: &str) -> Arc<RecordStore> {
        match self.load(file_name).await {
            Ok(store) => store,
            Err(e) => {
                warn!("{}", e);
                Arc::new(RecordStore::default())
            }
        }
    }

    /// Number of parse attempts made so far.
    pub fn parses(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }
}
