//! Ledger file discovery.
//!
//! Lists the ledger files directly inside the data directory, filtered by
//! extension. Hidden files are skipped and names are returned sorted so
//! every run visits projects in the same order.

use crate::error::{LedgerError, LedgerResult};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Scanner for ledger files in one data directory.
#[derive(Debug, Clone)]
pub struct LedgerScanner {
    data_dir: PathBuf,
    extension: String,
}

impl LedgerScanner {
    pub fn new(data_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            data_dir: data_dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// List ledger file names, or fail if the directory is missing.
    pub fn scan(&self) -> LedgerResult<Vec<String>> {
        if !self.data_dir.is_dir() {
            return Err(LedgerError::DataDirectoryMissing(self.data_dir.clone()));
        }

        let mut files: Vec<String> = WalkDir::new(&self.data_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| self.matches(name))
            .collect();

        files.sort();
        debug!(
            "Found {} ledger files in {}",
            files.len(),
            self.data_dir.display()
        );
        Ok(files)
    }

    /// Like [`scan`](Self::scan), but a missing directory yields no files.
    pub fn list_ledger_files(&self) -> Vec<String> {
        match self.scan() {
            Ok(files) => files,
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }

    /// Check whether a file name is a ledger file.
    pub fn matches(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return false;
        }

        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext == self.extension)
    }
}
