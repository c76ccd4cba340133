//! Ledger files: discovery, parsing and per-run caching.

pub mod cache;
pub mod discovery;
pub mod store;

pub use cache::StoreCache;
pub use discovery::LedgerScanner;
pub use store::RecordStore;
