//! Sync module
//!
//! Delivers finished recordings to the server and remembers what has
//! been delivered.

pub mod discovery;
pub mod ledger;
pub mod orchestrator;

pub use discovery::discover_candidates;
pub use ledger::{LedgerError, ProcessedFileLedger};
pub use orchestrator::{SyncCycleResult, SyncOrchestrator, SyncStatus};
