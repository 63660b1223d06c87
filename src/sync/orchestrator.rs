//! Sync orchestrator
//!
//! Runs one sync cycle:
//! 1. Connect the radio
//! 2. Load the ledger
//! 3. Find unsynced recordings
//! 4. Upload each with bounded, flat-delay retries
//! 5. Mark confirmed uploads in the ledger
//! 6. Disconnect the radio
//!
//! The radio is disconnected exactly once per cycle on every path.

use super::discovery::discover_candidates;
use super::ledger::ProcessedFileLedger;
use crate::config::SyncConfig;
use crate::radio::RadioLink;
use crate::upload::{is_success_status, UploadClient};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a sync cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncStatus {
    /// Radio failed to connect; nothing attempted
    RadioUnavailable,
    /// Recordings directory could not be listed; nothing attempted
    StorageUnavailable,
    /// Some candidates were not delivered
    Partial,
    /// Every candidate was delivered (or there were none)
    Complete,
}

/// Outcome of one sync cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCycleResult {
    /// Candidates found this cycle
    pub attempted: usize,

    /// Candidates the server acknowledged
    pub succeeded: usize,

    pub status: SyncStatus,
}

impl SyncCycleResult {
    fn aborted(status: SyncStatus) -> Self {
        Self {
            attempted: 0,
            succeeded: 0,
            status,
        }
    }

    /// `attempted == succeeded`; vacuously true for an empty cycle
    pub fn success(&self) -> bool {
        self.attempted == self.succeeded
    }
}

pub struct SyncOrchestrator {
    config: SyncConfig,
    radio: Box<dyn RadioLink>,
    uploader: Box<dyn UploadClient>,
    ledger: ProcessedFileLedger,
    last_result: Option<SyncCycleResult>,
}

impl SyncOrchestrator {
    pub fn new(
        config: SyncConfig,
        radio: Box<dyn RadioLink>,
        uploader: Box<dyn UploadClient>,
    ) -> Self {
        tracing::info!("SyncOrchestrator initialized");
        tracing::info!("  Server: {}", config.upload_url());
        tracing::info!("  Recordings dir: {:?}", config.recordings_dir);
        tracing::info!("  Ledger: {:?}", config.ledger_path);
        tracing::info!(
            "  Retries: {} x {}ms",
            config.max_retries,
            config.retry_delay_ms
        );

        let ledger = ProcessedFileLedger::new(&config.ledger_path);
        Self {
            config,
            radio,
            uploader,
            ledger,
            last_result: None,
        }
    }

    /// Result of the most recent cycle
    pub fn last_result(&self) -> Option<SyncCycleResult> {
        self.last_result
    }

    pub fn ledger(&self) -> &ProcessedFileLedger {
        &self.ledger
    }

    /// Run one complete sync cycle
    pub async fn run_cycle(&mut self) -> SyncCycleResult {
        tracing::info!("Starting sync cycle");

        let result = self.sync_connected().await;
        tracing::info!("Disconnecting radio to save power");
        self.radio.disconnect().await;

        match result.status {
            SyncStatus::Complete => tracing::info!(
                "Sync cycle complete: {}/{} file(s) uploaded",
                result.succeeded,
                result.attempted
            ),
            SyncStatus::Partial => tracing::warn!(
                "Sync cycle finished with failures: {}/{} file(s) uploaded",
                result.succeeded,
                result.attempted
            ),
            SyncStatus::RadioUnavailable | SyncStatus::StorageUnavailable => {
                tracing::warn!("Sync cycle aborted: {:?}", result.status)
            }
        }

        self.last_result = Some(result);
        result
    }

    /// Everything between connect and disconnect
    async fn sync_connected(&mut self) -> SyncCycleResult {
        tracing::info!("Connecting radio");
        if let Err(e) = self.radio.connect().await {
            tracing::error!("Failed to connect radio: {}", e);
            return SyncCycleResult::aborted(SyncStatus::RadioUnavailable);
        }

        if let Err(e) = self.ledger.load() {
            // Unknown entries only cost a re-upload.
            tracing::warn!("Failed to load processed log, treating as empty: {}", e);
        }

        let candidates = match discover_candidates(
            &self.config.recordings_dir,
            &self.config.audio_extension,
            &self.ledger,
        ) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(
                    "Failed to open recordings directory {:?}: {}",
                    self.config.recordings_dir,
                    e
                );
                return SyncCycleResult::aborted(SyncStatus::StorageUnavailable);
            }
        };

        tracing::info!("Found {} unprocessed recording(s)", candidates.len());
        if candidates.is_empty() {
            tracing::info!("No files to sync");
        }

        let url = self.config.upload_url();
        let mut succeeded = 0;
        for file_name in &candidates {
            let path = self.config.recordings_dir.join(file_name);
            tracing::info!("Processing: {}", file_name);

            if !self.upload_with_retries(&url, &path).await {
                tracing::error!(
                    "Failed to upload after {} attempt(s): {}",
                    self.config.max_retries,
                    file_name
                );
                continue;
            }

            succeeded += 1;
            tracing::info!("Successfully uploaded: {}", file_name);
            if let Err(e) = self.ledger.mark_processed(file_name) {
                // Delivered either way; worst case it is uploaded again.
                tracing::warn!("Failed to mark file as processed: {}: {}", file_name, e);
            }
        }

        let attempted = candidates.len();
        SyncCycleResult {
            attempted,
            succeeded,
            status: if succeeded == attempted {
                SyncStatus::Complete
            } else {
                SyncStatus::Partial
            },
        }
    }

    /// Upload one file, retrying up to the configured budget
    async fn upload_with_retries(&mut self, url: &str, path: &Path) -> bool {
        let max_attempts = self.config.max_retries.max(1);
        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tracing::info!(
                    "Retry attempt {}/{} for {:?}",
                    attempt,
                    max_attempts,
                    path
                );
                tokio::time::sleep(self.config.retry_delay()).await;
            }

            match self
                .uploader
                .upload_file(url, path, &self.config.upload_field_name)
                .await
            {
                Ok(status) if is_success_status(status) => return true,
                Ok(status) => {
                    tracing::error!("Server returned error status {} for {:?}", status, path)
                }
                Err(e) => tracing::error!("Upload failed for {:?}: {}", path, e),
            }
        }
        false
    }
}
